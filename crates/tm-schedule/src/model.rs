//! Timetable records.
//!
//! All types here are immutable once loaded.  Field names on the wire follow
//! the timetable JSON format:
//!
//! ```json
//! { "route_id": 3, "layer": "underground", "stops": ["a", "b"],
//!   "vehicles": [ { "vehicle_id": 0,
//!                   "trips": [[ {"stop_id": "a", "arrT": 0.0,  "depT": 30.0},
//!                               {"stop_id": "b", "arrT": 90.0, "depT": 120.0} ]] } ] }
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tm_core::{Layer, RouteId, SimTime};

use crate::{ScheduleError, ScheduleResult};

// ── StopRecord ────────────────────────────────────────────────────────────────

/// One scheduled call at a stop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    /// Key into the stop map; must also be listed in the route's stop set.
    pub stop_id: String,

    /// Scheduled arrival.
    #[serde(rename = "arrT", with = "secs")]
    pub arrival: SimTime,

    /// Scheduled departure.
    #[serde(rename = "depT", with = "secs")]
    pub departure: SimTime,
}

impl StopRecord {
    pub fn new(stop_id: impl Into<String>, arrival: SimTime, departure: SimTime) -> Self {
        Self { stop_id: stop_id.into(), arrival, departure }
    }
}

/// Seconds-as-`f64` on the wire, `SimTime` in memory.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use tm_core::SimTime;

    pub fn serialize<S: Serializer>(t: &SimTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(t.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SimTime, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() {
            return Err(serde::de::Error::custom("stop time must be a finite number of seconds"));
        }
        Ok(SimTime::from_secs_f64(secs))
    }
}

// ── Trip ──────────────────────────────────────────────────────────────────────

/// One directional run: an ordered list of stop calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trip {
    pub stops: Vec<StopRecord>,
}

impl Trip {
    pub fn new(stops: Vec<StopRecord>) -> Self {
        Self { stops }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    #[inline]
    pub fn get(&self, stop: usize) -> Option<&StopRecord> {
        self.stops.get(stop)
    }

    pub fn first(&self) -> Option<&StopRecord> {
        self.stops.first()
    }

    pub fn last(&self) -> Option<&StopRecord> {
        self.stops.last()
    }
}

// ── VehicleSchedule ───────────────────────────────────────────────────────────

/// The full timetable of one vehicle: one or more chained trips.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleSchedule {
    pub vehicle_id: u32,
    pub trips:      Vec<Trip>,
}

impl VehicleSchedule {
    pub fn new(vehicle_id: u32, trips: Vec<Trip>) -> Self {
        Self { vehicle_id, trips }
    }

    /// The stop record at cursor `(trip, stop)`, if it exists.
    #[inline]
    pub fn stop(&self, trip: usize, stop: usize) -> Option<&StopRecord> {
        self.trips.get(trip)?.get(stop)
    }

    /// `true` iff `(trip, stop)` is the final stop of the final trip.
    pub fn is_last_stop(&self, trip: usize, stop: usize) -> bool {
        match self.trips.last() {
            Some(last) => trip + 1 == self.trips.len() && stop + 1 == last.len(),
            None => false,
        }
    }

    /// `true` iff `(trip, stop)` is the last stop of a trip that is *not*
    /// the final one, i.e. the vehicle should roll over to `trip + 1`.
    pub fn should_start_next_trip(&self, trip: usize, stop: usize) -> bool {
        if trip + 1 >= self.trips.len() {
            return false;
        }
        stop + 1 == self.trips[trip].len()
    }

    /// Every stop id referenced by any trip, in schedule order (with
    /// repeats).
    pub fn stop_ids(&self) -> impl Iterator<Item = &str> {
        self.trips.iter().flat_map(|t| t.stops.iter().map(|s| s.stop_id.as_str()))
    }

    /// Reject schedules the vehicle agent cannot run: no trips, a trip with
    /// fewer than two stops, or times that run backwards.  Within a stop the
    /// departure may not precede the arrival, and every arrival (across
    /// chained trips too) may not precede the previous departure.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.trips.is_empty() {
            return Err(ScheduleError::Invalid(format!(
                "vehicle {} has no trips",
                self.vehicle_id
            )));
        }
        for (i, trip) in self.trips.iter().enumerate() {
            if trip.len() < 2 {
                return Err(ScheduleError::Invalid(format!(
                    "vehicle {} trip {i} has {} stop(s); at least 2 are required",
                    self.vehicle_id,
                    trip.len()
                )));
            }
        }

        let mut previous: Option<&StopRecord> = None;
        for (i, trip) in self.trips.iter().enumerate() {
            for record in &trip.stops {
                if record.departure < record.arrival {
                    return Err(ScheduleError::Invalid(format!(
                        "vehicle {} trip {i}: departs {:?} at {} before arriving at {}",
                        self.vehicle_id, record.stop_id, record.departure, record.arrival
                    )));
                }
                if let Some(prev) = previous.filter(|p| record.arrival < p.departure) {
                    return Err(ScheduleError::Invalid(format!(
                        "vehicle {} trip {i}: arrives at {:?} at {}, before leaving {:?} at {}",
                        self.vehicle_id, record.stop_id, record.arrival, prev.stop_id, prev.departure
                    )));
                }
                previous = Some(record);
            }
        }
        Ok(())
    }
}

// ── RouteDescriptor ───────────────────────────────────────────────────────────

/// One transit route as read from the timetable file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub route_id: RouteId,

    /// Presentation layer of the route's vehicles (`surface` if absent).
    #[serde(default)]
    pub layer: Layer,

    /// Stop ids served by the route.  Ordered, so that stop lists and
    /// nearest-stop tie-breaks are reproducible.
    pub stops: BTreeSet<String>,

    pub vehicles: Vec<VehicleSchedule>,
}

impl RouteDescriptor {
    /// Structural checks that need no map: a non-empty fleet, every schedule
    /// valid, and every trip stop listed in `stops`.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.vehicles.is_empty() {
            return Err(ScheduleError::Invalid(format!(
                "route {} has no vehicles",
                self.route_id.0
            )));
        }
        for vehicle in &self.vehicles {
            vehicle.validate()?;
            if let Some(unknown) = vehicle.stop_ids().find(|id| !self.stops.contains(*id)) {
                return Err(ScheduleError::Invalid(format!(
                    "vehicle {} of route {} calls at {unknown:?}, which is not in the route's stop set",
                    vehicle.vehicle_id, self.route_id.0
                )));
            }
        }
        Ok(())
    }
}
