//! city — timetabled transit on a synthetic grid city.
//!
//! A 5 × 5 street grid with 200 m blocks carries one bus line (east–west,
//! street level) and one metro line (north–south, underground).  Travellers
//! with random origins and destinations either walk or ride; a few
//! wanderers ride open-ended and get off by chance.
//!
//! ```text
//! RUST_LOG=debug cargo run -p city -- --travellers 40 --trace
//! cargo run -p city -- --config city.toml --runs 8
//! cargo run -p city -- --routes routes.json --stops stops.csv
//! ```
//!
//! Route and stop files must describe stops on the grid's intersections.

mod network;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;

use tm_core::{AgentId, Coord, Layer, RouteId, SimConfig, SimRng, SimTime};
use tm_schedule::{RouteDescriptor, StopMap, load_routes_json, load_stop_map_csv, load_stop_map_json};
use tm_sim::{Sim, SimBuilder, SimObserver, SimResult, run_batch};
use tm_spatial::MapGraph;
use tm_transit::{Path, RunContext, TransitConfig, TravellerFactory, initialize};

// ── Command line and config file ──────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "city", about = "Timetabled transit on a synthetic grid city")]
struct Cli {
    /// TOML file with optional `[sim]` and `[transit]` tables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Route timetables as a JSON array (default: generated bus and metro).
    #[arg(long)]
    routes: Option<PathBuf>,

    /// Stop coordinates: `.csv` (stop_id,x,y) or a JSON object.
    #[arg(long)]
    stops: Option<PathBuf>,

    /// Fixed-route travellers per route.
    #[arg(long, default_value_t = 10)]
    travellers: usize,

    /// Open-ended riders per route.
    #[arg(long, default_value_t = 2)]
    wanderers: usize,

    /// Override the seed from the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Independent runs on consecutive seeds, summarised one line each.
    #[arg(long, default_value_t = 1)]
    runs: u64,

    /// Print every path and layer change as it happens.
    #[arg(long)]
    trace: bool,

    /// Write the routes in use to this JSON file before running.
    #[arg(long)]
    dump_routes: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(default)]
struct DemoConfig {
    sim:     SimConfig,
    transit: TransitConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig { end: SimTime::from_secs(2 * 3_600), ..SimConfig::default() },
            transit: TransitConfig::default(),
        }
    }
}

// ── Scenario ──────────────────────────────────────────────────────────────────

/// Everything needed to build one run; shared read-only by batch runs.
struct Scenario {
    graph:      Arc<MapGraph>,
    stops:      StopMap,
    routes:     Vec<RouteDescriptor>,
    sim:        SimConfig,
    transit:    TransitConfig,
    travellers: usize,
    wanderers:  usize,
}

/// One passenger as spawned, for the final report.
struct Passenger {
    id:          AgentId,
    route:       RouteId,
    origin:      Option<Coord>,
    destination: Option<Coord>,
}

impl Scenario {
    fn load(cli: &Cli) -> Result<Self> {
        let DemoConfig { sim, transit } = match &cli.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                toml::from_str::<DemoConfig>(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => DemoConfig::default(),
        };

        let stops = match &cli.stops {
            Some(path) if path.extension().is_some_and(|e| e == "csv") => load_stop_map_csv(path)?,
            Some(path) => load_stop_map_json(path)?,
            None => network::stop_map(),
        };
        let routes = match &cli.routes {
            Some(path) => load_routes_json(path)
                .with_context(|| format!("loading routes from {}", path.display()))?,
            None => network::routes(),
        };
        if routes.is_empty() {
            bail!("no routes to simulate");
        }

        Ok(Self {
            graph: network::build_grid(),
            stops,
            routes,
            sim,
            transit,
            travellers: cli.travellers,
            wanderers: cli.wanderers,
        })
    }

    /// Build a run: every route's vehicles plus its travellers.
    fn build(&self, seed: u64) -> SimResult<(Sim, Vec<Passenger>)> {
        let ctx = RunContext::new(seed);
        let mut rng = SimRng::new(seed);
        let mut builder = SimBuilder::new(SimConfig { seed, ..self.sim.clone() });
        let mut passengers = Vec::new();

        for route in &self.routes {
            let transit = initialize(&ctx, route, &self.stops, Arc::clone(&self.graph), &self.transit)?;
            builder = builder.agents(transit.spawn_vehicles(&ctx)?);

            let factory = TravellerFactory::new(route.route_id, &self.transit)?;
            for _ in 0..self.travellers {
                let t = factory.spawn(&ctx)?;
                let (origin, destination) = (self.random_node(&mut rng), self.random_node(&mut rng));
                t.set_route(origin, destination);
                passengers.push(Passenger {
                    id: t.id(),
                    route: route.route_id,
                    origin: Some(origin),
                    destination: Some(destination),
                });
                builder = builder.agent(t);
            }
            for _ in 0..self.wanderers {
                let t = factory.spawn(&ctx)?;
                let origin = t.place_randomly();
                passengers.push(Passenger { id: t.id(), route: route.route_id, origin, destination: None });
                builder = builder.agent(t);
            }
        }
        Ok((builder.build()?, passengers))
    }

    fn random_node(&self, rng: &mut SimRng) -> Coord {
        self.graph.node_pos[rng.gen_range(0..self.graph.node_count())]
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Report {
    trace:  bool,
    paths:  BTreeMap<AgentId, usize>,
    ready:  BTreeMap<AgentId, (SimTime, Option<Coord>)>,
    done:   usize,
    layers: usize,
}

impl SimObserver for Report {
    fn on_path(&mut self, agent: AgentId, now: SimTime, path: &Path) {
        *self.paths.entry(agent).or_default() += 1;
        if self.trace {
            println!(
                "{now:>10}  {agent:<12} {:>7.1} m at {:>5.2} m/s → {}",
                path.length(),
                path.speed,
                path.last().map_or_else(|| "-".to_owned(), |c| c.to_string())
            );
        }
    }

    fn on_layer_change(&mut self, agent: AgentId, now: SimTime, layer: Layer) {
        self.layers += 1;
        if self.trace {
            println!("{now:>10}  {agent:<12} now on the {layer} layer");
        }
    }

    fn on_agent_ready(&mut self, agent: AgentId, now: SimTime, at: Option<Coord>) {
        self.ready.insert(agent, (now, at));
    }

    fn on_agent_done(&mut self, _agent: AgentId, _now: SimTime) {
        self.done += 1;
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let scenario = Scenario::load(&cli)?;
    let seed = cli.seed.unwrap_or(scenario.sim.seed);

    println!("=== city — timetabled transit on a {0} × {0} grid ===", network::GRID);
    println!(
        "Routes: {}  |  Stops: {}  |  Travellers/route: {} + {} wanderers  |  Seed: {seed}",
        scenario.routes.len(),
        scenario.stops.len(),
        scenario.travellers,
        scenario.wanderers
    );
    println!();

    if let Some(path) = &cli.dump_routes {
        fs::write(path, serde_json::to_string_pretty(&scenario.routes)?)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("routes written to {}", path.display());
    }

    if cli.runs > 1 {
        run_many(&scenario, seed, cli.runs)
    } else {
        run_one(&scenario, seed, cli.trace)
    }
}

fn run_one(scenario: &Scenario, seed: u64, trace: bool) -> Result<()> {
    let (mut sim, passengers) = scenario.build(seed)?;
    println!("Agents: {}  (vehicles + passengers)", sim.agent_count());

    let mut report = Report { trace, ..Report::default() };
    let t0 = Instant::now();
    let stats = sim.run(&mut report)?;
    let elapsed = t0.elapsed();

    println!();
    println!("Simulation complete in {:.3} s (simulated until {})", elapsed.as_secs_f64(), stats.end);
    println!(
        "  {} steps, {} paths, {} layer changes, {} vehicles finished",
        stats.steps, stats.paths, report.layers, report.done
    );
    println!();

    println!("{:<12} {:<6} {:<22} {:<22} {:>5}  {}", "Agent", "Route", "From", "To", "Paths", "Outcome");
    println!("{}", "-".repeat(90));
    let show = |c: Option<Coord>| c.map_or_else(|| "open-ended".to_owned(), |c| c.to_string());
    for p in &passengers {
        let outcome = match report.ready.get(&p.id) {
            Some((when, at)) => format!("arrived {} at {when}", show(*at)),
            None => "still travelling".to_owned(),
        };
        println!(
            "{:<12} {:<6} {:<22} {:<22} {:>5}  {outcome}",
            p.id.to_string(),
            p.route.0,
            show(p.origin),
            show(p.destination),
            report.paths.get(&p.id).copied().unwrap_or(0),
        );
    }
    Ok(())
}

fn run_many(scenario: &Scenario, first_seed: u64, runs: u64) -> Result<()> {
    let seeds: Vec<u64> = (first_seed..first_seed + runs).collect();
    let t0 = Instant::now();
    let results = run_batch(&seeds, |seed| scenario.build(seed).map(|(sim, _)| sim));
    let elapsed = t0.elapsed();

    println!("{:<8} {:>10} {:>8} {:>6} {:>6}", "Seed", "Steps", "Paths", "Ready", "Done");
    println!("{}", "-".repeat(42));
    let mut failed = 0;
    for (seed, result) in seeds.iter().zip(results) {
        match result {
            Ok(s) => println!("{seed:<8} {:>10} {:>8} {:>6} {:>6}", s.steps, s.paths, s.ready, s.done),
            Err(e) => {
                failed += 1;
                eprintln!("{seed:<8} failed: {e}");
            }
        }
    }
    println!();
    println!("{runs} runs in {:.3} s", elapsed.as_secs_f64());
    if failed > 0 {
        bail!("{failed} of {runs} runs failed");
    }
    Ok(())
}
