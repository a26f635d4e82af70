//! `tm-sim` — discrete-event driver for transit movement models.
//!
//! # Event loop
//!
//! ```text
//! while the earliest wake time t ≤ config.end:
//!   ① Pop     — every agent queued for t (stale entries skipped).
//!   ② Order   — travellers before vehicles, queue order within each kind.
//!   ③ Step    — the agent's pending request:
//!                 wait  → After(d): path request at t + d
//!                         Never:    retire
//!                 path  → Some(p):  wait request at t + travel time of p
//!                         None:     wait request at t + retry_interval
//!   ④ Wake    — a vehicle path wakes every idle agent at t.
//!   ⑤ Retire  — agents reporting ready or done leave the queue.
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                   |
//! |--------------|--------------------------------------------|
//! | [`sim`]      | `Sim`, `SimStats`                          |
//! | [`builder`]  | `SimBuilder`                               |
//! | [`observer`] | `SimObserver`, `NoopObserver`              |
//! | [`batch`]    | `run_batch` over independent seeds         |
//! | [`error`]    | `SimError`, `SimResult<T>`                 |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                          |
//! |------------|-------------------------------------------------|
//! | `parallel` | `run_batch` runs on Rayon's thread pool.        |

pub mod batch;
pub mod builder;
pub mod error;
pub mod observer;
pub mod sim;

#[cfg(test)]
mod tests;

pub use batch::run_batch;
pub use builder::SimBuilder;
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver};
pub use sim::{Sim, SimStats};
