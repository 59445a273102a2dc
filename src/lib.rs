//! Call Dispatch — tiered call routing onto a bounded worker pool.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod roster;
pub mod worker;

pub use config::{ContentionPolicy, DispatcherConfig};
pub use dispatch::{Assignment, Dispatcher};
pub use roster::Roster;
pub use worker::{Tier, Worker, WorkerState};
