//! Workers — the people who answer calls.
//!
//! - `state` — Worker record, `Tier`, and the Free ⇄ Busy state machine
//! - `call` — `WorkerClaim` ownership token and the `handle_call` task body

pub mod call;
pub mod state;

pub use call::{WorkerClaim, handle_call, sample_call_duration};
pub use state::{Tier, Worker, WorkerState};
