//! Call dispatch — tier selection, the bounded pool, and rejection notices.
//!
//! - `selector` — one `TierSelector` per tier, gate-protected scan-and-claim
//! - `pool` — `WorkerPool`, fixed-capacity execution of call tasks
//! - `notify` — `RejectionNotifier` sink for turned-away callers
//! - `dispatcher` — `Dispatcher`, escalates first → second → third line

pub mod dispatcher;
pub mod notify;
pub mod pool;
pub mod selector;

pub use dispatcher::{Assignment, Dispatcher, TierLoad};
pub use notify::{LogNotifier, REJECTION_MESSAGE, RejectionNotifier};
pub use pool::WorkerPool;
pub use selector::TierSelector;
