//! Where rejected callers are told they cannot be served.

use tracing::warn;
use uuid::Uuid;

/// Message delivered to a caller whose call no worker could take.
pub const REJECTION_MESSAGE: &str = "Your call cannot be answered at this time.";

/// Sink for rejection notices.
///
/// Called synchronously on the dispatching thread, so implementations
/// should hand off anything slow.
pub trait RejectionNotifier: Send + Sync {
    fn name(&self) -> &str;

    /// The call identified by `call_id` was turned away.
    fn call_rejected(&self, call_id: Uuid, message: &str);
}

/// Default notifier: writes the notice to the tracing log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl RejectionNotifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn call_rejected(&self, call_id: Uuid, message: &str) {
        warn!(call_id = %call_id, "{}", message);
    }
}
