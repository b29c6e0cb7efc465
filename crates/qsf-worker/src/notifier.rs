//! Fire-and-forget notifications. The boundary MUST NOT block the worker
//! loop; implementations that talk to anything slow must do so off-thread.

use tracing::info;

pub trait Notifier {
    fn notify(&self, event: &str, message: &str);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &str, _message: &str) {}
}

/// Emits notifications into the pane's tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &str, message: &str) {
        info!(event, message, "notify");
    }
}
