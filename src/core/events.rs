//! Completion hooks: how outcomes flow back to producers.

use tokio::sync::mpsc::UnboundedSender;

use crate::core::task::TaskEvent;

/// Receiver of task outcome notifications.
///
/// Hooks run synchronously on the thread that finished the task (a worker
/// thread, or the caller of `cancel`), so they should hand work off rather
/// than block.
pub trait CompletionHook: Send + Sync {
    /// Called once per finished run and once per cancellation.
    fn on_event(&self, event: &TaskEvent);

    /// Whether the hook can no longer receive events. Closed hooks are
    /// removed after the next emitted event.
    fn is_closed(&self) -> bool {
        false
    }
}

impl<F> CompletionHook for F
where
    F: Fn(&TaskEvent) + Send + Sync,
{
    fn on_event(&self, event: &TaskEvent) {
        self(event);
    }
}

/// Hook forwarding events into an unbounded channel.
pub struct ChannelHook {
    tx: UnboundedSender<TaskEvent>,
}

impl ChannelHook {
    /// Forward events to `tx`.
    #[must_use]
    pub const fn new(tx: UnboundedSender<TaskEvent>) -> Self {
        Self { tx }
    }
}

impl CompletionHook for ChannelHook {
    fn on_event(&self, event: &TaskEvent) {
        // Receiver dropped: the subscriber lost interest.
        let _ = self.tx.send(event.clone());
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
