use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Callback capability driven by the transfer engine.
///
/// The engine holds one `Arc<dyn TransferObserver>` for the lifetime of the
/// transfer task and releases it when the task finishes. Calls arrive from
/// the task's execution context, which may differ from the context that
/// called `start_transfer`. Per transfer, the engine guarantees zero or more
/// `on_progress` calls followed by exactly one of `on_complete` or
/// `on_error`, never both.
#[async_trait]
pub trait TransferObserver: Send + Sync {
    /// Invoked after each chunk with the running byte total. `total_bytes`
    /// is the advertised payload size; 0 means unknown/empty.
    async fn on_progress(&self, bytes_transferred: u64, total_bytes: u64);

    async fn on_complete(&self);

    /// Invoked on every failure-class terminal, including cooperative
    /// cancellation (with a cancellation-specific message).
    async fn on_error(&self, message: String);
}

/// Terminal and progress events as plain data, for observers that prefer a
/// channel over a trait impl.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Progress {
        bytes_transferred: u64,
        total_bytes: u64,
    },
    Completed,
    Failed {
        message: String,
    },
}

/// Observer that forwards every callback onto an unbounded channel.
///
/// The sender half is dropped together with the observer, so once the engine
/// releases its reference the receiver sees the channel close.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<TransferEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl TransferObserver for ChannelObserver {
    async fn on_progress(&self, bytes_transferred: u64, total_bytes: u64) {
        let _ = self.tx.send(TransferEvent::Progress {
            bytes_transferred,
            total_bytes,
        });
    }

    async fn on_complete(&self) {
        let _ = self.tx.send(TransferEvent::Completed);
    }

    async fn on_error(&self, message: String) {
        let _ = self.tx.send(TransferEvent::Failed { message });
    }
}
