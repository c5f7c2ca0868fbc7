pub mod cancel;
pub mod config;
pub mod error;
pub mod observer;
pub mod packet;
pub mod transfer;

pub use cancel::CancelToken;
pub use config::TransferConfig;
pub use error::TransferError;
pub use observer::{ChannelObserver, TransferEvent, TransferObserver};
pub use packet::{Packet, PayloadInfo};
pub use transfer::{TransferEngine, TransferHandle, TransferState};

// Re-export commonly used types
pub use bytes;
pub use serde;
pub use tokio;
