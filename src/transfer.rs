use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::observer::TransferObserver;

/// Lifecycle of one transfer. `Pending` only covers the window between id
/// allocation and the task's first poll; the three terminal states are
/// final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Failed | TransferState::Cancelled
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferState::Pending => "pending",
            TransferState::Running => "running",
            TransferState::Completed => "completed",
            TransferState::Failed => "failed",
            TransferState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Caller-held reference to a running transfer.
///
/// Holds only the transfer id and the shared cancellation flag, never the
/// connection. Dropping it has no effect on the task; clones share the same
/// flag.
#[derive(Debug, Clone)]
pub struct TransferHandle {
    id: u64,
    cancel: CancelToken,
}

impl TransferHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request cancellation and return immediately. The in-flight chunk read
    /// is not interrupted; the task stops at its next loop-boundary check,
    /// so at most one chunk of additional progress may be reported.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

type StateMap = Arc<RwLock<HashMap<u64, TransferState>>>;

fn set_state(states: &StateMap, id: u64, state: TransferState) {
    states
        .write()
        .expect("transfer state lock poisoned")
        .insert(id, state);
}

/// Everything the transfer task owns for its lifetime: the rendezvous
/// address, the byte counter, the shared cancellation flag, and the
/// engine's strong reference to the observer.
struct TransferContext {
    id: u64,
    host: String,
    port: u16,
    expected_size: u64,
    cancel: CancelToken,
    observer: Arc<dyn TransferObserver>,
    config: TransferConfig,
    states: StateMap,
}

/// Spawns and tracks payload transfer tasks.
///
/// `start_transfer` returns before the connection is attempted; each
/// transfer runs as its own tokio task (so the engine must be used inside a
/// tokio runtime) and reports exclusively through its observer once spawned.
pub struct TransferEngine {
    config: TransferConfig,
    next_id: AtomicU64,
    states: StateMap,
}

impl Default for TransferEngine {
    fn default() -> Self {
        Self::new(TransferConfig::default())
    }
}

impl TransferEngine {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            config: config.validated(),
            next_id: AtomicU64::new(1),
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Begin streaming the payload advertised at `host:port`.
    ///
    /// Validation failures are returned synchronously and spawn nothing.
    /// On success the transfer runs asynchronously: a returned handle does
    /// not mean the connection was established, only that the task was
    /// scheduled. All subsequent outcomes are delivered through `observer`
    /// as zero or more progress calls followed by exactly one terminal call.
    pub fn start_transfer(
        &self,
        host: impl Into<String>,
        port: u16,
        expected_size: u64,
        observer: Arc<dyn TransferObserver>,
    ) -> Result<TransferHandle, TransferError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(TransferError::Validation(
                "host must not be empty".to_string(),
            ));
        }
        if port == 0 {
            return Err(TransferError::Validation(
                "port must be non-zero".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancelToken::new();
        set_state(&self.states, id, TransferState::Pending);

        info!(id, host = %host, port, expected_size, "starting payload transfer");

        let ctx = TransferContext {
            id,
            host,
            port,
            expected_size,
            cancel: cancel.clone(),
            observer,
            config: self.config.clone(),
            states: self.states.clone(),
        };
        tokio::spawn(run_transfer(ctx));

        Ok(TransferHandle { id, cancel })
    }

    /// Current state of a transfer, or `None` for an id this engine never
    /// issued. Safe to call at any time, including after the task finished.
    pub fn state(&self, id: u64) -> Option<TransferState> {
        self.states
            .read()
            .expect("transfer state lock poisoned")
            .get(&id)
            .copied()
    }

    /// Number of transfers that have not yet reached a terminal state.
    pub fn active_count(&self) -> usize {
        self.states
            .read()
            .expect("transfer state lock poisoned")
            .values()
            .filter(|state| !state.is_terminal())
            .count()
    }
}

async fn run_transfer(ctx: TransferContext) {
    set_state(&ctx.states, ctx.id, TransferState::Running);

    match stream_payload(&ctx).await {
        Ok(bytes_transferred) => {
            info!(id = ctx.id, bytes_transferred, "payload transfer complete");
            set_state(&ctx.states, ctx.id, TransferState::Completed);
            ctx.observer.on_complete().await;
        }
        Err(err) if err.is_cancellation() => {
            info!(id = ctx.id, "payload transfer cancelled");
            set_state(&ctx.states, ctx.id, TransferState::Cancelled);
            ctx.observer.on_error(err.to_string()).await;
        }
        Err(err) => {
            warn!(id = ctx.id, error = %err, "payload transfer failed");
            set_state(&ctx.states, ctx.id, TransferState::Failed);
            ctx.observer.on_error(err.to_string()).await;
        }
    }
}

/// Connect and drain the payload stream, reporting per-chunk progress.
/// The connection is owned here and closed on every return path.
async fn stream_payload(ctx: &TransferContext) -> Result<u64, TransferError> {
    // Fast path: a cancel that lands before the first poll skips the
    // connection entirely.
    if ctx.cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }

    let addr = format!("{}:{}", ctx.host, ctx.port);
    let connect = TcpStream::connect(&addr);
    let mut stream = match ctx.config.connect_timeout() {
        Some(limit) => timeout(limit, connect)
            .await
            .map_err(|_| TransferError::ConnectTimeout(limit))?
            .map_err(TransferError::Connect)?,
        None => connect.await.map_err(TransferError::Connect)?,
    };
    debug!(id = ctx.id, addr = %addr, "payload connection established");

    let mut buf = BytesMut::with_capacity(ctx.config.chunk_size);
    buf.resize(ctx.config.chunk_size, 0);
    let mut bytes_transferred: u64 = 0;

    loop {
        if ctx.cancel.is_cancelled() {
            debug!(id = ctx.id, bytes_transferred, "cancellation observed");
            return Err(TransferError::Cancelled);
        }

        let n = stream.read(&mut buf).await.map_err(TransferError::Stream)?;
        if n == 0 {
            // Stream end. An advertised size of 0 means unknown/empty, so
            // any endpoint counts as success; otherwise the counter must
            // match exactly.
            if ctx.expected_size == 0 || bytes_transferred == ctx.expected_size {
                return Ok(bytes_transferred);
            }
            return Err(TransferError::Incomplete {
                transferred: bytes_transferred,
                expected: ctx.expected_size,
            });
        }

        bytes_transferred += n as u64;
        ctx.observer
            .on_progress(bytes_transferred, ctx.expected_size)
            .await;
    }
}
