//! Timeout-bounded request/response channel
//!
//! A [`Channel`] owns the byte-stream transport and a single-threaded tokio
//! runtime that drives it. Every operation blocks the calling thread until
//! the runtime has settled it, so callers see a plain synchronous API.
//!
//! A bounded read races the read against a timer on that runtime. Whichever
//! finishes first wins; the other future is dropped, which cancels it, so no
//! operation is left pending on the transport once the call returns.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::runtime::{Builder, Runtime};

use super::{TransportError, DEFAULT_TIMEOUT_MS};

/// Byte stream the receiver is reachable through
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Build the executor that drives a channel's transport.
pub(crate) fn io_runtime() -> Result<Runtime, TransportError> {
    Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .map_err(|e| TransportError::Runtime(e.to_string()))
}

/// A transport plus the executor and the fixed response timeout used with it.
///
/// Operations block the calling thread, so a channel must be used and
/// dropped outside any async context. Calls made from inside a running
/// tokio runtime fail with [`TransportError::Runtime`].
pub struct Channel<T: Transport> {
    runtime: Runtime,
    transport: T,
    timeout: Duration,
}

impl<T: Transport> Channel<T> {
    /// Wrap a transport, using the receiver's documented response timeout
    pub fn new(transport: T) -> Result<Self, TransportError> {
        Self::with_timeout(transport, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// Wrap a transport with a different fixed response timeout
    pub fn with_timeout(transport: T, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self::from_parts(io_runtime()?, transport, timeout))
    }

    /// Wrap a transport that was created inside `runtime`'s context.
    ///
    /// Transports registered with a reactor (such as serial streams) must be
    /// driven by the runtime they were created in.
    pub(crate) fn from_parts(runtime: Runtime, transport: T, timeout: Duration) -> Self {
        Self {
            runtime,
            transport,
            timeout,
        }
    }

    /// Response timeout applied to every bounded read
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write `bytes` to the transport and return how many were written.
    ///
    /// A single write is issued, as with a raw serial port; a short count is
    /// reported to the caller rather than retried.
    pub fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        ensure_blocking_context()?;
        let transport = &mut self.transport;
        let written = self.runtime.block_on(async {
            let n = transport.write(bytes).await?;
            transport.flush().await?;
            Ok::<_, std::io::Error>(n)
        })?;

        tracing::debug!(
            "send: wrote {} of {} bytes: {:02x?}",
            written,
            bytes.len(),
            &bytes[..written]
        );
        Ok(written)
    }

    /// Read up to `max_bytes`, giving up when the response timeout expires.
    ///
    /// The read keeps collecting until the buffer is full, the peer closes
    /// the stream, an error occurs or the timer fires. Bytes collected
    /// before a timeout, close or error are returned as a partial reply;
    /// with nothing collected these become [`TransportError::Timeout`],
    /// [`TransportError::Disconnected`] or [`TransportError::Io`].
    pub fn receive_with_timeout(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        ensure_blocking_context()?;
        let timeout = self.timeout;
        let transport = &mut self.transport;
        let mut buffer = vec![0u8; max_bytes];
        let mut filled = 0usize;

        let outcome = self.runtime.block_on(async {
            let read = async {
                while filled < max_bytes {
                    match transport.read(&mut buffer[filled..]).await {
                        Ok(0) => return ReadEnd::Closed,
                        Ok(n) => filled += n,
                        Err(e) => return ReadEnd::Failed(e),
                    }
                }
                ReadEnd::Full
            };

            tokio::select! {
                end = read => end,
                _ = tokio::time::sleep(timeout) => ReadEnd::TimedOut,
            }
        });

        buffer.truncate(filled);
        tracing::debug!(
            "receive_with_timeout: {:?} after {} bytes: {:02x?}",
            outcome,
            filled,
            buffer
        );

        match outcome {
            ReadEnd::Full => Ok(buffer),
            _ if filled > 0 => Ok(buffer),
            ReadEnd::TimedOut => Err(TransportError::Timeout),
            ReadEnd::Closed => Err(TransportError::Disconnected),
            ReadEnd::Failed(e) => Err(TransportError::Io(e)),
        }
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Take the transport back, shutting the executor down
    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// Blocking on the channel's runtime from inside another runtime would panic
fn ensure_blocking_context() -> Result<(), TransportError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(TransportError::Runtime(
            "channel used from inside an async context".to_string(),
        ));
    }
    Ok(())
}

/// How a bounded read came to an end
#[derive(Debug)]
enum ReadEnd {
    Full,
    Closed,
    TimedOut,
    Failed(std::io::Error),
}
