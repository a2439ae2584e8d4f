//! Line-oriented async I/O over a single serial descriptor.
//!
//! The port is split into read and write halves behind separate locks,
//! so writes can be issued while a read is parked waiting for its
//! delimiter. Concurrent `read_until` callers queue on the reader lock
//! and are served one at a time.
//!
//! Reads drain up to [`READ_CHUNK`] bytes per readiness event into an
//! internal buffer; `read_until` slices off everything up to and
//! including the delimiter and keeps the remainder for the next call.
//! The read timeout is explicit: `None` waits forever, which is only
//! appropriate on links with some external liveness guarantee.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

use crate::error::ProtocolError;

/// Trait alias for async serial port I/O. Real hardware
/// (`tokio_serial::SerialStream`) and test ports
/// (`tokio::io::DuplexStream`) both qualify.
pub trait SerialPortIO: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPortIO for T {}

/// Type-erased boxed serial port.
pub type DynSerial = Box<dyn SerialPortIO>;

/// Bytes drained from the descriptor per readiness event.
pub const READ_CHUNK: usize = 4096;

/// Default bound on a single `read_until` wait.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

struct ReadState {
    half: ReadHalf<DynSerial>,
    buf: BytesMut,
}

/// Buffered, lock-protected line transport over a serial port.
pub struct LineTransport {
    reader: Mutex<ReadState>,
    writer: Mutex<WriteHalf<DynSerial>>,
    read_timeout: Option<Duration>,
}

fn find_delimiter(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

impl LineTransport {
    pub fn new(port: DynSerial) -> Self {
        let (read_half, write_half) = tokio::io::split(port);
        Self {
            reader: Mutex::new(ReadState {
                half: read_half,
                buf: BytesMut::with_capacity(READ_CHUNK),
            }),
            writer: Mutex::new(write_half),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Bound every subsequent `read_until` wait; `None` waits forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Read until `delimiter` is seen, returning the bytes up to and
    /// including it. Data after the delimiter stays buffered for the
    /// next call.
    pub async fn read_until(&self, delimiter: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut state = self.reader.lock().await;
        let deadline = self.read_timeout.map(|t| tokio::time::Instant::now() + t);

        loop {
            if let Some(pos) = find_delimiter(&state.buf, delimiter) {
                let chunk = state.buf.split_to(pos + delimiter.len());
                return Ok(chunk.to_vec());
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, state.half.read(&mut chunk)).await {
                        Ok(read) => read?,
                        Err(_) => return Err(ProtocolError::Timeout),
                    }
                }
                None => state.half.read(&mut chunk).await?,
            };
            if n == 0 {
                return Err(ProtocolError::UnexpectedEof);
            }
            state.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// [`LineTransport::read_until`] with a newline delimiter.
    pub async fn read_line(&self) -> Result<Vec<u8>, ProtocolError> {
        self.read_until(b"\n").await
    }

    /// Queue `data` for transmission and flush it. Returns the number
    /// of bytes accepted.
    pub async fn write(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(data.len())
    }

    /// Discard buffered and in-flight bytes until the link stays silent
    /// or `window` elapses. Returns the number of bytes discarded.
    pub async fn drain(&self, window: Duration) -> usize {
        let mut state = self.reader.lock().await;
        let mut discarded = state.buf.len();
        state.buf.clear();

        let deadline = tokio::time::Instant::now() + window;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, state.half.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => discarded += n,
                Ok(Err(_)) => break,
                Err(_) => break,
            }
        }
        discarded
    }
}

/// Open a real serial port with the standard 8N1 settings and wrap it
/// in a [`LineTransport`]. Uses `spawn_blocking` so port initialization
/// does not stall the runtime.
pub async fn open_serial(port_path: &str, baud_rate: u32) -> anyhow::Result<LineTransport> {
    use anyhow::Context;
    use tokio_serial::SerialPortBuilderExt;

    let path = port_path.to_string();
    let port = tokio::task::spawn_blocking(move || {
        tokio_serial::new(&path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .context(format!("Failed to open WSS serial port: {path}"))
    })
    .await
    .context("spawn_blocking for serial port opening failed")??;

    tracing::info!(port = port_path, baud_rate, "Opened WSS serial port");
    Ok(LineTransport::new(Box::new(port)))
}
