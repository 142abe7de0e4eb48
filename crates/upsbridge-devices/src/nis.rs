//! apcupsd Network Information Server (NIS) client.
//!
//! ## Wire Format
//!
//! Every frame is a big-endian `u16` length followed by that many ASCII bytes.
//! The client sends a single `status` frame; the daemon answers with one
//! frame per `NAME : value` line and closes the report with a zero-length
//! frame.
//!
//! ```text
//! client -> 00 06 "status"
//! daemon <- 00 1b "APC      : 001,036,0877\n"
//! daemon <- ...
//! daemon <- 00 00
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use upsbridge_core::config::apcupsd;
use upsbridge_core::error::{Error, Result};
use upsbridge_core::{framing_err, parse_lines, Report};

/// Zero-length frame that ends a response.
pub const TERMINATOR: [u8; 2] = [0, 0];

/// Client for the status daemon.
#[derive(Debug, Clone)]
pub struct NisClient {
    host: String,
    port: u16,
}

impl NisClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Daemon address (host:port).
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect, request the status report and parse it.
    ///
    /// The connection is closed before this returns, whatever the outcome.
    pub async fn fetch_status(&self) -> Result<Report> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| Error::Connection(format!("{}: {}", self.addr(), e)))?;
        debug!(addr = %self.addr(), "Connected to status daemon");

        let report = request_status(&mut stream).await?;
        info!(addr = %self.addr(), fields = report.len(), "Fetched status report");
        Ok(report)
    }
}

impl Default for NisClient {
    fn default() -> Self {
        Self::new(apcupsd::DEFAULT_HOST, apcupsd::DEFAULT_PORT)
    }
}

/// Fetch a status report from `host:port`.
pub async fn fetch_status(host: &str, port: u16) -> Result<Report> {
    NisClient::new(host, port).fetch_status().await
}

/// Run the `status` exchange over an already open stream.
pub async fn request_status<S>(stream: &mut S) -> Result<Report>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = encode_frame(apcupsd::STATUS_COMMAND.as_bytes())?;
    stream
        .write_all(&request)
        .await
        .map_err(|e| Error::Connection(format!("failed to send status request: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| Error::Connection(format!("failed to send status request: {}", e)))?;

    let lines = read_lines(stream).await?;
    parse_lines(&lines)
}

/// Read frames until the terminator and return their text in order.
///
/// Nothing is read past the terminator.
pub async fn read_lines<R>(reader: &mut R) -> Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut lines = Vec::new();
    while let Some(line) = read_frame(reader).await? {
        lines.push(line);
    }
    debug!(frames = lines.len(), "Reached terminator frame");
    Ok(lines)
}

/// Read one frame. `None` means the terminator was read.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 2];
    reader
        .read_exact(&mut prefix)
        .await
        .map_err(|e| framing_err!("failed to read frame length: {}", e))?;

    let len = u16::from_be_bytes(prefix) as usize;
    if len == 0 {
        return Ok(None);
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| framing_err!("frame of {} bytes truncated: {}", len, e))?;

    if !payload.is_ascii() {
        return Err(framing_err!("frame of {} bytes is not ASCII", len));
    }
    let line = String::from_utf8(payload).map_err(|e| framing_err!("invalid frame text: {}", e))?;
    debug!(line = %line.trim_end(), "Read frame");
    Ok(Some(line))
}

/// Prefix `payload` with its big-endian `u16` length.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u16::try_from(payload.len())
        .map_err(|_| framing_err!("payload of {} bytes exceeds frame limit", payload.len()))?;
    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}
