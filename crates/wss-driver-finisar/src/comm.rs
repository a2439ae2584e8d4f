//! Line protocol for the vendor command set.
//!
//! Commands are single ASCII lines terminated by `\r\n`, optionally
//! wrapped in the checksum frame. The device answers with zero or more
//! payload lines followed by an `OK` prompt, or with one of its error
//! mnemonics (`CER`, `AER`, `RER`, `VER`).

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::error::ProtocolError;
use crate::frame;
use crate::transport::LineTransport;

/// Line terminator used by the device.
pub const EOL: &str = "\r\n";

/// Success prompt, e.g. `OK`, `^OK$FF66`.
const PROMPT_PATTERN: &str = r"^\^?OK(\$FF66)?";

/// Error mnemonics, e.g. `CER`, `^VER$A0B1`.
const ERROR_PATTERN: &str = r"(?i)\^?(CER|AER|RER|VER)(\$[A-F0-9]{4})?\s*$";

fn prompt_regex() -> &'static Regex {
    static PROMPT: OnceLock<Regex> = OnceLock::new();
    PROMPT.get_or_init(|| Regex::new(PROMPT_PATTERN).expect("valid regex"))
}

fn error_regex() -> &'static Regex {
    static ERROR: OnceLock<Regex> = OnceLock::new();
    ERROR.get_or_init(|| Regex::new(ERROR_PATTERN).expect("valid regex"))
}

/// Serial communication with a Finisar-style WSS.
pub struct Communication {
    transport: LineTransport,
    use_checksum: bool,
    verify_checksums: bool,
}

impl Communication {
    /// `use_checksum` frames outgoing commands; `verify_checksums`
    /// additionally runs [`frame::verify_response`] on response bodies
    /// (disabled in deployed configurations).
    pub fn new(transport: LineTransport, use_checksum: bool, verify_checksums: bool) -> Self {
        Self {
            transport,
            use_checksum,
            verify_checksums,
        }
    }

    /// Settle the link: poke it with an empty line and discard whatever
    /// garbage the equipment has queued.
    pub async fn connect(&self, settle: Duration) -> Result<(), ProtocolError> {
        self.transport.write(EOL.as_bytes()).await?;
        let discarded = self.transport.drain(settle).await;
        if discarded > 0 {
            tracing::debug!(discarded, "flushed stale bytes from WSS link");
        }
        Ok(())
    }

    /// Send one command line and collect the response until the device
    /// prompts. Returns the stripped response payload.
    pub async fn command(&self, command: &str) -> Result<String, ProtocolError> {
        let line = if self.use_checksum {
            frame::encode(command)
        } else {
            command.to_string()
        };
        tracing::debug!(cmd = %command, "sending WSS command");
        self.transport
            .write(format!("{line}{EOL}").as_bytes())
            .await?;

        let mut payload_lines: Vec<String> = Vec::new();
        loop {
            let raw = self.transport.read_line().await?;
            let text = String::from_utf8_lossy(&raw);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if let Some(captures) = error_regex().captures(text) {
                let code = captures
                    .get(1)
                    .map(|m| m.as_str().to_uppercase())
                    .unwrap_or_else(|| "ERR".to_string());
                tracing::warn!(cmd = %command, line = %text, "WSS reported an error");
                return Err(ProtocolError::Device {
                    code,
                    line: text.to_string(),
                });
            }
            if prompt_regex().is_match(text) {
                break;
            }
            payload_lines.push(text.to_string());
        }

        let body = payload_lines.join("\n");
        if self.verify_checksums {
            frame::verify_response(&body)?;
        }
        tracing::debug!(cmd = %command, response = %body, "WSS response");
        Ok(frame::strip_checksum(&body))
    }

    /// Switch the device to its flexible-grid channel plan (`CHW 0`).
    pub async fn enforce_flexgrid(&self) -> Result<String, ProtocolError> {
        self.command("CHW 0").await
    }

    /// Allocate spectral slices to channels (`DCC`). Each entry is the
    /// first and last 1-based slice of a channel, in channel-plan order.
    pub async fn configure_grid(&self, slices: &[(u32, u32)]) -> Result<String, ProtocolError> {
        let body: String = slices
            .iter()
            .enumerate()
            .map(|(i, (first, last))| format!("{}={}:{};", i + 1, first, last))
            .collect();
        self.command(&format!("DCC {body}")).await
    }

    /// Update per-channel port and attenuation (`UCA`). A blocked
    /// channel is encoded by the caller as `(99, 99.9)`.
    pub async fn update_grid(&self, settings: &[(u32, f64)]) -> Result<String, ProtocolError> {
        let body: String = settings
            .iter()
            .enumerate()
            .map(|(i, (port, attenuation))| format!("{},{},{:.1};", i + 1, port, attenuation))
            .collect();
        self.command(&format!("UCA {body}")).await
    }

    /// Current channel plan (`DCC?`) as `(channel, (first, last))`
    /// slice assignments.
    pub async fn query_channel_plan(&self) -> Result<Vec<(u32, (u32, u32))>, ProtocolError> {
        let payload = self.command("DCC?").await?;
        parse_channel_plan(&payload)
    }

    /// Configuration of every channel in the plan (`RRA?`) as
    /// `(channel, port, attenuation)` triples.
    pub async fn read_reconfiguration_array(
        &self,
    ) -> Result<Vec<(u32, u32, f64)>, ProtocolError> {
        let payload = self.command("RRA?").await?;
        parse_reconfiguration_array(&payload)
    }

    /// Start-up state of the device (`SUS?`): SLS, SAB or SFD.
    pub async fn startup_state(&self) -> Result<String, ProtocolError> {
        self.command("SUS?").await
    }

    /// Firmware release version (`FWR?`).
    pub async fn firmware_release(&self) -> Result<String, ProtocolError> {
        self.command("FWR?").await
    }

    /// Hardware (FPGA) release version (`HWR?`).
    pub async fn hardware_release(&self) -> Result<String, ProtocolError> {
        self.command("HWR?").await
    }

    /// Device serial number (`SNO?`).
    pub async fn serial_number(&self) -> Result<String, ProtocolError> {
        self.command("SNO?").await
    }

    /// Operational status word (`OSS?`).
    pub async fn operation_status(&self) -> Result<String, ProtocolError> {
        self.command("OSS?").await
    }
}

fn parse_channel_plan(payload: &str) -> Result<Vec<(u32, (u32, u32))>, ProtocolError> {
    payload
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (channel, range) = entry
                .split_once('=')
                .ok_or_else(|| ProtocolError::Parse(entry.to_string()))?;
            let (first, last) = range
                .split_once(':')
                .ok_or_else(|| ProtocolError::Parse(entry.to_string()))?;
            let channel = channel
                .trim()
                .parse()
                .map_err(|_| ProtocolError::Parse(entry.to_string()))?;
            let first = first
                .trim()
                .parse()
                .map_err(|_| ProtocolError::Parse(entry.to_string()))?;
            let last = last
                .trim()
                .parse()
                .map_err(|_| ProtocolError::Parse(entry.to_string()))?;
            Ok((channel, (first, last)))
        })
        .collect()
}

fn parse_reconfiguration_array(payload: &str) -> Result<Vec<(u32, u32, f64)>, ProtocolError> {
    payload
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.split(',').map(str::trim);
            let (Some(channel), Some(port), Some(attenuation), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err(ProtocolError::Parse(entry.to_string()));
            };
            let channel = channel
                .parse()
                .map_err(|_| ProtocolError::Parse(entry.to_string()))?;
            let port = port
                .parse()
                .map_err(|_| ProtocolError::Parse(entry.to_string()))?;
            let attenuation = attenuation
                .parse()
                .map_err(|_| ProtocolError::Parse(entry.to_string()))?;
            Ok((channel, port, attenuation))
        })
        .collect()
}
