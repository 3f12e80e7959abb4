//! VISCA-over-IP command channel for the PTZ head.
//!
//! Every command opens its own TCP session: connect, send one 7-byte frame,
//! then read the camera's reply frames. Replies are told apart by the high
//! nibble of their second byte (`0x4_` ACK, `0x5_` completion, `0x6_` error).

use crate::camera::camera_entity::CameraEntity;
use crate::core::preset::Preset;
use crate::errors::AppError;
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const COMMAND_HEADER: [u8; 3] = [0x81, 0x01, 0x04];
const RECALL_PRESET_SELECTOR: [u8; 2] = [0x3F, 0x02];
const TERMINATOR: u8 = 0xFF;
const REPLY_ADDRESS: u8 = 0x90;

const REPLY_ACK: u8 = 0x40;
const REPLY_COMPLETION: u8 = 0x50;
const REPLY_ERROR: u8 = 0x60;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// A decoded reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViscaReply {
    Ack,
    Completion,
    Error(u8),
}

/// Builds the `81 01 04 3F 02 NN FF` recall frame. Fails without I/O for numbers outside 1..=256.
pub fn encode_recall_preset(preset_number: u16) -> Result<[u8; 7], AppError> {
    if !Preset::is_valid_number(preset_number) {
        return Err(AppError::InvalidArgument(format!(
            "Invalid preset number: {}. Must be 1-256.",
            preset_number
        )));
    }
    Ok([
        COMMAND_HEADER[0],
        COMMAND_HEADER[1],
        COMMAND_HEADER[2],
        RECALL_PRESET_SELECTOR[0],
        RECALL_PRESET_SELECTOR[1],
        (preset_number & 0xFF) as u8,
        TERMINATOR,
    ])
}

/// Interprets one frame. Frames shorter than 3 bytes or not from the camera's
/// reply address are not replies.
pub fn decode_reply(frame: &[u8]) -> Option<ViscaReply> {
    if frame.len() < 3 || frame[0] != REPLY_ADDRESS {
        return None;
    }
    match frame[1] & 0xF0 {
        REPLY_ACK => Some(ViscaReply::Ack),
        REPLY_COMPLETION => Some(ViscaReply::Completion),
        REPLY_ERROR => Some(ViscaReply::Error(frame[2])),
        _ => None,
    }
}

pub fn error_message(code: u8) -> String {
    match code {
        0x02 => "Syntax Error".to_string(),
        0x03 => "Command Buffer Full".to_string(),
        0x04 => "Command Canceled".to_string(),
        0x05 => "No Socket".to_string(),
        0x41 => "Command Not Executable".to_string(),
        other => format!("Unknown Error ({:02X})", other),
    }
}

/// Splits a read buffer into terminator-delimited frames. A trailing partial
/// frame is kept as-is.
fn split_frames(buf: &[u8]) -> Vec<&[u8]> {
    let mut frames = Vec::new();
    let mut start = 0;
    for (i, byte) in buf.iter().enumerate() {
        if *byte == TERMINATOR {
            frames.push(&buf[start..=i]);
            start = i + 1;
        }
    }
    if start < buf.len() {
        frames.push(&buf[start..]);
    }
    frames
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

/// What one session learned before it ended.
enum AttemptOutcome {
    Done,
    Rejected(u8),
    Soft(String),
}

#[derive(Debug, Clone)]
pub struct ViscaController {
    address: String,
    timeout: Duration,
    retry_delay: Duration,
    max_attempts: u32,
}

impl ViscaController {
    pub fn new(address: impl Into<String>, timeout: Duration, retry_delay: Duration) -> Self {
        let controller = ViscaController {
            address: address.into(),
            timeout,
            retry_delay,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        };
        info!("🎛️ Initialized PTZ controller for {}", controller.address);
        controller
    }

    pub fn from_camera(camera: &CameraEntity) -> Self {
        Self::new(camera.visca_address(), camera.command_timeout(), camera.command_retry_delay())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Moves the camera to a stored preset (1..=256).
    pub async fn recall_preset(&self, preset_number: u16) -> Result<(), AppError> {
        let command = match encode_recall_preset(preset_number) {
            Ok(cmd) => cmd,
            Err(e) => {
                error!("❌ {}", e);
                return Err(e);
            }
        };
        self.send_command(&command, &format!("Recall Preset {}", preset_number)).await
    }

    /// Sends one command with the attempt budget. Each attempt is a fresh session.
    pub async fn send_command(&self, command: &[u8], description: &str) -> Result<(), AppError> {
        let start_time = Instant::now();
        let mut last_error = AppError::TransientNetwork(format!("{}: no attempt made", description));

        for attempt in 1..=self.max_attempts {
            match self.run_session(command, description, attempt).await {
                Ok(AttemptOutcome::Done) => {
                    debug!("✅ '{}' completed on attempt {} in {:?}", description, attempt, start_time.elapsed());
                    return Ok(());
                }
                Ok(AttemptOutcome::Rejected(code)) => {
                    let message = error_message(code);
                    error!("❌ VISCA Error for '{}': {}", description, message);
                    return Err(AppError::Protocol { code, message });
                }
                Ok(AttemptOutcome::Soft(reason)) => {
                    warn!("⚠️ Unexpected or no response on attempt {} for '{}': {}", attempt, description, reason);
                    last_error = AppError::TransientNetwork(format!("{}: {}", description, reason));
                }
                Err(e) => {
                    warn!("⚠️ Socket error on attempt {} for '{}': {}", attempt, description, e);
                    last_error = e;
                }
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        error!(
            "❌ Failed to send '{}' to {} after {} attempts ({:?})",
            description,
            self.address,
            self.max_attempts,
            start_time.elapsed()
        );
        Err(last_error)
    }

    async fn run_session(&self, command: &[u8], description: &str, attempt: u32) -> Result<AttemptOutcome, AppError> {
        debug!("Attempt {}: Connecting to {}", attempt, self.address);
        let mut stream = match timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(AppError::TransientNetwork(format!("connect to {} failed: {}", self.address, e)))
            }
            Err(_) => return Err(AppError::TransientNetwork(format!("connect to {} timed out", self.address))),
        };

        debug!("Sending VISCA command ({}): {}", description, hex(command));
        match timeout(self.timeout, stream.write_all(command)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(AppError::TransientNetwork(format!("send failed: {}", e))),
            Err(_) => return Err(AppError::TransientNetwork("send timed out".to_string())),
        }

        let mut buf = [0u8; 1024];
        let first = match self.read_frames(&mut stream, &mut buf).await? {
            Some(bytes) => bytes,
            None => return Err(AppError::TransientNetwork("Socket timeout waiting for response".to_string())),
        };
        if first.is_empty() {
            return Ok(AttemptOutcome::Soft("connection closed without a response".to_string()));
        }
        debug!("Received response: {}", hex(&first));

        let frames = split_frames(&first);
        let head = match frames.first().and_then(|f| decode_reply(f)) {
            Some(reply) => reply,
            None => return Ok(AttemptOutcome::Soft(format!("unrecognized response {}", hex(&first)))),
        };

        match head {
            ViscaReply::Completion => {
                debug!("Command completed immediately");
                Ok(AttemptOutcome::Done)
            }
            ViscaReply::Error(code) => Ok(AttemptOutcome::Rejected(code)),
            ViscaReply::Ack => {
                debug!("Command acknowledged, waiting for completion...");
                // The completion may already be sitting behind the ACK in the same read.
                if let Some(outcome) = completion_outcome(&frames[1..]) {
                    return Ok(outcome);
                }
                match self.read_frames(&mut stream, &mut buf).await? {
                    None => {
                        warn!("Timeout waiting for completion message, assuming '{}' took effect", description);
                        Ok(AttemptOutcome::Done)
                    }
                    Some(bytes) if bytes.is_empty() => {
                        Ok(AttemptOutcome::Soft("connection closed after ACK".to_string()))
                    }
                    Some(bytes) => {
                        debug!("Completion response: {}", hex(&bytes));
                        Ok(completion_outcome(&split_frames(&bytes))
                            .unwrap_or_else(|| AttemptOutcome::Soft(format!("expected completion, got {}", hex(&bytes)))))
                    }
                }
            }
        }
    }

    /// One bounded read. `Ok(None)` is a timeout, `Ok(Some(empty))` a closed connection.
    async fn read_frames(&self, stream: &mut TcpStream, buf: &mut [u8]) -> Result<Option<Vec<u8>>, AppError> {
        match timeout(self.timeout, stream.read(buf)).await {
            Ok(Ok(n)) => Ok(Some(buf[..n].to_vec())),
            Ok(Err(e)) => Err(AppError::TransientNetwork(format!("receive failed: {}", e))),
            Err(_) => Ok(None),
        }
    }
}

/// After an ACK only a completion finishes the command. An error frame at
/// this point is a soft failure and gets a fresh connection.
fn completion_outcome(frames: &[&[u8]]) -> Option<AttemptOutcome> {
    frames.iter().find_map(|frame| match decode_reply(frame) {
        Some(ViscaReply::Completion) => {
            debug!("Command completed successfully");
            Some(AttemptOutcome::Done)
        }
        Some(ViscaReply::Error(code)) => Some(AttemptOutcome::Soft(format!(
            "error after ACK: {}",
            error_message(code)
        ))),
        _ => None,
    })
}
