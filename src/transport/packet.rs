use crate::error::TransportError;
use crate::sensor::round_to;
use crate::state::DisplayMode;
use serde::Serialize;

/// History samples carried in each reliable-channel packet
pub const HISTORY_WINDOW: usize = 5;

pub const FAST_FRAME_START: u8 = 0x01;
pub const FAST_FRAME_END: u8 = 0xFF;
pub const FAST_FRAME_LEN: usize = 6;

/// Reliable-channel status record; field names are the wire keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPacket {
    /// Distance in cm, 2 decimals
    pub d: f64,
    /// Display mode wire value
    pub m: u8,
    /// 1 when alerting
    pub a: u8,
    /// Last few history samples, 1 decimal, oldest first
    pub h: Vec<f64>,
}

impl StatusPacket {
    pub fn new(distance_cm: f64, mode: DisplayMode, history: &[f64], alert: bool) -> Self {
        let skip = history.len().saturating_sub(HISTORY_WINDOW);
        Self {
            d: round_to(distance_cm, 2),
            m: mode.wire_value(),
            a: u8::from(alert),
            h: history[skip..].iter().map(|x| round_to(*x, 1)).collect(),
        }
    }
}

/// Encode the newline-terminated JSON line for the reliable channel
pub fn encode_status(
    distance_cm: f64,
    mode: DisplayMode,
    history: &[f64],
    alert: bool,
) -> Result<String, TransportError> {
    let packet = StatusPacket::new(distance_cm, mode, history, alert);
    let mut line = serde_json::to_string(&packet)?;
    line.push('\n');
    Ok(line)
}

/// Encode the fixed 6-byte fast-channel frame: start marker, native-endian
/// f32 distance, end marker
pub fn encode_fast_frame(distance_cm: f64) -> [u8; FAST_FRAME_LEN] {
    let mut frame = [0u8; FAST_FRAME_LEN];
    frame[0] = FAST_FRAME_START;
    frame[1..5].copy_from_slice(&(distance_cm as f32).to_ne_bytes());
    frame[5] = FAST_FRAME_END;
    frame
}
