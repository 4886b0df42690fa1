mod channel;
mod manager;
mod packet;

pub use channel::{SerialChannel, SpiChannel, TelemetryChannel};
pub use manager::TelemetryTransport;
pub use packet::{
    encode_fast_frame, encode_status, StatusPacket, FAST_FRAME_END, FAST_FRAME_LEN,
    FAST_FRAME_START, HISTORY_WINDOW,
};

use crate::state::ChannelStatus;

/// Anything that can show the link status to a person standing nearby
pub trait StatusIndicator: Send + Sync {
    fn show_status(&self, status: ChannelStatus);
}
