use super::spidev::SpiDevice;
use crate::error::HardwareError;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing::trace;

/// SPI clock giving 416 ns per bit, three SPI bits per WS2812 bit
const WS2812_SPI_HZ: u32 = 2_400_000;

/// Zero bytes holding the data line low long enough to latch (>50 us)
const WS2812_RESET_BYTES: usize = 32;

/// One LED color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `factor` (0.0 - 1.0)
    pub fn scaled(self, factor: f32) -> Self {
        let scale = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

/// Addressable LED output
pub trait PixelStrip: Send {
    /// Latch a full frame onto the LEDs
    fn show(&mut self, frame: &[Rgb]) -> io::Result<()>;
}

/// WS2812 strip clocked out of an SPI MOSI line
pub struct Ws2812SpiStrip {
    device: SpiDevice,
    brightness: f32,
    buffer: Vec<u8>,
}

impl Ws2812SpiStrip {
    pub fn open(path: &str, brightness: f32) -> Result<Self, HardwareError> {
        Ok(Self {
            device: SpiDevice::open(path, WS2812_SPI_HZ)?,
            brightness,
            buffer: Vec::new(),
        })
    }
}

impl PixelStrip for Ws2812SpiStrip {
    fn show(&mut self, frame: &[Rgb]) -> io::Result<()> {
        encode_ws2812(frame, self.brightness, &mut self.buffer);
        self.device.write(&self.buffer)
    }
}

/// Expand a frame into the SPI bit stream a WS2812 chain expects.
///
/// Colors go out in GRB order; every data bit becomes `110` (one) or `100`
/// (zero) on the wire.
pub fn encode_ws2812(frame: &[Rgb], brightness: f32, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(frame.len() * 9 + WS2812_RESET_BYTES);

    for pixel in frame {
        let pixel = pixel.scaled(brightness);
        for byte in [pixel.g, pixel.r, pixel.b] {
            let mut bits: u32 = 0;
            for i in (0..8).rev() {
                let symbol = if byte & (1 << i) != 0 { 0b110 } else { 0b100 };
                bits = (bits << 3) | symbol;
            }
            out.extend_from_slice(&[(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]);
        }
    }

    out.resize(out.len() + WS2812_RESET_BYTES, 0);
}

/// Strip that keeps the last shown frame in memory
#[derive(Clone)]
pub struct SimulatedStrip {
    last_frame: Arc<Mutex<Vec<Rgb>>>,
    frames_shown: Arc<Mutex<u64>>,
}

impl SimulatedStrip {
    pub fn new(len: usize) -> Self {
        Self {
            last_frame: Arc::new(Mutex::new(vec![Rgb::OFF; len])),
            frames_shown: Arc::new(Mutex::new(0)),
        }
    }

    pub fn last_frame(&self) -> Vec<Rgb> {
        self.last_frame.lock().clone()
    }

    pub fn frames_shown(&self) -> u64 {
        *self.frames_shown.lock()
    }
}

impl PixelStrip for SimulatedStrip {
    fn show(&mut self, frame: &[Rgb]) -> io::Result<()> {
        trace!("[SIM] LEDs -> {:?}", frame);
        *self.last_frame.lock() = frame.to_vec();
        *self.frames_shown.lock() += 1;
        Ok(())
    }
}
