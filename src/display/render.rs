use crate::hal::Rgb;
use crate::history::DistanceHistory;
use crate::state::{ChannelStatus, DirectionalReading, DisplayMode, TelemetryState};

/// Build one frame for the current mode.
///
/// Mode content fills every pixel but the last; the last pixel is written
/// afterwards with the channel status so mode drawing can never hide it.
pub fn render_frame(state: &TelemetryState, led_count: usize, threshold_cm: f64) -> Vec<Rgb> {
    let mut frame = vec![Rgb::OFF; led_count];
    let Some(indicator) = led_count.checked_sub(1) else {
        return frame;
    };

    let content = &mut frame[..indicator];
    match state.mode {
        DisplayMode::Normal => render_normal(content, state.latest_distance, threshold_cm),
        DisplayMode::History => render_history(content, &state.history, threshold_cm),
        DisplayMode::Directional => {
            render_directional(content, &state.directional, threshold_cm)
        }
    }

    frame[indicator] = status_color(state.channel_status);
    frame
}

/// Bar graph growing as the object gets closer, green at the base, redder
/// towards the top
pub fn render_normal(pixels: &mut [Rgb], distance_cm: f64, threshold_cm: f64) {
    let usable = pixels.len();
    if usable == 0 {
        return;
    }

    let ratio = if distance_cm < threshold_cm {
        (1.0 - distance_cm / threshold_cm).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let min_lit = if ratio > 0.0 { 1 } else { 0 };
    let lit = ((ratio * usable as f64) as usize).clamp(min_lit, usable);

    for (i, pixel) in pixels.iter_mut().take(lit).enumerate() {
        let position = i as f64 / usable as f64;
        *pixel = Rgb::new((255.0 * position) as u8, (255.0 * (1.0 - position)) as u8, 0);
    }
}

/// Most recent samples, oldest at pixel 0, blue brighter the closer it was
pub fn render_history(pixels: &mut [Rgb], history: &DistanceHistory, threshold_cm: f64) {
    let recent = history.recent(pixels.len());

    for (pixel, distance) in pixels.iter_mut().zip(recent) {
        if distance < threshold_cm {
            let intensity = proximity_intensity(distance, threshold_cm);
            *pixel = Rgb::new(0, intensity / 2, intensity);
        }
    }
}

/// One purple dot per sensor position with something in range
pub fn render_directional(
    pixels: &mut [Rgb],
    readings: &[DirectionalReading],
    threshold_cm: f64,
) {
    let usable = pixels.len();
    if usable == 0 {
        return;
    }

    for reading in readings {
        if reading.distance_cm < threshold_cm {
            let position = reading.sensor_id as usize % usable;
            let intensity = proximity_intensity(reading.distance_cm, threshold_cm);
            pixels[position] = Rgb::new(intensity, 0, 255 - intensity);
        }
    }
}

/// 0 at the threshold, 255 at contact
pub fn proximity_intensity(distance_cm: f64, threshold_cm: f64) -> u8 {
    (255.0 * (1.0 - distance_cm / threshold_cm)).clamp(0.0, 255.0) as u8
}

pub fn status_color(status: ChannelStatus) -> Rgb {
    match status {
        ChannelStatus::Idle => Rgb::BLUE,
        ChannelStatus::Sending => Rgb::YELLOW,
        ChannelStatus::Error => Rgb::RED,
    }
}
