use super::*;
use crate::events::{EventBus, ProxwatchEvent};
use crate::hal::{Rgb, SimulatedStrip};
use crate::state::{ChannelStatus, DirectionalReading, DisplayMode, SharedTelemetryState, TelemetryState};
use crate::transport::StatusIndicator;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const LEDS: usize = 8;
const THRESHOLD: f64 = 50.0;

fn state_with(distance: f64, mode: DisplayMode) -> TelemetryState {
    let mut state = TelemetryState::new(8).unwrap();
    state.latest_distance = distance;
    state.history.push(distance);
    state.directional = vec![DirectionalReading {
        sensor_id: 0,
        distance_cm: distance,
    }];
    state.mode = mode;
    state
}

fn engine_with_strip() -> (AnimationEngine, SimulatedStrip, SharedTelemetryState, EventBus) {
    let strip = SimulatedStrip::new(LEDS);
    let state = SharedTelemetryState::new(8).unwrap();
    let bus = EventBus::new(16);
    let engine = AnimationEngine::new(
        Box::new(strip.clone()),
        state.clone(),
        bus.clone(),
        LEDS,
        THRESHOLD,
        Duration::from_secs(10),
    );
    (engine, strip, state, bus)
}

#[test]
fn test_normal_mode_half_threshold() {
    let frame = render_frame(&state_with(25.0, DisplayMode::Normal), LEDS, THRESHOLD);

    assert_eq!(frame.len(), LEDS);
    assert_eq!(frame[0], Rgb::new(0, 255, 0));
    assert_eq!(frame[1], Rgb::new(36, 218, 0));
    assert_eq!(frame[2], Rgb::new(72, 182, 0));
    for pixel in &frame[3..7] {
        assert_eq!(*pixel, Rgb::OFF);
    }
    assert_eq!(frame[7], Rgb::BLUE);
}

#[test]
fn test_normal_mode_lights_at_least_one_pixel() {
    // ratio 0.02 would round down to zero lit pixels
    let frame = render_frame(&state_with(49.0, DisplayMode::Normal), LEDS, THRESHOLD);
    assert_eq!(frame[0], Rgb::new(0, 255, 0));
    assert!(frame[1..7].iter().all(|p| *p == Rgb::OFF));
}

#[test]
fn test_normal_mode_far_object_is_dark() {
    let frame = render_frame(&state_with(120.0, DisplayMode::Normal), LEDS, THRESHOLD);
    assert!(frame[..7].iter().all(|p| *p == Rgb::OFF));
    assert_eq!(frame[7], Rgb::BLUE);
}

#[test]
fn test_normal_mode_contact_fills_bar() {
    let frame = render_frame(&state_with(0.0, DisplayMode::Normal), LEDS, THRESHOLD);
    assert!(frame[..7].iter().all(|p| *p != Rgb::OFF));
}

#[test]
fn test_history_mode_maps_recent_samples() {
    let mut state = TelemetryState::new(8).unwrap();
    state.mode = DisplayMode::History;
    for distance in [100.0, 25.0, 60.0, 0.0] {
        state.history.push(distance);
    }

    let frame = render_frame(&state, LEDS, THRESHOLD);

    assert_eq!(frame[0], Rgb::OFF);
    assert_eq!(frame[1], Rgb::new(0, 63, 127));
    assert_eq!(frame[2], Rgb::OFF);
    assert_eq!(frame[3], Rgb::new(0, 127, 255));
    assert!(frame[4..7].iter().all(|p| *p == Rgb::OFF));
}

#[test]
fn test_history_mode_uses_only_newest_samples() {
    let mut state = TelemetryState::new(8).unwrap();
    state.mode = DisplayMode::History;
    // 8 samples but only 7 content pixels; the oldest (0.0) must not show
    state.history.push(0.0);
    for _ in 0..7 {
        state.history.push(100.0);
    }

    let frame = render_frame(&state, LEDS, THRESHOLD);
    assert!(frame[..7].iter().all(|p| *p == Rgb::OFF));
}

#[test]
fn test_directional_mode_places_dot_by_sensor() {
    let mut state = TelemetryState::new(8).unwrap();
    state.mode = DisplayMode::Directional;
    state.directional = vec![
        DirectionalReading {
            sensor_id: 9,
            distance_cm: 25.0,
        },
        DirectionalReading {
            sensor_id: 3,
            distance_cm: 80.0,
        },
    ];

    let frame = render_frame(&state, LEDS, THRESHOLD);

    // 9 % 7 == 2
    assert_eq!(frame[2], Rgb::new(127, 0, 128));
    assert_eq!(frame[3], Rgb::OFF);
}

#[test]
fn test_indicator_always_reflects_channel_status() {
    for (status, color) in [
        (ChannelStatus::Idle, Rgb::BLUE),
        (ChannelStatus::Sending, Rgb::YELLOW),
        (ChannelStatus::Error, Rgb::RED),
    ] {
        for mode in [DisplayMode::Normal, DisplayMode::History, DisplayMode::Directional] {
            let mut state = state_with(0.0, mode);
            state.channel_status = status;
            let frame = render_frame(&state, LEDS, THRESHOLD);
            assert_eq!(frame[LEDS - 1], color);
        }
    }
}

#[test]
fn test_tiny_strips() {
    let state = state_with(10.0, DisplayMode::Normal);
    assert!(render_frame(&state, 0, THRESHOLD).is_empty());
    assert_eq!(render_frame(&state, 1, THRESHOLD), vec![Rgb::BLUE]);
}

#[test]
fn test_intensity_bounds() {
    assert_eq!(proximity_intensity(0.0, THRESHOLD), 255);
    assert_eq!(proximity_intensity(THRESHOLD, THRESHOLD), 0);
    assert_eq!(proximity_intensity(200.0, THRESHOLD), 0);
    assert_eq!(proximity_intensity(-5.0, THRESHOLD), 255);
}

#[test]
fn test_update_display_pushes_frame() {
    let (engine, strip, state, _bus) = engine_with_strip();
    state.record_reading(25.0);

    engine.update_display();

    let frame = strip.last_frame();
    assert_eq!(frame[0], Rgb::new(0, 255, 0));
    assert_eq!(frame[7], Rgb::BLUE);
    assert_eq!(engine.last_frame(), frame);
}

#[test]
fn test_show_status_repaints_only_indicator() {
    let (engine, strip, state, _bus) = engine_with_strip();
    state.record_reading(25.0);
    engine.update_display();
    let before = strip.last_frame();

    engine.show_status(ChannelStatus::Sending);

    let after = strip.last_frame();
    assert_eq!(&after[..7], &before[..7]);
    assert_eq!(after[7], Rgb::YELLOW);
}

#[tokio::test]
async fn test_mode_advances_only_after_interval() {
    let (engine, _strip, state, bus) = engine_with_strip();
    let mut events = bus.subscribe();
    let start = state.last_mode_switch();

    assert_eq!(engine.advance_mode_if_due(start + Duration::from_secs(5)), None);
    assert_eq!(engine.advance_mode_if_due(start + Duration::from_secs(10)), None);

    let switched_at = start + Duration::from_secs(11);
    assert_eq!(engine.advance_mode_if_due(switched_at), Some(DisplayMode::History));
    assert_eq!(state.mode(), DisplayMode::History);
    assert_eq!(state.last_mode_switch(), switched_at);

    match events.try_recv().unwrap() {
        ProxwatchEvent::DisplayModeChanged { mode, .. } => assert_eq!(mode, DisplayMode::History),
        other => panic!("unexpected event {:?}", other),
    }

    // The interval restarts from the switch
    assert_eq!(engine.advance_mode_if_due(switched_at + Duration::from_secs(5)), None);
    assert_eq!(
        engine.advance_mode_if_due(switched_at + Duration::from_secs(11)),
        Some(DisplayMode::Directional)
    );
    assert_eq!(
        engine.advance_mode_if_due(switched_at + Duration::from_secs(22)),
        Some(DisplayMode::Normal)
    );
}

#[tokio::test]
async fn test_stop_blanks_strip() {
    let (engine, strip, state, _bus) = engine_with_strip();
    let engine = Arc::new(engine);
    state.record_reading(5.0);
    engine.update_display();

    engine.start();
    assert!(engine.is_running());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    engine.stop().await;

    assert!(started.elapsed() < ANIMATION_JOIN_TIMEOUT);
    assert!(!engine.is_running());
    assert!(strip.last_frame().iter().all(|p| *p == Rgb::OFF));
}

#[tokio::test]
async fn test_stop_without_start_still_blanks() {
    let (engine, strip, state, _bus) = engine_with_strip();
    state.record_reading(5.0);
    engine.update_display();

    engine.stop().await;

    assert!(strip.last_frame().iter().all(|p| *p == Rgb::OFF));
}

#[tokio::test(start_paused = true)]
async fn test_startup_sequence_ends_dark() {
    let (engine, strip, _state, _bus) = engine_with_strip();

    engine.startup_sequence().await;

    // One frame per swept pixel, then green, then off
    assert_eq!(strip.frames_shown(), LEDS as u64 + 2);
    assert!(strip.last_frame().iter().all(|p| *p == Rgb::OFF));
}

#[tokio::test(start_paused = true)]
async fn test_startup_sweep_accumulates_blue() {
    let (engine, strip, _state, _bus) = engine_with_strip();
    let engine = Arc::new(engine);
    let sequence = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.startup_sequence().await }
    });

    // Pixels light at 0, 100, 200 and 300 ms
    tokio::time::sleep(Duration::from_millis(350)).await;
    let frame = strip.last_frame();
    assert!(frame[..4].iter().all(|p| *p == Rgb::BLUE));
    assert!(frame[4..].iter().all(|p| *p == Rgb::OFF));

    sequence.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_alert_pattern_flashes_three_times() {
    let (engine, strip, _state, _bus) = engine_with_strip();

    engine.alert_pattern().await;

    assert_eq!(strip.frames_shown(), 6);
    assert!(strip.last_frame().iter().all(|p| *p == Rgb::OFF));
}

#[tokio::test(start_paused = true)]
async fn test_rotation_task_switches_and_flashes() {
    let (engine, strip, state, bus) = engine_with_strip();
    let engine = Arc::new(engine);
    let mut events = bus.subscribe();
    let started = Instant::now();

    engine.start();

    let at = |ms: u64| started + Duration::from_millis(ms);

    // 10 s is not strictly past the interval, so nothing happens before the 11 s check
    tokio::time::sleep_until(at(10_500)).await;
    assert_eq!(state.mode(), DisplayMode::Normal);
    assert_eq!(strip.frames_shown(), 0);

    tokio::time::sleep_until(at(11_100)).await;
    assert_eq!(state.mode(), DisplayMode::History);
    assert!(strip.last_frame().iter().all(|p| *p == Rgb::WHITE));

    tokio::time::sleep_until(at(11_300)).await;
    assert!(strip.last_frame().iter().all(|p| *p == Rgb::OFF));
    assert_eq!(strip.frames_shown(), 2);

    // Checks resume once a second after the flash: 12.4 s, 13.4 s, ... 21.4 s
    tokio::time::sleep_until(at(21_000)).await;
    assert_eq!(state.mode(), DisplayMode::History);
    assert_eq!(strip.frames_shown(), 2);

    tokio::time::sleep_until(at(21_500)).await;
    assert_eq!(state.mode(), DisplayMode::Directional);
    assert!(strip.last_frame().iter().all(|p| *p == Rgb::WHITE));

    tokio::time::sleep_until(at(21_700)).await;
    assert!(strip.last_frame().iter().all(|p| *p == Rgb::OFF));
    assert_eq!(strip.frames_shown(), 4);

    let mut modes = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ProxwatchEvent::DisplayModeChanged { mode, .. } = event {
            modes.push(mode);
        }
    }
    assert_eq!(modes, vec![DisplayMode::History, DisplayMode::Directional]);

    engine.stop().await;
    assert!(!engine.is_running());
}
