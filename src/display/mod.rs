mod engine;
mod render;
#[cfg(test)]
mod tests;

pub use engine::{AnimationEngine, ANIMATION_JOIN_TIMEOUT, ROTATION_CHECK_INTERVAL};
pub use render::{
    proximity_intensity, render_directional, render_frame, render_history, render_normal,
    status_color,
};
