//! Charts module - Choropleth rendering and animation

mod animation;
mod frame;
mod palette;
mod renderer;

pub use animation::{frame_durations, AnimationAssembler};
pub use frame::JoinedView;
pub use palette::Palette;
pub use renderer::ChoroplethRenderer;
