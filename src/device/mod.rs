//! Local hardware of the light node.

pub mod button;
pub mod light_driver;

pub use button::toggle_on_off;
pub use light_driver::{LightDriver, LightOutput};
