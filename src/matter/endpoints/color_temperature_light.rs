//! Color temperature light template.
//!
//! Identify, On/Off, Level Control and Color Control (color temperature) on
//! one static endpoint. Hue/saturation can be layered on during construction with
//! [`color_control::feature::hue_saturation::add`].

use crate::error::{DataModelError, Result};
use crate::matter::clusters::{color_control, identify, level_control, on_off};
use crate::matter::data_model::{DataModel, DriverHandle, EndpointDecl, EndpointId, EndpointKind};
use crate::matter::device_types::DEV_TYPE_COLOR_TEMPERATURE_LIGHT;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub identify: identify::Config,
    pub on_off: on_off::Config,
    pub level_control: level_control::Config,
    pub color_control: color_control::Config,
}

pub fn create(
    model: &DataModel,
    config: &Config,
    driver: Option<DriverHandle>,
) -> Result<EndpointId> {
    let mut decl =
        EndpointDecl::new(EndpointKind::Static).with_device_type(DEV_TYPE_COLOR_TEMPERATURE_LIGHT);
    decl.driver = driver;

    let id = model.mutate(|tree| {
        let id = tree.create_endpoint_with(decl)?;
        tree.add_cluster(id, identify::cluster(&config.identify))?;
        tree.add_cluster(id, on_off::cluster(&config.on_off))?;
        tree.add_cluster(id, level_control::cluster(&config.level_control))?;
        tree.add_cluster(id, color_control::cluster(&config.color_control))?;
        Ok::<_, DataModelError>(id)
    })?;
    info!("[Tree] Light created with endpoint id {}", id);
    Ok(id)
}
