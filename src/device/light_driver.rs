//! Simulated light hardware behind the color temperature light endpoint.
//!
//! Implements [`AttributeHooks`]: writes are range-checked and applied to the
//! output before they are stored, and the composite color mode is re-derived
//! from whatever was just committed. Identify requests make the output
//! blink until they are stopped or the countdown reaches zero.

use crate::error::{HookError, Result};
use crate::matter::clusters::{color_control, identify, level_control, on_off};
use crate::matter::data_model::{AttrPath, AttrValue, DataModel, DriverHandle, EndpointId};
use crate::matter::endpoints::{AttributeHooks, IdentifyRequest, UpdateContext};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the LEDs are currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightOutput {
    pub on: bool,
    pub level: u8,
    pub hue: u8,
    pub saturation: u8,
    pub mireds: u16,
    pub color_mode: u8,
    pub identifying: bool,
}

impl Default for LightOutput {
    fn default() -> Self {
        Self {
            on: false,
            level: 64,
            hue: 128,
            saturation: 254,
            mireds: 250,
            color_mode: color_control::color_mode::COLOR_TEMPERATURE,
            identifying: false,
        }
    }
}

pub struct LightDriver {
    handle: DriverHandle,
    model: Arc<DataModel>,
    output: Mutex<LightOutput>,
}

impl LightDriver {
    pub fn new(handle: DriverHandle, model: Arc<DataModel>) -> Self {
        Self {
            handle,
            model,
            output: Mutex::new(LightOutput::default()),
        }
    }

    pub fn handle(&self) -> DriverHandle {
        self.handle
    }

    pub fn output(&self) -> LightOutput {
        *self.output.lock()
    }

    /// Push the stored attribute values of `endpoint` into the hardware.
    ///
    /// Run once after construction so the output matches the tree before the
    /// first write arrives. Hue and saturation are optional.
    pub fn set_defaults(&self, endpoint: EndpointId) -> Result<()> {
        let read = |cluster, attribute| {
            self.model
                .read_attribute(AttrPath::new(endpoint, cluster, attribute))
        };

        let on = read(on_off::ID, on_off::attributes::ON_OFF)?;
        let level = read(level_control::ID, level_control::attributes::CURRENT_LEVEL)?;
        let mireds = read(
            color_control::ID,
            color_control::attributes::COLOR_TEMPERATURE_MIREDS,
        )?;
        let mode = read(color_control::ID, color_control::attributes::COLOR_MODE)?;
        let hue = read(color_control::ID, color_control::attributes::CURRENT_HUE).ok();
        let saturation = read(color_control::ID, color_control::attributes::CURRENT_SATURATION).ok();

        let mut output = self.output.lock();
        if let Some(on) = on.as_bool() {
            output.on = on;
        }
        if let Some(level) = level.as_i64() {
            output.level = level as u8;
        }
        if let Some(mireds) = mireds.as_i64() {
            output.mireds = mireds as u16;
        }
        if let Some(mode) = mode.as_i64() {
            output.color_mode = mode as u8;
        }
        if let Some(hue) = hue.and_then(|v| v.as_i64()) {
            output.hue = hue as u8;
        }
        if let Some(saturation) = saturation.and_then(|v| v.as_i64()) {
            output.saturation = saturation as u8;
        }
        info!("[Driver] Defaults applied on endpoint {}: {:?}", endpoint, *output);
        Ok(())
    }

    fn apply(&self, path: AttrPath, value: &AttrValue) -> std::result::Result<(), HookError> {
        use color_control::attributes as color;

        let mut output = self.output.lock();
        match (path.cluster, path.attribute) {
            (on_off::ID, on_off::attributes::ON_OFF) => {
                if let Some(on) = value.as_bool() {
                    output.on = on;
                    info!("[Driver] Light {}", if on { "on" } else { "off" });
                }
            }
            (level_control::ID, level_control::attributes::CURRENT_LEVEL) => {
                // Null leaves the output as it is.
                if let Some(level) = value.as_i64() {
                    let level = in_range(
                        level,
                        level_control::MIN_LEVEL.into(),
                        level_control::MAX_LEVEL.into(),
                        "level",
                    )?;
                    output.level = level as u8;
                    info!("[Driver] Brightness {}", level);
                }
            }
            (color_control::ID, color::CURRENT_HUE) => {
                if let Some(hue) = value.as_i64() {
                    output.hue = in_range(hue, 0, color_control::MAX_HUE.into(), "hue")? as u8;
                    info!("[Driver] Hue {}", output.hue);
                }
            }
            (color_control::ID, color::CURRENT_SATURATION) => {
                if let Some(saturation) = value.as_i64() {
                    output.saturation =
                        in_range(saturation, 0, color_control::MAX_SATURATION.into(), "saturation")?
                            as u8;
                    info!("[Driver] Saturation {}", output.saturation);
                }
            }
            (color_control::ID, color::COLOR_TEMPERATURE_MIREDS) => {
                if let Some(mireds) = value.as_i64() {
                    output.mireds = in_range(
                        mireds,
                        color_control::MIN_MIREDS.into(),
                        color_control::MAX_MIREDS.into(),
                        "color temperature",
                    )? as u16;
                    info!("[Driver] Color temperature {} mireds", output.mireds);
                }
            }
            (identify::ID, identify::attributes::IDENTIFY_TIME) => {
                if let Some(time) = value.as_i64() {
                    output.identifying = time > 0;
                    info!("[Driver] Identify for {} s", time);
                }
            }
            _ => debug!("[Driver] No output for {}", path),
        }
        Ok(())
    }

    /// Color mode implied by a write to `attribute`, if it implies one.
    fn color_mode_for(attribute: u32) -> Option<u8> {
        use color_control::attributes as color;

        match attribute {
            color::CURRENT_HUE | color::CURRENT_SATURATION => {
                Some(color_control::color_mode::HUE_SATURATION)
            }
            color::COLOR_TEMPERATURE_MIREDS => Some(color_control::color_mode::COLOR_TEMPERATURE),
            _ => None,
        }
    }
}

fn in_range(value: i64, min: i64, max: i64, what: &str) -> std::result::Result<i64, HookError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(HookError::new(format!(
            "{} {} out of range {}..={}",
            what, value, min, max
        )))
    }
}

impl AttributeHooks for LightDriver {
    fn pre_update(&self, ctx: &UpdateContext<'_>) -> std::result::Result<(), HookError> {
        if let Some(handle) = ctx.driver
            && handle != self.handle
        {
            debug!("[Driver] Write for foreign driver {:?} on {}", handle, ctx.path);
        }
        self.apply(ctx.path, ctx.value)
    }

    fn post_update(&self, ctx: &UpdateContext<'_>) -> std::result::Result<(), HookError> {
        if ctx.path.cluster != color_control::ID {
            return Ok(());
        }
        let Some(mode) = Self::color_mode_for(ctx.path.attribute) else {
            return Ok(());
        };

        self.output.lock().color_mode = mode;
        let stored = self
            .model
            .read_attribute(AttrPath::new(
                ctx.path.endpoint,
                color_control::ID,
                color_control::attributes::COLOR_MODE,
            ))
            .map_err(|e| HookError::new(e.to_string()))?;
        if stored == AttrValue::Enum8(mode) {
            return Ok(());
        }

        for attribute in [
            color_control::attributes::COLOR_MODE,
            color_control::attributes::ENHANCED_COLOR_MODE,
        ] {
            self.model
                .commit(
                    AttrPath::new(ctx.path.endpoint, color_control::ID, attribute),
                    AttrValue::Enum8(mode),
                )
                .map_err(|e| HookError::new(e.to_string()))?;
        }
        info!("[Driver] Color mode switched to {}", mode);
        Ok(())
    }

    fn identify(
        &self,
        endpoint: EndpointId,
        request: IdentifyRequest,
    ) -> std::result::Result<(), HookError> {
        use crate::matter::clusters::identify::effect;

        let identifying = match request {
            IdentifyRequest::Start { time } => time > 0,
            IdentifyRequest::Stop => false,
            IdentifyRequest::Effect { effect_id, .. } => match effect_id {
                effect::BLINK | effect::BREATHE | effect::OKAY | effect::CHANNEL_CHANGE => true,
                effect::FINISH_EFFECT | effect::STOP_EFFECT => false,
                other => {
                    return Err(HookError::new(format!("unsupported effect 0x{:02X}", other)));
                }
            },
        };
        self.output.lock().identifying = identifying;
        info!(
            "[Driver] Identify {} on endpoint {}",
            if identifying { "started" } else { "stopped" },
            endpoint
        );
        Ok(())
    }
}
