use crate::bridge::BridgeStore;
use crate::matter::clusters::color_control::feature::hue_saturation;
use crate::matter::clusters::{basic_information, color_control, level_control, on_off};
use crate::matter::endpoints::color_temperature_light;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Load environment variables from a local `.env` file.
/// Values may contain spaces without quotes; variables already set win.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }

        if std::env::var(key).is_err() {
            // SAFETY: called first thing in main, before the tokio runtime
            // and its worker threads exist
            unsafe { std::env::set_var(key, value) };
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub light: LightConfig,
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub vendor_name: String,
    pub vendor_id: u16,
    pub product_name: String,
    pub product_id: u16,
    pub node_label: String,
    /// Including the root endpoint.
    pub max_endpoints: usize,
    /// Commissioned onto a network already; radio power save is disabled
    /// right away instead of after the first commissioning.
    pub provisioned: bool,
}

/// Startup state of the local light.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightConfig {
    pub on: bool,
    pub level: u8,
    pub hue: u8,
    pub saturation: u8,
    pub mireds: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let info = basic_information::Config::default();
        Self {
            node: NodeConfig {
                vendor_name: info.vendor_name,
                vendor_id: info.vendor_id,
                product_name: info.product_name,
                product_id: info.product_id,
                node_label: info.node_label,
                max_endpoints: 16,
                provisioned: false,
            },
            light: LightConfig {
                on: true,
                level: 64,
                hue: 128,
                saturation: 254,
                mireds: 250,
            },
            bridge: BridgeConfig {
                store_path: BridgeStore::default_path(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(label) = var("NODE_LABEL") {
            config.node.node_label = label;
        }
        if let Some(max) = var("MAX_ENDPOINTS")
            && let Ok(m) = max.parse()
        {
            config.node.max_endpoints = m;
        }
        if let Some(provisioned) = var("NODE_PROVISIONED")
            && let Ok(p) = provisioned.parse()
        {
            config.node.provisioned = p;
        }

        // Light defaults
        if let Some(on) = var("LIGHT_DEFAULT_ON")
            && let Ok(o) = on.parse()
        {
            config.light.on = o;
        }
        if let Some(level) = var("LIGHT_DEFAULT_LEVEL")
            && let Ok(l) = level.parse()
        {
            config.light.level = l;
        }
        if let Some(hue) = var("LIGHT_DEFAULT_HUE")
            && let Ok(h) = hue.parse()
        {
            config.light.hue = h;
        }
        if let Some(saturation) = var("LIGHT_DEFAULT_SATURATION")
            && let Ok(s) = saturation.parse()
        {
            config.light.saturation = s;
        }
        if let Some(mireds) = var("LIGHT_DEFAULT_MIREDS")
            && let Ok(m) = mireds.parse()
        {
            config.light.mireds = m;
        }

        if let Some(path) = var("BRIDGE_STORE_PATH") {
            config.bridge.store_path = PathBuf::from(path);
        }

        config
    }

    pub fn basic_information(&self) -> basic_information::Config {
        basic_information::Config {
            vendor_name: self.node.vendor_name.clone(),
            vendor_id: self.node.vendor_id,
            product_name: self.node.product_name.clone(),
            product_id: self.node.product_id,
            node_label: self.node.node_label.clone(),
        }
    }

    /// Cluster settings for the local light endpoint.
    pub fn light_endpoint(&self) -> color_temperature_light::Config {
        color_temperature_light::Config {
            identify: Default::default(),
            on_off: on_off::Config {
                on_off: self.light.on,
                ..Default::default()
            },
            level_control: level_control::Config {
                current_level: self.light.level,
                on_level: None,
                start_up_current_level: Some(self.light.level),
            },
            color_control: color_control::Config {
                color_temperature_mireds: self.light.mireds,
                ..Default::default()
            },
        }
    }

    pub fn hue_saturation(&self) -> hue_saturation::Config {
        hue_saturation::Config {
            current_hue: self.light.hue,
            current_saturation: self.light.saturation,
        }
    }
}
