//! Device type definitions for the light node and its bridged devices.
//!
//! This module defines the device types advertised by each endpoint,
//! following the Matter device library.

use super::data_model::DeviceType;

/// Matter Root Node device type
///
/// Device Type ID: 0x0016 (22 decimal)
///
/// Always on endpoint 0. Carries node-level metadata (Basic Information).
pub const DEV_TYPE_ROOT_NODE: DeviceType = DeviceType {
    id: 0x0016,
    revision: 1,
};

/// Matter Color Temperature Light device type
///
/// Device Type ID: 0x010C (268 decimal)
///
/// Required clusters:
/// - OnOff (0x0006)
/// - LevelControl (0x0008)
/// - ColorControl (0x0300)
pub const DEV_TYPE_COLOR_TEMPERATURE_LIGHT: DeviceType = DeviceType {
    id: 0x010C,
    revision: 2,
};

/// Matter Aggregator device type
///
/// Device Type ID: 0x000E (14 decimal)
///
/// Parent of all bridged device endpoints.
pub const DEV_TYPE_AGGREGATOR: DeviceType = DeviceType {
    id: 0x000E,
    revision: 1,
};

/// Matter Bridged Node device type
///
/// Device Type ID: 0x0013 (19 decimal)
///
/// Required clusters:
/// - BridgedDeviceBasicInformation (0x0039)
pub const DEV_TYPE_BRIDGED_NODE: DeviceType = DeviceType {
    id: 0x0013,
    revision: 1,
};
