//! Bridge Light Node library.
//!
//! Attribute and event core of a Matter light that also exposes devices
//! reached over a separate radio link as bridged endpoints.

pub mod bridge;
pub mod config;
pub mod device;
pub mod error;
pub mod matter;
