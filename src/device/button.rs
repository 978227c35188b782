//! Physical button on the light: each press toggles the light.

use crate::error::Result;
use crate::matter::clusters::on_off;
use crate::matter::data_model::{AttrPath, AttrValue, EndpointId};
use crate::matter::dispatch::AttributeDispatcher;
use log::info;

/// Flip On/Off on `endpoint` through the dispatcher so the driver hooks run.
///
/// The read and the write happen under one mutation lock, so two presses
/// racing each other always toggle twice. Returns the new state.
pub fn toggle_on_off(dispatcher: &AttributeDispatcher, endpoint: EndpointId) -> Result<bool> {
    let model = dispatcher.model();
    let _guard = model.lock_mutations();

    let path = AttrPath::new(endpoint, on_off::ID, on_off::attributes::ON_OFF);
    let on = !model.read_attribute(path)?.as_bool().unwrap_or(false);
    dispatcher.write(path, AttrValue::Bool(on))?;
    info!("[Driver] Button toggled endpoint {} {}", endpoint, if on { "on" } else { "off" });
    Ok(on)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::LightDriver;
    use crate::error::DataModelError;
    use crate::matter::data_model::{DataModel, DriverHandle};
    use crate::matter::endpoints::color_temperature_light;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_toggle_drives_light() {
        let model = Arc::new(DataModel::with_capacity(4));
        let ep = color_temperature_light::create(
            &model,
            &color_temperature_light::Config::default(),
            Some(DriverHandle(1)),
        )
        .unwrap();
        let driver = Arc::new(LightDriver::new(DriverHandle(1), model.clone()));
        let dispatcher = AttributeDispatcher::new(model);
        dispatcher.register_hooks(ep, driver.clone());

        assert!(toggle_on_off(&dispatcher, ep).unwrap());
        assert!(driver.output().on);
        assert!(!toggle_on_off(&dispatcher, ep).unwrap());
        assert!(!driver.output().on);
    }

    #[test]
    fn test_concurrent_presses_all_count() {
        let model = Arc::new(DataModel::with_capacity(4));
        let ep = color_temperature_light::create(
            &model,
            &color_temperature_light::Config::default(),
            None,
        )
        .unwrap();
        let dispatcher = Arc::new(AttributeDispatcher::new(model.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        toggle_on_off(&dispatcher, ep).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 100 toggles from off ends off.
        assert_eq!(
            model
                .read_attribute(AttrPath::new(ep, on_off::ID, on_off::attributes::ON_OFF))
                .unwrap(),
            AttrValue::Bool(false)
        );
    }

    #[test]
    fn test_toggle_unknown_endpoint() {
        let dispatcher = AttributeDispatcher::new(Arc::new(DataModel::with_capacity(2)));
        assert!(matches!(
            toggle_on_off(&dispatcher, 9),
            Err(DataModelError::NotFound(_))
        ));
    }
}
