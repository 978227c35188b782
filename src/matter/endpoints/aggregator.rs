//! Aggregator endpoint: the parent under which bridged devices appear.

use crate::error::Result;
use crate::matter::data_model::{DataModel, EndpointDecl, EndpointId, EndpointKind};
use crate::matter::device_types::DEV_TYPE_AGGREGATOR;
use log::info;

pub fn create(model: &DataModel) -> Result<EndpointId> {
    let id = model.create_endpoint_with(
        EndpointDecl::new(EndpointKind::Static).with_device_type(DEV_TYPE_AGGREGATOR),
    )?;
    info!("[Tree] Aggregator created with endpoint id {}", id);
    Ok(id)
}
