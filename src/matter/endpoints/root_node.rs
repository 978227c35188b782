//! Root node template for endpoint 0.

use crate::error::Result;
use crate::matter::clusters::basic_information;
use crate::matter::data_model::{DataModel, ROOT_ENDPOINT_ID};
use crate::matter::device_types::DEV_TYPE_ROOT_NODE;

/// Populate the reserved root endpoint with node-level metadata.
pub fn configure(model: &DataModel, config: &basic_information::Config) -> Result<()> {
    model.mutate(|tree| {
        tree.add_device_type(ROOT_ENDPOINT_ID, DEV_TYPE_ROOT_NODE)?;
        tree.add_cluster(ROOT_ENDPOINT_ID, basic_information::cluster(config))
    })
}
