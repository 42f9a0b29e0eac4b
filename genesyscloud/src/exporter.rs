//! Export support: enumerating existing cloud objects per resource type

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;

use crate::api::{ApiClient, ApiError};

/// Metadata for one exported object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMeta {
    /// Terraform block label the exported instance is written under
    pub block_label: String,
}

/// Entity id to export metadata for every object of one resource type
pub type ResourceIdMetaMap = HashMap<String, ResourceMeta>;

/// Lists every existing object of one resource type
pub type GetAllResourcesFn = Box<
    dyn Fn(Context, Arc<ApiClient>) -> BoxFuture<'static, Result<ResourceIdMetaMap, ApiError>>
        + Send
        + Sync,
>;

/// Export definition registered alongside a resource. Export tooling calls
/// `get_resources` to enumerate what already exists in the org.
pub struct ResourceExporter {
    pub get_resources: GetAllResourcesFn,
}

impl ResourceExporter {
    pub fn new(get_resources: GetAllResourcesFn) -> Self {
        Self { get_resources }
    }
}
