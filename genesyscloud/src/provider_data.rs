//! Provider data structure passed to resources and data sources

use crate::api::ApiClient;
use std::sync::Arc;

/// Shared by every resource and data source of a configured provider.
/// All of them talk through the one `ApiClient` built at configure time.
#[derive(Clone)]
pub struct GenesysCloudProviderData {
    pub client: Arc<ApiClient>,
}

impl GenesysCloudProviderData {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}
