//! Presence definition API operations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfplug::context::Context;

use crate::api::client::ApiClient;
use crate::api::common::{find_id_by_name, get_all_pages, EntityListing};
use crate::api::error::{ApiError, NameLookupError};

const DEFINITIONS_PATH: &str = "/api/v2/presence/definitions";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_presence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<WritableDivision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritableDivision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_uri: Option<String>,
}

#[async_trait]
pub trait PresenceDefinitionsProxy: Send + Sync {
    async fn create(
        &self,
        ctx: &Context,
        definition: &PresenceDefinition,
    ) -> Result<PresenceDefinition, ApiError>;
    async fn get_all(&self, ctx: &Context) -> Result<Vec<PresenceDefinition>, ApiError>;
    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError>;
    async fn get_by_id(&self, ctx: &Context, id: &str) -> Result<PresenceDefinition, ApiError>;
    async fn update(
        &self,
        ctx: &Context,
        id: &str,
        definition: &PresenceDefinition,
    ) -> Result<PresenceDefinition, ApiError>;
    async fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError>;
}

pub struct PresenceDefinitionsApi {
    client: Arc<ApiClient>,
}

impl PresenceDefinitionsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PresenceDefinitionsProxy for PresenceDefinitionsApi {
    async fn create(
        &self,
        _ctx: &Context,
        definition: &PresenceDefinition,
    ) -> Result<PresenceDefinition, ApiError> {
        self.client.post(DEFINITIONS_PATH, definition).await
    }

    async fn get_all(&self, _ctx: &Context) -> Result<Vec<PresenceDefinition>, ApiError> {
        let client = self.client.clone();
        get_all_pages(move || {
            let client = client.clone();
            async move {
                client
                    .get::<EntityListing<PresenceDefinition>>(DEFINITIONS_PATH)
                    .await
            }
        })
        .await
    }

    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError> {
        let definitions = self.get_all(ctx).await?;
        find_id_by_name(
            &definitions,
            name,
            |d| d.id.as_deref(),
            |d| d.name.as_deref(),
        )
    }

    async fn get_by_id(&self, _ctx: &Context, id: &str) -> Result<PresenceDefinition, ApiError> {
        self.client
            .get(&format!("{}/{}", DEFINITIONS_PATH, id))
            .await
    }

    async fn update(
        &self,
        _ctx: &Context,
        id: &str,
        definition: &PresenceDefinition,
    ) -> Result<PresenceDefinition, ApiError> {
        self.client
            .put(&format!("{}/{}", DEFINITIONS_PATH, id), definition)
            .await
    }

    async fn delete(&self, _ctx: &Context, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("{}/{}", DEFINITIONS_PATH, id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn create_wraps_division_id_in_division_object() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/presence/definitions")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"name":"On Break","systemPresence":"Away","division":{"id":"div-1"}}"#
                    .to_string(),
            ))
            .with_body(
                r#"{"id":"pd-1","name":"On Break","systemPresence":"Away","division":{"id":"div-1","name":"Home"},"deactivated":false}"#,
            )
            .create_async()
            .await;

        let definition = PresenceDefinition {
            name: Some("On Break".to_string()),
            system_presence: Some("Away".to_string()),
            division: Some(WritableDivision {
                id: Some("div-1".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let client = ApiClient::new(&server.url(), "token").unwrap();
        let proxy = PresenceDefinitionsApi::new(Arc::new(client));
        let created = assert_ok!(proxy.create(&Context::new(), &definition).await);

        assert_eq!(created.id.as_deref(), Some("pd-1"));
        assert_eq!(
            created.division.and_then(|d| d.name).as_deref(),
            Some("Home")
        );
        mock.assert_async().await;
    }
}
