//! Miner API operations (language understanding)
//!
//! A miner runs server-side over historical conversations; most of its
//! fields are progress/outcome data reported back by the mining job.
//! There is no update endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfplug::context::Context;

use crate::api::client::ApiClient;
use crate::api::common::{find_id_by_name, get_all_pages, EntityListing};
use crate::api::error::{ApiError, NameLookupError};

const MINERS_PATH: &str = "/api/v2/languageunderstanding/miners";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Miner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miner_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seeding: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversations_date_range_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversations_date_range_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_info: Option<MinerErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_info: Option<MinerErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_data_uploaded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_triggered: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_draft_version: Option<Draft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversations_fetched_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversations_valid_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub getmined_item_count: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinerErrorInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_with_params: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[async_trait]
pub trait MinersProxy: Send + Sync {
    async fn create(&self, ctx: &Context, miner: &Miner) -> Result<Miner, ApiError>;
    async fn get_all(&self, ctx: &Context) -> Result<Vec<Miner>, ApiError>;
    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError>;
    async fn get_by_id(&self, ctx: &Context, id: &str) -> Result<Miner, ApiError>;
    async fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError>;
}

pub struct MinersApi {
    client: Arc<ApiClient>,
}

impl MinersApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MinersProxy for MinersApi {
    async fn create(&self, _ctx: &Context, miner: &Miner) -> Result<Miner, ApiError> {
        self.client.post(MINERS_PATH, miner).await
    }

    async fn get_all(&self, _ctx: &Context) -> Result<Vec<Miner>, ApiError> {
        let client = self.client.clone();
        get_all_pages(move || {
            let client = client.clone();
            async move { client.get::<EntityListing<Miner>>(MINERS_PATH).await }
        })
        .await
    }

    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError> {
        let miners = self.get_all(ctx).await?;
        find_id_by_name(&miners, name, |m| m.id.as_deref(), |m| m.name.as_deref())
    }

    async fn get_by_id(&self, _ctx: &Context, id: &str) -> Result<Miner, ApiError> {
        self.client.get(&format!("{}/{}", MINERS_PATH, id)).await
    }

    async fn delete(&self, _ctx: &Context, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("{}/{}", MINERS_PATH, id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn get_by_id_parses_mining_progress_fields() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/languageunderstanding/miners/m-1")
            .with_body(
                r#"{"id":"m-1","name":"intent miner","status":"Completed",
                    "conversationsFetchedCount":120,"conversationsValidCount":118,
                    "latestDraftVersion":{"id":"d-4"},
                    "errorInfo":{"message":"partial fetch","code":"MINER_WARN"}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "token").unwrap();
        let proxy = MinersApi::new(Arc::new(client));
        let miner = assert_ok!(proxy.get_by_id(&Context::new(), "m-1").await);

        assert_eq!(miner.status.as_deref(), Some("Completed"));
        assert_eq!(miner.conversations_valid_count, Some(118));
        assert_eq!(
            miner.latest_draft_version.and_then(|d| d.id).as_deref(),
            Some("d-4")
        );
        assert_eq!(
            miner.error_info.and_then(|e| e.code).as_deref(),
            Some("MINER_WARN")
        );
    }
}
