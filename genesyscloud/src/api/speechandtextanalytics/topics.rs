//! Topic API operations (speech and text analytics)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfplug::context::Context;

use crate::api::client::ApiClient;
use crate::api::common::{find_id_by_name, get_all_pages, AddressableEntityRef, EntityListing};
use crate::api::error::{ApiError, NameLookupError};

const TOPICS_PATH: &str = "/api/v2/speechandtextanalytics/topics";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strictness: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub programs: Option<Vec<BaseProgramEntity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phrases: Option<Vec<Phrase>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_by: Option<AddressableEntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
}

/// Program reference carried on a topic
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseProgramEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_uri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strictness: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
}

#[async_trait]
pub trait TopicsProxy: Send + Sync {
    async fn create(&self, ctx: &Context, topic: &Topic) -> Result<Topic, ApiError>;
    async fn get_all(&self, ctx: &Context) -> Result<Vec<Topic>, ApiError>;
    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError>;
    async fn get_by_id(&self, ctx: &Context, id: &str) -> Result<Topic, ApiError>;
    async fn update(&self, ctx: &Context, id: &str, topic: &Topic) -> Result<Topic, ApiError>;
    async fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError>;
}

pub struct TopicsApi {
    client: Arc<ApiClient>,
}

impl TopicsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TopicsProxy for TopicsApi {
    async fn create(&self, _ctx: &Context, topic: &Topic) -> Result<Topic, ApiError> {
        self.client.post(TOPICS_PATH, topic).await
    }

    async fn get_all(&self, _ctx: &Context) -> Result<Vec<Topic>, ApiError> {
        let client = self.client.clone();
        get_all_pages(move || {
            let client = client.clone();
            async move { client.get::<EntityListing<Topic>>(TOPICS_PATH).await }
        })
        .await
    }

    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError> {
        let topics = self.get_all(ctx).await?;
        find_id_by_name(&topics, name, |t| t.id.as_deref(), |t| t.name.as_deref())
    }

    async fn get_by_id(&self, _ctx: &Context, id: &str) -> Result<Topic, ApiError> {
        self.client.get(&format!("{}/{}", TOPICS_PATH, id)).await
    }

    async fn update(&self, _ctx: &Context, id: &str, topic: &Topic) -> Result<Topic, ApiError> {
        self.client
            .put(&format!("{}/{}", TOPICS_PATH, id), topic)
            .await
    }

    async fn delete(&self, _ctx: &Context, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("{}/{}", TOPICS_PATH, id)).await
    }
}
