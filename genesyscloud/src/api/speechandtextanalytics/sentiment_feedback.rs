//! Sentiment feedback API operations (speech and text analytics)
//!
//! Sentiment feedback entries are immutable upstream, there is no update
//! endpoint. Changing one means delete and recreate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfplug::context::Context;

use crate::api::client::ApiClient;
use crate::api::common::{find_id_by_name, get_all_pages, EntityListing};
use crate::api::error::{ApiError, NameLookupError};

const SENTIMENT_FEEDBACK_PATH: &str = "/api/v2/speechandtextanalytics/sentimentfeedback";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Server derived, mirrors the phrase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_value: Option<String>,
}

#[async_trait]
pub trait SentimentFeedbackProxy: Send + Sync {
    async fn create(
        &self,
        ctx: &Context,
        feedback: &SentimentFeedback,
    ) -> Result<SentimentFeedback, ApiError>;
    async fn get_all(&self, ctx: &Context) -> Result<Vec<SentimentFeedback>, ApiError>;
    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError>;
    async fn get_by_id(&self, ctx: &Context, id: &str) -> Result<SentimentFeedback, ApiError>;
    async fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError>;
}

pub struct SentimentFeedbackApi {
    client: Arc<ApiClient>,
}

impl SentimentFeedbackApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SentimentFeedbackProxy for SentimentFeedbackApi {
    async fn create(
        &self,
        _ctx: &Context,
        feedback: &SentimentFeedback,
    ) -> Result<SentimentFeedback, ApiError> {
        self.client.post(SENTIMENT_FEEDBACK_PATH, feedback).await
    }

    async fn get_all(&self, _ctx: &Context) -> Result<Vec<SentimentFeedback>, ApiError> {
        let client = self.client.clone();
        get_all_pages(move || {
            let client = client.clone();
            async move {
                client
                    .get::<EntityListing<SentimentFeedback>>(SENTIMENT_FEEDBACK_PATH)
                    .await
            }
        })
        .await
    }

    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError> {
        let feedbacks = self.get_all(ctx).await?;
        find_id_by_name(&feedbacks, name, |f| f.id.as_deref(), |f| f.name.as_deref())
    }

    async fn get_by_id(&self, _ctx: &Context, id: &str) -> Result<SentimentFeedback, ApiError> {
        self.client
            .get(&format!("{}/{}", SENTIMENT_FEEDBACK_PATH, id))
            .await
    }

    async fn delete(&self, _ctx: &Context, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("{}/{}", SENTIMENT_FEEDBACK_PATH, id))
            .await
    }
}
