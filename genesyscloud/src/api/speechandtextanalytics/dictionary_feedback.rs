//! Dictionary feedback API operations (speech and text analytics)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfplug::context::Context;

use crate::api::client::ApiClient;
use crate::api::common::{find_id_by_name, get_all_pages, EntityListing};
use crate::api::error::{ApiError, NameLookupError};

const DICTIONARY_FEEDBACK_PATH: &str = "/api/v2/speechandtextanalytics/dictionaryfeedback";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Server derived, mirrors the term
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_phrases: Option<Vec<DictionaryFeedbackExamplePhrase>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sounds_like: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryFeedbackExamplePhrase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[async_trait]
pub trait DictionaryFeedbackProxy: Send + Sync {
    async fn create(
        &self,
        ctx: &Context,
        feedback: &DictionaryFeedback,
    ) -> Result<DictionaryFeedback, ApiError>;
    async fn get_all(&self, ctx: &Context) -> Result<Vec<DictionaryFeedback>, ApiError>;
    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError>;
    async fn get_by_id(&self, ctx: &Context, id: &str) -> Result<DictionaryFeedback, ApiError>;
    async fn update(
        &self,
        ctx: &Context,
        id: &str,
        feedback: &DictionaryFeedback,
    ) -> Result<DictionaryFeedback, ApiError>;
    async fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError>;
}

pub struct DictionaryFeedbackApi {
    client: Arc<ApiClient>,
}

impl DictionaryFeedbackApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DictionaryFeedbackProxy for DictionaryFeedbackApi {
    async fn create(
        &self,
        _ctx: &Context,
        feedback: &DictionaryFeedback,
    ) -> Result<DictionaryFeedback, ApiError> {
        self.client.post(DICTIONARY_FEEDBACK_PATH, feedback).await
    }

    async fn get_all(&self, _ctx: &Context) -> Result<Vec<DictionaryFeedback>, ApiError> {
        let client = self.client.clone();
        get_all_pages(move || {
            let client = client.clone();
            async move {
                client
                    .get::<EntityListing<DictionaryFeedback>>(DICTIONARY_FEEDBACK_PATH)
                    .await
            }
        })
        .await
    }

    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError> {
        let feedbacks = self.get_all(ctx).await?;
        find_id_by_name(&feedbacks, name, |f| f.id.as_deref(), |f| f.name.as_deref())
    }

    async fn get_by_id(&self, _ctx: &Context, id: &str) -> Result<DictionaryFeedback, ApiError> {
        self.client
            .get(&format!("{}/{}", DICTIONARY_FEEDBACK_PATH, id))
            .await
    }

    async fn update(
        &self,
        _ctx: &Context,
        id: &str,
        feedback: &DictionaryFeedback,
    ) -> Result<DictionaryFeedback, ApiError> {
        self.client
            .put(&format!("{}/{}", DICTIONARY_FEEDBACK_PATH, id), feedback)
            .await
    }

    async fn delete(&self, _ctx: &Context, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("{}/{}", DICTIONARY_FEEDBACK_PATH, id))
            .await
    }
}
