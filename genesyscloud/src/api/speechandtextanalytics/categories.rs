//! Category API operations (speech and text analytics)
//!
//! Categories match interactions against a criteria tree of operands. The
//! operand model is recursive, nested conditions live in `operands`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfplug::context::Context;

use crate::api::client::ApiClient;
use crate::api::common::{find_id_by_name, get_all_pages, EntityListing};
use crate::api::error::{ApiError, NameLookupError};

const CATEGORIES_PATH: &str = "/api/v2/speechandtextanalytics/categories";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaCategory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Operand>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<Term>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_seconds_position: Option<OperandPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_words_position: Option<OperandPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infix_operator: Option<InfixOperator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operands: Option<Vec<Operand>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperandPosition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_position_value: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_position_direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending_position_value: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending_position_direction: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorPosition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_seconds_position: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_words_position: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfixOperator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_position: Option<OperatorPosition>,
}

#[async_trait]
pub trait CategoriesProxy: Send + Sync {
    async fn create(&self, ctx: &Context, category: &StaCategory) -> Result<StaCategory, ApiError>;
    async fn get_all(&self, ctx: &Context) -> Result<Vec<StaCategory>, ApiError>;
    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError>;
    async fn get_by_id(&self, ctx: &Context, id: &str) -> Result<StaCategory, ApiError>;
    async fn update(
        &self,
        ctx: &Context,
        id: &str,
        category: &StaCategory,
    ) -> Result<StaCategory, ApiError>;
    async fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError>;
}

pub struct CategoriesApi {
    client: Arc<ApiClient>,
}

impl CategoriesApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CategoriesProxy for CategoriesApi {
    async fn create(&self, _ctx: &Context, category: &StaCategory) -> Result<StaCategory, ApiError> {
        self.client.post(CATEGORIES_PATH, category).await
    }

    async fn get_all(&self, _ctx: &Context) -> Result<Vec<StaCategory>, ApiError> {
        let client = self.client.clone();
        get_all_pages(move || {
            let client = client.clone();
            async move { client.get::<EntityListing<StaCategory>>(CATEGORIES_PATH).await }
        })
        .await
    }

    async fn get_id_by_name(&self, ctx: &Context, name: &str) -> Result<String, NameLookupError> {
        let categories = self.get_all(ctx).await?;
        find_id_by_name(&categories, name, |c| c.id.as_deref(), |c| c.name.as_deref())
    }

    async fn get_by_id(&self, _ctx: &Context, id: &str) -> Result<StaCategory, ApiError> {
        self.client
            .get(&format!("{}/{}", CATEGORIES_PATH, id))
            .await
    }

    async fn update(
        &self,
        _ctx: &Context,
        id: &str,
        category: &StaCategory,
    ) -> Result<StaCategory, ApiError> {
        self.client
            .put(&format!("{}/{}", CATEGORIES_PATH, id), category)
            .await
    }

    async fn delete(&self, _ctx: &Context, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("{}/{}", CATEGORIES_PATH, id))
            .await
    }
}
