//! Org-wide speech and text analytics settings (singleton endpoint)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfplug::context::Context;

use crate::api::client::ApiClient;
use crate::api::common::AddressableEntityRef;
use crate::api::error::ApiError;

const SETTINGS_PATH: &str = "/api/v2/speechandtextanalytics/settings";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_program: Option<AddressableEntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_dialects: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_analytics_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_empathy_enabled: Option<bool>,
}

/// One settings object per org, so no create/delete and no id in the path
#[async_trait]
pub trait StaSettingsProxy: Send + Sync {
    async fn get(&self, ctx: &Context) -> Result<StaSettings, ApiError>;
    async fn update(&self, ctx: &Context, settings: &StaSettings) -> Result<StaSettings, ApiError>;
}

pub struct StaSettingsApi {
    client: Arc<ApiClient>,
}

impl StaSettingsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StaSettingsProxy for StaSettingsApi {
    async fn get(&self, _ctx: &Context) -> Result<StaSettings, ApiError> {
        self.client.get(SETTINGS_PATH).await
    }

    async fn update(
        &self,
        _ctx: &Context,
        settings: &StaSettings,
    ) -> Result<StaSettings, ApiError> {
        self.client.put(SETTINGS_PATH, settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn update_puts_full_settings_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/v2/speechandtextanalytics/settings")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"defaultProgram":{"id":"p-1"},"textAnalyticsEnabled":true}"#.to_string(),
            ))
            .with_body(
                r#"{"defaultProgram":{"id":"p-1","name":"Default"},"expectedDialects":["en-US"],"textAnalyticsEnabled":true,"agentEmpathyEnabled":false}"#,
            )
            .create_async()
            .await;

        let settings = StaSettings {
            default_program: Some(AddressableEntityRef {
                id: Some("p-1".to_string()),
                ..Default::default()
            }),
            text_analytics_enabled: Some(true),
            ..Default::default()
        };

        let client = ApiClient::new(&server.url(), "token").unwrap();
        let proxy = StaSettingsApi::new(Arc::new(client));
        let updated = assert_ok!(proxy.update(&Context::new(), &settings).await);

        assert_eq!(updated.expected_dialects.as_deref(), Some(&["en-US".to_string()][..]));
        assert_eq!(updated.agent_empathy_enabled, Some(false));
        mock.assert_async().await;
    }
}
