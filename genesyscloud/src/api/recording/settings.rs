//! Org-wide recording settings (singleton endpoint)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfplug::context::Context;

use crate::api::client::ApiClient;
use crate::api::error::ApiError;

const SETTINGS_PATH: &str = "/api/v2/recording/settings";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_simultaneous_streams: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_configurable_screen_recording_streams: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regional_recording_storage_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_playback_url_ttl: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_batch_download_url_ttl: Option<i32>,
}

/// One settings object per org, so no create/delete and no id in the path
#[async_trait]
pub trait RecordingSettingsProxy: Send + Sync {
    async fn get(&self, ctx: &Context) -> Result<RecordingSettings, ApiError>;
    async fn update(
        &self,
        ctx: &Context,
        settings: &RecordingSettings,
    ) -> Result<RecordingSettings, ApiError>;
}

pub struct RecordingSettingsApi {
    client: Arc<ApiClient>,
}

impl RecordingSettingsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordingSettingsProxy for RecordingSettingsApi {
    async fn get(&self, _ctx: &Context) -> Result<RecordingSettings, ApiError> {
        self.client.get(SETTINGS_PATH).await
    }

    async fn update(
        &self,
        _ctx: &Context,
        settings: &RecordingSettings,
    ) -> Result<RecordingSettings, ApiError> {
        self.client.put(SETTINGS_PATH, settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn get_and_update_share_the_settings_path() {
        let mut server = Server::new_async().await;
        let get_mock = server
            .mock("GET", "/api/v2/recording/settings")
            .with_body(r#"{"maxSimultaneousStreams":10,"regionalRecordingStorageEnabled":false}"#)
            .create_async()
            .await;
        let put_mock = server
            .mock("PUT", "/api/v2/recording/settings")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"maxSimultaneousStreams":20}"#.to_string(),
            ))
            .with_body(r#"{"maxSimultaneousStreams":20,"regionalRecordingStorageEnabled":false}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "token").unwrap();
        let proxy = RecordingSettingsApi::new(Arc::new(client));

        let current = assert_ok!(proxy.get(&Context::new()).await);
        assert_eq!(current.max_simultaneous_streams, Some(10));

        let desired = RecordingSettings {
            max_simultaneous_streams: Some(20),
            ..Default::default()
        };
        let updated = assert_ok!(proxy.update(&Context::new(), &desired).await);
        assert_eq!(updated.max_simultaneous_streams, Some(20));

        get_mock.assert_async().await;
        put_mock.assert_async().await;
    }
}
