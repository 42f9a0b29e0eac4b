//! Org-wide recording settings resource
//!
//! Like the speech and text analytics settings, this is a singleton: create
//! claims the one settings object under a fixed id, delete only forgets the
//! state, and update is the only remote write.

use async_trait::async_trait;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    UpdateResourceRequest, UpdateResourceResponse, ValidateResourceConfigRequest,
    ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::recording::settings::{
    RecordingSettings, RecordingSettingsApi, RecordingSettingsProxy,
};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{
    self, api_error_diagnostic, set_opt_bool, set_opt_int, RetryAction, RetryFailure,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_recording_settings";

/// State id for the one settings object per org.
const SETTINGS_ID: &str = "recording_settings";

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(
        RESOURCE_TYPE,
        Box::new(|| Box::new(RecordingSettingsResource::new())),
    );
}

#[derive(Default)]
pub struct RecordingSettingsResource {
    proxy: Option<Arc<dyn RecordingSettingsProxy>>,
}

impl RecordingSettingsResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_with_read_retries(
        &self,
        ctx: &Context,
        proxy: &Arc<dyn RecordingSettingsProxy>,
    ) -> Result<RecordingSettings, RetryFailure> {
        let proxy = proxy.clone();
        let ctx_op = ctx.clone();

        util::with_retries_for_read(ctx, move || {
            let proxy = proxy.clone();
            let ctx = ctx_op.clone();
            async move {
                match proxy.get(&ctx).await {
                    Ok(settings) => RetryAction::Done(settings),
                    Err(e) if e.is_not_found() => RetryAction::Retry(api_error_diagnostic(
                        "Failed to read recording settings",
                        &e,
                    )),
                    Err(e) => RetryAction::Fail(api_error_diagnostic(
                        "Failed to read recording settings",
                        &e,
                    )),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for RecordingSettingsResource {
    fn type_name(&self) -> &str {
        RESOURCE_TYPE
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Manages the org's Genesys Cloud recording settings")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The fixed identifier of the org's settings object")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_simultaneous_streams", AttributeType::Number)
                    .description("Maximum number of simultaneous screen recording streams")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "max_configurable_screen_recording_streams",
                    AttributeType::Number,
                )
                .description("Upper limit that maxSimultaneousStreams can be configured")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("regional_recording_storage_enabled", AttributeType::Bool)
                    .description(
                        "Store call recordings in the region where they are intended to be \
                         recorded, otherwise in the organization's home region",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("recording_playback_url_ttl", AttributeType::Number)
                    .description(
                        "The duration in minutes for which the generated URL for recording \
                         playback remains valid.The default duration is set to 60 minutes, \
                         with a minimum allowable duration of 2 minutes and a maximum of 60 \
                         minutes.",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("recording_batch_download_url_ttl", AttributeType::Number)
                    .description(
                        "The duration in minutes for which the generated URL for recording \
                         batch download remains valid.The default duration is set to 60 \
                         minutes, with a minimum allowable duration of 2 minutes and a \
                         maximum of 60 minutes.",
                    )
                    .optional()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    /// The settings object cannot be created upstream; claim it under the
    /// fixed id without any remote call and let update apply the config.
    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), SETTINGS_ID.to_string());
        tracing::info!(id = %SETTINGS_ID, "claimed recording settings");

        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let proxy = match &self.proxy {
            Some(proxy) => proxy.clone(),
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                };
            }
        };

        match self.fetch_with_read_retries(&ctx, &proxy).await {
            Ok(settings) => {
                let mut new_state = request.current_state.clone();
                flatten_recording_settings(&settings, &mut new_state);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
            Err(failure) if failure.timed_out() && !ctx.is_cancelled() => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
                deferred: None,
            },
            Err(failure) => {
                diagnostics.push(failure.into_diagnostic());
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let proxy = match &self.proxy {
            Some(proxy) => proxy.clone(),
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let settings = build_recording_settings(&request.config);
        if let Err(e) = proxy.update(&ctx, &settings).await {
            diagnostics.push(api_error_diagnostic("Failed to update recording settings", &e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }
        tracing::info!(id = %SETTINGS_ID, "updated recording settings");

        let mut new_state = request.planned_state;
        match self.fetch_with_read_retries(&ctx, &proxy).await {
            Ok(settings) => flatten_recording_settings(&settings, &mut new_state),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        UpdateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    /// The settings object cannot be deleted upstream; dropping the resource
    /// only forgets the local state.
    async fn delete(&self, _ctx: Context, _request: DeleteResourceRequest) -> DeleteResourceResponse {
        tracing::info!(id = %SETTINGS_ID, "released recording settings");
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for RecordingSettingsResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GenesysCloudProviderData>() {
                self.proxy = Some(Arc::new(RecordingSettingsApi::new(
                    provider_data.client.clone(),
                )));
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract GenesysCloudProviderData from provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            ));
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for RecordingSettingsResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

fn build_recording_settings(config: &DynamicValue) -> RecordingSettings {
    RecordingSettings {
        max_simultaneous_streams: config
            .get_int(&AttributePath::new("max_simultaneous_streams"))
            .ok()
            .map(|value| value as i32),
        max_configurable_screen_recording_streams: config
            .get_int(&AttributePath::new("max_configurable_screen_recording_streams"))
            .ok()
            .map(|value| value as i32),
        regional_recording_storage_enabled: config
            .get_bool(&AttributePath::new("regional_recording_storage_enabled"))
            .ok(),
        recording_playback_url_ttl: config
            .get_int(&AttributePath::new("recording_playback_url_ttl"))
            .ok()
            .map(|value| value as i32),
        recording_batch_download_url_ttl: config
            .get_int(&AttributePath::new("recording_batch_download_url_ttl"))
            .ok()
            .map(|value| value as i32),
    }
}

fn flatten_recording_settings(settings: &RecordingSettings, state: &mut DynamicValue) {
    set_opt_int(
        state,
        "max_simultaneous_streams",
        settings.max_simultaneous_streams.map(i64::from),
    );
    set_opt_int(
        state,
        "max_configurable_screen_recording_streams",
        settings
            .max_configurable_screen_recording_streams
            .map(i64::from),
    );
    set_opt_bool(
        state,
        "regional_recording_storage_enabled",
        settings.regional_recording_storage_enabled,
    );
    set_opt_int(
        state,
        "recording_playback_url_ttl",
        settings.recording_playback_url_ttl.map(i64::from),
    );
    set_opt_int(
        state,
        "recording_batch_download_url_ttl",
        settings.recording_batch_download_url_ttl.map(i64::from),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::ApiClient;
    use mockito::{Matcher, Server};
    use std::any::Any;
    use std::collections::HashMap;
    use tfplug::types::Dynamic;

    async fn configured_resource(server_url: &str) -> RecordingSettingsResource {
        let client = ApiClient::new(server_url, "test-token").unwrap();
        let mut resource = RecordingSettingsResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(GenesysCloudProviderData::new(client))
                        as Arc<dyn Any + Send + Sync>),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    fn settings_config(streams: i64) -> DynamicValue {
        let mut fields = HashMap::new();
        fields.insert(
            "max_simultaneous_streams".to_string(),
            Dynamic::Number(streams as f64),
        );
        fields.insert(
            "regional_recording_storage_enabled".to_string(),
            Dynamic::Bool(false),
        );
        DynamicValue::new(Dynamic::Map(fields))
    }

    #[tokio::test]
    async fn create_assigns_fixed_id_without_remote_calls() {
        // Unconfigured on purpose, create must not need the proxy
        let resource = RecordingSettingsResource::new();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    planned_state: settings_config(10),
                    config: settings_config(10),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            SETTINGS_ID
        );
    }

    #[tokio::test]
    async fn update_issues_one_put_then_rereads() {
        let mut server = Server::new_async().await;
        let update_mock = server
            .mock("PUT", "/api/v2/recording/settings")
            .match_body(Matcher::PartialJsonString(
                r#"{"maxSimultaneousStreams":20,"regionalRecordingStorageEnabled":false}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"maxSimultaneousStreams": 20}"#)
            .create_async()
            .await;
        let read_mock = server
            .mock("GET", "/api/v2/recording/settings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"maxSimultaneousStreams": 20, "regionalRecordingStorageEnabled": false}"#,
            )
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let mut prior_state = settings_config(10);
        let _ = prior_state.set_string(&AttributePath::new("id"), SETTINGS_ID.to_string());
        let mut planned_state = settings_config(20);
        let _ = planned_state.set_string(&AttributePath::new("id"), SETTINGS_ID.to_string());

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state,
                    planned_state,
                    config: settings_config(20),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(
            state
                .get_int(&AttributePath::new("max_simultaneous_streams"))
                .unwrap(),
            20
        );
        // TTLs were not reported, applied state must resolve them to null
        assert!(state
            .get_int(&AttributePath::new("recording_playback_url_ttl"))
            .is_err());
        update_mock.assert_async().await;
        read_mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_is_local_noop() {
        // Unconfigured on purpose, delete must not need the proxy
        let resource = RecordingSettingsResource::new();
        let mut prior_state = settings_config(10);
        let _ = prior_state.set_string(&AttributePath::new("id"), SETTINGS_ID.to_string());

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }
}
