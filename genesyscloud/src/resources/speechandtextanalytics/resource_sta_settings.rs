//! Org-wide speech and text analytics settings resource
//!
//! The settings object always exists upstream, exactly once per org. Create
//! claims it under a fixed id and delete only forgets the state; the only
//! remote writes happen through update.

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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::common::AddressableEntityRef;
use crate::api::speechandtextanalytics::settings::{StaSettings, StaSettingsApi, StaSettingsProxy};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{
    self, api_error_diagnostic, entity_ref_type, set_entity_ref, set_opt_bool, string_field,
    string_list, RetryAction, RetryFailure,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_speechandtextanalytics_settings";

/// State id for the one settings object per org.
const SETTINGS_ID: &str = "speechandtextanalytics_settings";

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(RESOURCE_TYPE, Box::new(|| Box::new(StaSettingsResource::new())));
}

#[derive(Default)]
pub struct StaSettingsResource {
    proxy: Option<Arc<dyn StaSettingsProxy>>,
}

impl StaSettingsResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_with_read_retries(
        &self,
        ctx: &Context,
        proxy: &Arc<dyn StaSettingsProxy>,
    ) -> Result<StaSettings, RetryFailure> {
        let proxy = proxy.clone();
        let ctx_op = ctx.clone();

        util::with_retries_for_read(ctx, move || {
            let proxy = proxy.clone();
            let ctx = ctx_op.clone();
            async move {
                match proxy.get(&ctx).await {
                    Ok(settings) => RetryAction::Done(settings),
                    Err(e) if e.is_not_found() => RetryAction::Retry(api_error_diagnostic(
                        "Failed to read speech and text analytics settings",
                        &e,
                    )),
                    Err(e) => RetryAction::Fail(api_error_diagnostic(
                        "Failed to read speech and text analytics settings",
                        &e,
                    )),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for StaSettingsResource {
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
            .description("Manages the org's Genesys Cloud speech and text analytics settings")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The fixed identifier of the org's settings object")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("default_program", entity_ref_type())
                    .description("Setting to choose name for the default program for topic detection")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "expected_dialects",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Setting to choose expected dialects")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("text_analytics_enabled", AttributeType::Bool)
                    .description("Setting to enable/disable text analytics")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("agent_empathy_enabled", AttributeType::Bool)
                    .description("Setting to enable/disable Agent Empathy setting")
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
        tracing::info!(id = %SETTINGS_ID, "claimed speech and text analytics settings");

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
                flatten_sta_settings(&settings, &mut new_state);
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

        let settings = build_sta_settings(&request.config);
        if let Err(e) = proxy.update(&ctx, &settings).await {
            diagnostics.push(api_error_diagnostic(
                "Failed to update speech and text analytics settings",
                &e,
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }
        tracing::info!(id = %SETTINGS_ID, "updated speech and text analytics settings");

        let mut new_state = request.planned_state;
        match self.fetch_with_read_retries(&ctx, &proxy).await {
            Ok(settings) => flatten_sta_settings(&settings, &mut new_state),
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
        tracing::info!(id = %SETTINGS_ID, "released speech and text analytics settings");
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for StaSettingsResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GenesysCloudProviderData>() {
                self.proxy = Some(Arc::new(StaSettingsApi::new(provider_data.client.clone())));
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
impl ResourceWithImportState for StaSettingsResource {
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

fn build_sta_settings(config: &DynamicValue) -> StaSettings {
    let default_program = config
        .get_map(&AttributePath::new("default_program"))
        .ok()
        .and_then(|fields| string_field(&fields, "id"))
        .map(|id| AddressableEntityRef {
            id: Some(id),
            ..Default::default()
        });

    StaSettings {
        default_program,
        expected_dialects: config
            .get_list(&AttributePath::new("expected_dialects"))
            .ok()
            .map(string_list),
        text_analytics_enabled: config
            .get_bool(&AttributePath::new("text_analytics_enabled"))
            .ok(),
        agent_empathy_enabled: config
            .get_bool(&AttributePath::new("agent_empathy_enabled"))
            .ok(),
    }
}

fn flatten_sta_settings(settings: &StaSettings, state: &mut DynamicValue) {
    set_entity_ref(state, "default_program", settings.default_program.as_ref());

    let dialects_path = AttributePath::new("expected_dialects");
    let _ = match &settings.expected_dialects {
        Some(dialects) => state.set_list(
            &dialects_path,
            dialects
                .iter()
                .map(|dialect| Dynamic::String(dialect.clone()))
                .collect(),
        ),
        None => state.set_null(&dialects_path),
    };

    set_opt_bool(
        state,
        "text_analytics_enabled",
        settings.text_analytics_enabled,
    );
    set_opt_bool(
        state,
        "agent_empathy_enabled",
        settings.agent_empathy_enabled,
    );
}
