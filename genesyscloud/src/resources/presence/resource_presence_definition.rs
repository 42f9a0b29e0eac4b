//! Organization presence definition resource
//!
//! A presence definition names an org-specific presence and pins it to one
//! of the platform's system presences. The wire model nests the division as
//! `division: {id}` while the schema exposes a flat `division_id`.

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

use crate::api::presence::definitions::{
    PresenceDefinition, PresenceDefinitionsApi, PresenceDefinitionsProxy, WritableDivision,
};
use crate::exporter::{ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{
    self, api_error_diagnostic, set_opt_bool, set_opt_string, RetryAction, RetryFailure,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_organization_presence_definition";

/// Platform system presences a definition can map onto.
const SYSTEM_PRESENCES: [&str; 7] = [
    "Available", "Away", "Break", "Busy", "Meal", "Meeting", "Training",
];

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(
        RESOURCE_TYPE,
        Box::new(|| Box::new(PresenceDefinitionResource::new())),
    );
    registrar.register_exporter(
        RESOURCE_TYPE,
        ResourceExporter::new(Box::new(|ctx, client| {
            Box::pin(async move {
                let proxy = PresenceDefinitionsApi::new(client);
                let definitions = proxy.get_all(&ctx).await?;

                let mut resources = ResourceIdMetaMap::new();
                for definition in definitions {
                    let id = match definition.id {
                        Some(id) => id,
                        None => continue,
                    };
                    let block_label = definition.name.unwrap_or_else(|| id.clone());
                    resources.insert(id, ResourceMeta { block_label });
                }
                Ok(resources)
            })
        })),
    );
}

#[derive(Default)]
pub struct PresenceDefinitionResource {
    proxy: Option<Arc<dyn PresenceDefinitionsProxy>>,
}

impl PresenceDefinitionResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_with_read_retries(
        &self,
        ctx: &Context,
        proxy: &Arc<dyn PresenceDefinitionsProxy>,
        id: &str,
    ) -> Result<PresenceDefinition, RetryFailure> {
        let proxy = proxy.clone();
        let ctx_op = ctx.clone();
        let id = id.to_string();

        util::with_retries_for_read(ctx, move || {
            let proxy = proxy.clone();
            let ctx = ctx_op.clone();
            let id = id.clone();
            async move {
                match proxy.get_by_id(&ctx, &id).await {
                    Ok(definition) => RetryAction::Done(definition),
                    Err(e) if e.is_not_found() => RetryAction::Retry(api_error_diagnostic(
                        format!("Failed to read presence definition {}", id),
                        &e,
                    )),
                    Err(e) => RetryAction::Fail(api_error_diagnostic(
                        format!("Failed to read presence definition {}", id),
                        &e,
                    )),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for PresenceDefinitionResource {
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
            .description("Manages a Genesys Cloud organization presence definition")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The globally unique identifier of the presence definition")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the presence definition")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("system_presence", AttributeType::String)
                    .description("The system presence this definition maps onto")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("division_id", AttributeType::String)
                    .description("The division the presence definition belongs to")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("deactivated", AttributeType::Bool)
                    .description("Whether the presence definition is deactivated")
                    .optional()
                    .computed()
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
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(system_presence) = request
            .config
            .get_string(&AttributePath::new("system_presence"))
        {
            if !SYSTEM_PRESENCES.contains(&system_presence.as_str()) {
                diagnostics.push(Diagnostic::error(
                    "Invalid system_presence",
                    format!("System presence must be one of: {:?}", SYSTEM_PRESENCES),
                ));
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let proxy = match &self.proxy {
            Some(proxy) => proxy.clone(),
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let definition = match build_presence_definition(&request.config) {
            Ok(definition) => definition,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let created = match proxy.create(&ctx, &definition).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(api_error_diagnostic(
                    "Failed to create presence definition",
                    &e,
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let id = match created.id {
            Some(id) => id,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create presence definition",
                    "API response did not include a presence definition id",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };
        tracing::info!(id = %id, "created presence definition");

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), id.clone());

        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(definition) => flatten_presence_definition(&definition, &mut new_state),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let id = match request.current_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                    deferred: None,
                };
            }
        };

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

        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(definition) => {
                let mut new_state = request.current_state.clone();
                flatten_presence_definition(&definition, &mut new_state);
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

        let id = match request.prior_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing presence definition id",
                    "Prior state does not contain a presence definition id",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let definition = match build_presence_definition(&request.config) {
            Ok(definition) => definition,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        if let Err(e) = proxy.update(&ctx, &id, &definition).await {
            diagnostics.push(api_error_diagnostic(
                format!("Failed to update presence definition {}", id),
                &e,
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }
        tracing::info!(id = %id, "updated presence definition");

        let mut new_state = request.planned_state;
        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(definition) => flatten_presence_definition(&definition, &mut new_state),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        UpdateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let proxy = match &self.proxy {
            Some(proxy) => proxy.clone(),
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return DeleteResourceResponse { diagnostics };
            }
        };

        let id = match request.prior_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = proxy.delete(&ctx, &id).await {
            diagnostics.push(api_error_diagnostic(
                format!("Failed to delete presence definition {}", id),
                &e,
            ));
            return DeleteResourceResponse { diagnostics };
        }

        let confirm = {
            let proxy = proxy.clone();
            let ctx_op = ctx.clone();
            let id_op = id.clone();
            util::with_retries(&ctx, util::DELETE_TIMEOUT, move || {
                let proxy = proxy.clone();
                let ctx = ctx_op.clone();
                let id = id_op.clone();
                async move {
                    match proxy.get_by_id(&ctx, &id).await {
                        Err(e) if e.is_not_found() => RetryAction::Done(()),
                        Err(e) => RetryAction::Fail(api_error_diagnostic(
                            format!("Error deleting presence definition {}", id),
                            &e,
                        )),
                        Ok(_) => RetryAction::Retry(Diagnostic::error(
                            format!("Presence definition {} still exists", id),
                            "the API still returns the presence definition after delete",
                        )),
                    }
                }
            })
            .await
        };

        match confirm {
            Ok(()) => tracing::info!(id = %id, "deleted presence definition"),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for PresenceDefinitionResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GenesysCloudProviderData>() {
                self.proxy = Some(Arc::new(PresenceDefinitionsApi::new(
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
impl ResourceWithImportState for PresenceDefinitionResource {
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

fn build_presence_definition(config: &DynamicValue) -> Result<PresenceDefinition, Diagnostic> {
    let name = config
        .get_string(&AttributePath::new("name"))
        .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;
    let system_presence = config
        .get_string(&AttributePath::new("system_presence"))
        .map_err(|_| {
            Diagnostic::error(
                "Missing system_presence",
                "The 'system_presence' attribute is required",
            )
        })?;

    let division = config
        .get_string(&AttributePath::new("division_id"))
        .ok()
        .map(|id| WritableDivision {
            id: Some(id),
            ..Default::default()
        });

    Ok(PresenceDefinition {
        name: Some(name),
        system_presence: Some(system_presence),
        division,
        deactivated: config.get_bool(&AttributePath::new("deactivated")).ok(),
        ..Default::default()
    })
}

fn flatten_presence_definition(definition: &PresenceDefinition, state: &mut DynamicValue) {
    if let Some(id) = &definition.id {
        let _ = state.set_string(&AttributePath::new("id"), id.clone());
    }
    if let Some(name) = &definition.name {
        let _ = state.set_string(&AttributePath::new("name"), name.clone());
    }
    if let Some(system_presence) = &definition.system_presence {
        let _ = state.set_string(
            &AttributePath::new("system_presence"),
            system_presence.clone(),
        );
    }
    set_opt_string(
        state,
        "division_id",
        definition
            .division
            .as_ref()
            .and_then(|division| division.id.as_deref()),
    );
    set_opt_bool(state, "deactivated", definition.deactivated);
}
