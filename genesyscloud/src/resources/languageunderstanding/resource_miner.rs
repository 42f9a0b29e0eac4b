//! Language understanding miner resource
//!
//! A miner is a server-side mining job over historical conversations. The
//! config only seeds the job; status, counts and draft details are reported
//! back by the API as the job progresses, and nothing can be changed after
//! submission, so update never calls the API.

use async_trait::async_trait;
use std::collections::HashMap;
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

use crate::api::languageunderstanding::miners::{Miner, MinerErrorInfo, MinersApi, MinersProxy};
use crate::exporter::{ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{
    self, api_error_diagnostic, opt_string_dynamic, set_opt_bool, set_opt_int, set_opt_string,
    string_list, RetryAction, RetryFailure,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_languageunderstanding_miner";

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(RESOURCE_TYPE, Box::new(|| Box::new(MinerResource::new())));
    registrar.register_exporter(
        RESOURCE_TYPE,
        ResourceExporter::new(Box::new(|ctx, client| {
            Box::pin(async move {
                let proxy = MinersApi::new(client);
                let miners = proxy.get_all(&ctx).await?;

                let mut resources = ResourceIdMetaMap::new();
                for miner in miners {
                    let id = match miner.id {
                        Some(id) => id,
                        None => continue,
                    };
                    let block_label = miner.name.unwrap_or_else(|| id.clone());
                    resources.insert(id, ResourceMeta { block_label });
                }
                Ok(resources)
            })
        })),
    );
}

#[derive(Default)]
pub struct MinerResource {
    proxy: Option<Arc<dyn MinersProxy>>,
}

impl MinerResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_with_read_retries(
        &self,
        ctx: &Context,
        proxy: &Arc<dyn MinersProxy>,
        id: &str,
    ) -> Result<Miner, RetryFailure> {
        let proxy = proxy.clone();
        let ctx_op = ctx.clone();
        let id = id.to_string();

        util::with_retries_for_read(ctx, move || {
            let proxy = proxy.clone();
            let ctx = ctx_op.clone();
            let id = id.clone();
            async move {
                match proxy.get_by_id(&ctx, &id).await {
                    Ok(miner) => RetryAction::Done(miner),
                    Err(e) if e.is_not_found() => RetryAction::Retry(api_error_diagnostic(
                        format!("Failed to read miner {}", id),
                        &e,
                    )),
                    Err(e) => RetryAction::Fail(api_error_diagnostic(
                        format!("Failed to read miner {}", id),
                        &e,
                    )),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for MinerResource {
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
            .description("Manages a Genesys Cloud language understanding miner")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The globally unique identifier of the miner")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Chat Corpus Name.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("language", AttributeType::String)
                    .description("Language Localization code.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("miner_type", AttributeType::String)
                    .description("Type of the miner, intent or topic.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("seeding", AttributeType::Bool)
                    .description("Flag to indicate whether seeding is supported for this miner.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("Status of the miner.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("conversations_date_range_start", AttributeType::String)
                    .description(
                        "Date from which the conversations need to be taken for mining. \
                         Dates are represented as an ISO-8601 string. For example: yyyy-MM-dd",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("conversations_date_range_end", AttributeType::String)
                    .description(
                        "Date till which the conversations need to be taken for mining. \
                         Dates are represented as an ISO-8601 string. For example: yyyy-MM-dd",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("date_completed", AttributeType::String)
                    .description(
                        "Date when the mining process was completed. Date time is represented \
                         as an ISO-8601 string. For example: yyyy-MM-ddTHH:mm:ss[.mmm]Z",
                    )
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("message", AttributeType::String)
                    .description("Mining message if present.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("error_info", error_info_type())
                    .description("Error Information")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("warning_info", error_info_type())
                    .description("Warning Information")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("conversation_data_uploaded", AttributeType::Bool)
                    .description("Flag to indicate whether data file to be mined was uploaded.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("media_type", AttributeType::String)
                    .description("Media type for filtering conversations.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("participant_type", AttributeType::String)
                    .description("Type of the participant, either agent, customer or both.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "queue_ids",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("List of queue IDs for filtering conversations.")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("date_triggered", AttributeType::String)
                    .description(
                        "Date when the miner started execution. Date time is represented \
                         as an ISO-8601 string. For example: yyyy-MM-ddTHH:mm:ss[.mmm]Z",
                    )
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "latest_draft_version",
                    AttributeType::Object(HashMap::from([(
                        "id".to_string(),
                        AttributeType::String,
                    )])),
                )
                .description("Latest draft details of the miner.")
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("conversations_fetched_count", AttributeType::Number)
                    .description("Number of conversations/transcripts fetched.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("conversations_valid_count", AttributeType::Number)
                    .description(
                        "Number of conversations/recordings/transcripts that were found \
                         valid for mining purposes.",
                    )
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("getmined_item_count", AttributeType::Number)
                    .description("Number of intents or topics based on the miner type.")
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
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
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

        let miner = match build_miner(&request.config) {
            Ok(miner) => miner,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let created = match proxy.create(&ctx, &miner).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(api_error_diagnostic("Failed to create miner", &e));
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
                    "Failed to create miner",
                    "API response did not include a miner id",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };
        tracing::info!(id = %id, "created language understanding miner");

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), id.clone());

        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(miner) => flatten_miner(&miner, &mut new_state),
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
            Ok(miner) => {
                let mut new_state = request.current_state.clone();
                flatten_miner(&miner, &mut new_state);
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

    /// Mining jobs cannot be modified after submission; every attribute
    /// change plans as a replacement, so this only carries the plan through.
    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
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
                format!("Failed to delete miner {}", id),
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
                            format!("Error deleting miner {}", id),
                            &e,
                        )),
                        Ok(_) => RetryAction::Retry(Diagnostic::error(
                            format!("Miner {} still exists", id),
                            "the API still returns the miner after delete",
                        )),
                    }
                }
            })
            .await
        };

        match confirm {
            Ok(()) => tracing::info!(id = %id, "deleted language understanding miner"),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for MinerResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GenesysCloudProviderData>() {
                self.proxy = Some(Arc::new(MinersApi::new(provider_data.client.clone())));
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
impl ResourceWithImportState for MinerResource {
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

fn error_info_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("message".to_string(), AttributeType::String),
        ("code".to_string(), AttributeType::String),
        ("message_with_params".to_string(), AttributeType::String),
    ]))
}

/// Maps the configuration into the mining job request. Progress and outcome
/// fields are server-owned and never sent.
fn build_miner(config: &DynamicValue) -> Result<Miner, Diagnostic> {
    let name = config
        .get_string(&AttributePath::new("name"))
        .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

    Ok(Miner {
        name: Some(name),
        language: config.get_string(&AttributePath::new("language")).ok(),
        miner_type: config.get_string(&AttributePath::new("miner_type")).ok(),
        seeding: config.get_bool(&AttributePath::new("seeding")).ok(),
        conversations_date_range_start: config
            .get_string(&AttributePath::new("conversations_date_range_start"))
            .ok(),
        conversations_date_range_end: config
            .get_string(&AttributePath::new("conversations_date_range_end"))
            .ok(),
        media_type: config.get_string(&AttributePath::new("media_type")).ok(),
        participant_type: config
            .get_string(&AttributePath::new("participant_type"))
            .ok(),
        queue_ids: config
            .get_list(&AttributePath::new("queue_ids"))
            .ok()
            .map(string_list),
        ..Default::default()
    })
}

fn flatten_miner(miner: &Miner, state: &mut DynamicValue) {
    if let Some(id) = &miner.id {
        let _ = state.set_string(&AttributePath::new("id"), id.clone());
    }
    if let Some(name) = &miner.name {
        let _ = state.set_string(&AttributePath::new("name"), name.clone());
    }
    set_opt_string(state, "language", miner.language.as_deref());
    set_opt_string(state, "miner_type", miner.miner_type.as_deref());
    set_opt_bool(state, "seeding", miner.seeding);
    set_opt_string(state, "status", miner.status.as_deref());
    set_opt_string(
        state,
        "conversations_date_range_start",
        miner.conversations_date_range_start.as_deref(),
    );
    set_opt_string(
        state,
        "conversations_date_range_end",
        miner.conversations_date_range_end.as_deref(),
    );
    set_opt_string(state, "date_completed", miner.date_completed.as_deref());
    set_opt_string(state, "message", miner.message.as_deref());

    set_error_info(state, "error_info", miner.error_info.as_ref());
    set_error_info(state, "warning_info", miner.warning_info.as_ref());

    set_opt_bool(
        state,
        "conversation_data_uploaded",
        miner.conversation_data_uploaded,
    );
    set_opt_string(state, "media_type", miner.media_type.as_deref());
    set_opt_string(state, "participant_type", miner.participant_type.as_deref());

    let queue_ids_path = AttributePath::new("queue_ids");
    let _ = match &miner.queue_ids {
        Some(queue_ids) => state.set_list(
            &queue_ids_path,
            queue_ids
                .iter()
                .map(|queue_id| Dynamic::String(queue_id.clone()))
                .collect(),
        ),
        None => state.set_null(&queue_ids_path),
    };

    set_opt_string(state, "date_triggered", miner.date_triggered.as_deref());

    let draft_path = AttributePath::new("latest_draft_version");
    let _ = match &miner.latest_draft_version {
        Some(draft) => state.set_map(
            &draft_path,
            HashMap::from([("id".to_string(), opt_string_dynamic(draft.id.as_deref()))]),
        ),
        None => state.set_null(&draft_path),
    };

    set_opt_int(
        state,
        "conversations_fetched_count",
        miner.conversations_fetched_count.map(i64::from),
    );
    set_opt_int(
        state,
        "conversations_valid_count",
        miner.conversations_valid_count.map(i64::from),
    );
    set_opt_int(
        state,
        "getmined_item_count",
        miner.getmined_item_count.map(i64::from),
    );
}

fn set_error_info(state: &mut DynamicValue, name: &str, info: Option<&MinerErrorInfo>) {
    let path = AttributePath::new(name);
    let _ = match info {
        Some(info) => state.set_map(
            &path,
            HashMap::from([
                (
                    "message".to_string(),
                    opt_string_dynamic(info.message.as_deref()),
                ),
                ("code".to_string(), opt_string_dynamic(info.code.as_deref())),
                (
                    "message_with_params".to_string(),
                    opt_string_dynamic(info.message_with_params.as_deref()),
                ),
            ]),
        ),
        None => state.set_null(&path),
    };
}
