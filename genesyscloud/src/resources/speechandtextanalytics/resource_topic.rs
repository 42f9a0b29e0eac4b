//! Speech and text analytics topic resource

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

use crate::api::speechandtextanalytics::topics::{
    BaseProgramEntity, Phrase, Topic, TopicsApi, TopicsProxy,
};
use crate::exporter::{ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{
    self, api_error_diagnostic, entity_ref_type, opt_string_dynamic, set_entity_ref, set_opt_bool,
    set_opt_string, string_field, string_list, RetryAction, RetryFailure,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_speechandtextanalytics_topic";

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(RESOURCE_TYPE, Box::new(|| Box::new(TopicResource::new())));
    registrar.register_exporter(
        RESOURCE_TYPE,
        ResourceExporter::new(Box::new(|ctx, client| {
            Box::pin(async move {
                let proxy = TopicsApi::new(client);
                let topics = proxy.get_all(&ctx).await?;

                let mut resources = ResourceIdMetaMap::new();
                for topic in topics {
                    let id = match topic.id {
                        Some(id) => id,
                        None => continue,
                    };
                    let block_label = topic.name.unwrap_or_else(|| id.clone());
                    resources.insert(id, ResourceMeta { block_label });
                }
                Ok(resources)
            })
        })),
    );
}

#[derive(Default)]
pub struct TopicResource {
    proxy: Option<Arc<dyn TopicsProxy>>,
}

impl TopicResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_with_read_retries(
        &self,
        ctx: &Context,
        proxy: &Arc<dyn TopicsProxy>,
        id: &str,
    ) -> Result<Topic, RetryFailure> {
        let proxy = proxy.clone();
        let ctx_op = ctx.clone();
        let id = id.to_string();

        util::with_retries_for_read(ctx, move || {
            let proxy = proxy.clone();
            let ctx = ctx_op.clone();
            let id = id.clone();
            async move {
                match proxy.get_by_id(&ctx, &id).await {
                    Ok(topic) => RetryAction::Done(topic),
                    Err(e) if e.is_not_found() => RetryAction::Retry(api_error_diagnostic(
                        format!("Failed to read topic {}", id),
                        &e,
                    )),
                    Err(e) => RetryAction::Fail(api_error_diagnostic(
                        format!("Failed to read topic {}", id),
                        &e,
                    )),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for TopicResource {
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
            .description("Manages a Genesys Cloud speech and text analytics topic")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The globally unique identifier of the topic")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The topic name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The topic description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("published", AttributeType::Bool)
                    .description("Whether the topic is published")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("strictness", AttributeType::String)
                    .description("The topic strictness, default value is 72")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("matching_type", AttributeType::String)
                    .description("The topic matching type")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "programs",
                    AttributeType::List(Box::new(program_ref_type())),
                )
                .description("Programs the topic is linked to")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
                    .description("Tags associated with the topic")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("dialect", AttributeType::String)
                    .description("The topic dialect, for example en-US")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("participants", AttributeType::String)
                    .description("The participants the topic applies to: External, Internal or All")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("phrases", AttributeType::List(Box::new(phrase_type())))
                    .description("Phrases that define the topic")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("published_by", entity_ref_type())
                    .description("The user who published the topic")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("date_published", AttributeType::String)
                    .description(
                        "Date the topic was published, as an ISO-8601 string. \
                         For example: yyyy-MM-ddTHH:mm:ss[.mmm]Z",
                    )
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

        if let Ok(participants) = request
            .config
            .get_string(&AttributePath::new("participants"))
        {
            let valid = ["External", "Internal", "All"];
            if !valid.contains(&participants.as_str()) {
                diagnostics.push(Diagnostic::error(
                    "Invalid participants",
                    format!("Participants must be one of: {:?}", valid),
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

        let topic = match build_topic(&request.config) {
            Ok(topic) => topic,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let created = match proxy.create(&ctx, &topic).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(api_error_diagnostic("Failed to create topic", &e));
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
                    "Failed to create topic",
                    "API response did not include a topic id",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };
        tracing::info!(id = %id, "created speech and text analytics topic");

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), id.clone());

        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(topic) => flatten_topic(&topic, &mut new_state),
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
            Ok(topic) => {
                let mut new_state = request.current_state.clone();
                flatten_topic(&topic, &mut new_state);
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
                    "Missing topic id",
                    "Prior state does not contain a topic id",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let topic = match build_topic(&request.config) {
            Ok(topic) => topic,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        if let Err(e) = proxy.update(&ctx, &id, &topic).await {
            diagnostics.push(api_error_diagnostic(
                format!("Failed to update topic {}", id),
                &e,
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }
        tracing::info!(id = %id, "updated speech and text analytics topic");

        let mut new_state = request.planned_state;
        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(topic) => flatten_topic(&topic, &mut new_state),
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
                format!("Failed to delete topic {}", id),
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
                            format!("Error deleting topic {}", id),
                            &e,
                        )),
                        Ok(_) => RetryAction::Retry(Diagnostic::error(
                            format!("Topic {} still exists", id),
                            "the API still returns the topic after delete",
                        )),
                    }
                }
            })
            .await
        };

        match confirm {
            Ok(()) => tracing::info!(id = %id, "deleted speech and text analytics topic"),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for TopicResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GenesysCloudProviderData>() {
                self.proxy = Some(Arc::new(TopicsApi::new(provider_data.client.clone())));
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
impl ResourceWithImportState for TopicResource {
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

fn program_ref_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("id".to_string(), AttributeType::String),
        ("name".to_string(), AttributeType::String),
    ]))
}

fn phrase_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("text".to_string(), AttributeType::String),
        ("strictness".to_string(), AttributeType::String),
        ("sentiment".to_string(), AttributeType::String),
    ]))
}

fn build_topic(config: &DynamicValue) -> Result<Topic, Diagnostic> {
    let name = config
        .get_string(&AttributePath::new("name"))
        .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

    let description = config.get_string(&AttributePath::new("description")).ok();
    let published = config.get_bool(&AttributePath::new("published")).ok();
    let strictness = config.get_string(&AttributePath::new("strictness")).ok();
    let matching_type = config.get_string(&AttributePath::new("matching_type")).ok();
    let programs = config
        .get_list(&AttributePath::new("programs"))
        .ok()
        .map(build_program_refs);
    let tags = config
        .get_list(&AttributePath::new("tags"))
        .ok()
        .map(string_list);
    let dialect = config.get_string(&AttributePath::new("dialect")).ok();
    let participants = config.get_string(&AttributePath::new("participants")).ok();
    let phrases = config
        .get_list(&AttributePath::new("phrases"))
        .ok()
        .map(build_phrases);

    Ok(Topic {
        name: Some(name),
        description,
        published,
        strictness,
        matching_type,
        programs,
        tags,
        dialect,
        participants,
        phrases,
        ..Default::default()
    })
}

fn build_program_refs(entries: Vec<Dynamic>) -> Vec<BaseProgramEntity> {
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Dynamic::Map(fields) => Some(BaseProgramEntity {
                id: string_field(&fields, "id"),
                name: string_field(&fields, "name"),
                ..Default::default()
            }),
            _ => None,
        })
        .collect()
}

fn build_phrases(entries: Vec<Dynamic>) -> Vec<Phrase> {
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Dynamic::Map(fields) => Some(Phrase {
                text: string_field(&fields, "text"),
                strictness: string_field(&fields, "strictness"),
                sentiment: string_field(&fields, "sentiment"),
            }),
            _ => None,
        })
        .collect()
}

fn flatten_topic(topic: &Topic, state: &mut DynamicValue) {
    if let Some(id) = &topic.id {
        let _ = state.set_string(&AttributePath::new("id"), id.clone());
    }
    if let Some(name) = &topic.name {
        let _ = state.set_string(&AttributePath::new("name"), name.clone());
    }
    set_opt_string(state, "description", topic.description.as_deref());
    set_opt_bool(state, "published", topic.published);
    set_opt_string(state, "strictness", topic.strictness.as_deref());
    set_opt_string(state, "matching_type", topic.matching_type.as_deref());

    let programs_path = AttributePath::new("programs");
    let _ = match &topic.programs {
        Some(programs) => state.set_list(&programs_path, program_ref_values(programs)),
        None => state.set_null(&programs_path),
    };

    let tags_path = AttributePath::new("tags");
    let _ = match &topic.tags {
        Some(tags) => state.set_list(
            &tags_path,
            tags.iter().cloned().map(Dynamic::String).collect(),
        ),
        None => state.set_null(&tags_path),
    };

    set_opt_string(state, "dialect", topic.dialect.as_deref());
    set_opt_string(state, "participants", topic.participants.as_deref());

    let phrases_path = AttributePath::new("phrases");
    let _ = match &topic.phrases {
        Some(phrases) => state.set_list(&phrases_path, phrase_values(phrases)),
        None => state.set_null(&phrases_path),
    };

    set_entity_ref(state, "published_by", topic.published_by.as_ref());
    set_opt_string(state, "date_published", topic.date_published.as_deref());
}

fn program_ref_values(programs: &[BaseProgramEntity]) -> Vec<Dynamic> {
    programs
        .iter()
        .map(|program| {
            let mut fields = HashMap::new();
            fields.insert("id".to_string(), opt_string_dynamic(program.id.as_deref()));
            fields.insert(
                "name".to_string(),
                opt_string_dynamic(program.name.as_deref()),
            );
            Dynamic::Map(fields)
        })
        .collect()
}

fn phrase_values(phrases: &[Phrase]) -> Vec<Dynamic> {
    phrases
        .iter()
        .map(|phrase| {
            let mut fields = HashMap::new();
            fields.insert("text".to_string(), opt_string_dynamic(phrase.text.as_deref()));
            fields.insert(
                "strictness".to_string(),
                opt_string_dynamic(phrase.strictness.as_deref()),
            );
            fields.insert(
                "sentiment".to_string(),
                opt_string_dynamic(phrase.sentiment.as_deref()),
            );
            Dynamic::Map(fields)
        })
        .collect()
}
