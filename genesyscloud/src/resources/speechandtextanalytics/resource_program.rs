//! Speech and text analytics program resource

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

use crate::api::speechandtextanalytics::programs::{
    BaseTopicEntity, Program, ProgramsApi, ProgramsProxy,
};
use crate::exporter::{ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{
    self, api_error_diagnostic, entity_ref_type, opt_string_dynamic, set_entity_ref, set_opt_bool,
    set_opt_string, string_field, string_list, RetryAction, RetryFailure,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_speechandtextanalytics_program";

/// Hooks the program resource and its exporter into the registrar.
pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(RESOURCE_TYPE, Box::new(|| Box::new(ProgramResource::new())));
    registrar.register_exporter(
        RESOURCE_TYPE,
        ResourceExporter::new(Box::new(|ctx, client| {
            Box::pin(async move {
                let proxy = ProgramsApi::new(client);
                let programs = proxy.get_all(&ctx).await?;

                let mut resources = ResourceIdMetaMap::new();
                for program in programs {
                    let id = match program.id {
                        Some(id) => id,
                        None => continue,
                    };
                    let block_label = program.name.unwrap_or_else(|| id.clone());
                    resources.insert(id, ResourceMeta { block_label });
                }
                Ok(resources)
            })
        })),
    );
}

#[derive(Default)]
pub struct ProgramResource {
    proxy: Option<Arc<dyn ProgramsProxy>>,
}

impl ProgramResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries reads through the visibility window so a program that was just
    /// mutated is not mistaken for a missing one.
    async fn fetch_with_read_retries(
        &self,
        ctx: &Context,
        proxy: &Arc<dyn ProgramsProxy>,
        id: &str,
    ) -> Result<Program, RetryFailure> {
        let proxy = proxy.clone();
        let ctx_op = ctx.clone();
        let id = id.to_string();

        util::with_retries_for_read(ctx, move || {
            let proxy = proxy.clone();
            let ctx = ctx_op.clone();
            let id = id.clone();
            async move {
                match proxy.get_by_id(&ctx, &id).await {
                    Ok(program) => RetryAction::Done(program),
                    Err(e) if e.is_not_found() => RetryAction::Retry(api_error_diagnostic(
                        format!("Failed to read program {}", id),
                        &e,
                    )),
                    Err(e) => RetryAction::Fail(api_error_diagnostic(
                        format!("Failed to read program {}", id),
                        &e,
                    )),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for ProgramResource {
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
            .description("Manages a Genesys Cloud speech and text analytics program")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The globally unique identifier of the program")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The program name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The program description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("published", AttributeType::Bool)
                    .description("Whether the program is published")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("topics", AttributeType::List(Box::new(topic_ref_type())))
                    .description("Topics associated with the program")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
                    .description("Tags associated with the program")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("published_by", entity_ref_type())
                    .description("The user who published the program")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("date_published", AttributeType::String)
                    .description(
                        "Date the program was published, as an ISO-8601 string. \
                         For example: yyyy-MM-ddTHH:mm:ss[.mmm]Z",
                    )
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("topic_links_job", entity_ref_type())
                    .description("The job that links topics to the program after a change")
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

        let program = match build_program(&request.config) {
            Ok(program) => program,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let created = match proxy.create(&ctx, &program).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(api_error_diagnostic("Failed to create program", &e));
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
                    "Failed to create program",
                    "API response did not include a program id",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };
        tracing::info!(id = %id, "created speech and text analytics program");

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), id.clone());

        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(program) => flatten_program(&program, &mut new_state),
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
                // no id in state, nothing to refresh
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
            Ok(program) => {
                let mut new_state = request.current_state.clone();
                flatten_program(&program, &mut new_state);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
            Err(failure) if failure.timed_out() && !ctx.is_cancelled() => {
                // the API kept answering 404, so the program is gone
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
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
                    "Missing program id",
                    "Prior state does not contain a program id",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let program = match build_program(&request.config) {
            Ok(program) => program,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        if let Err(e) = proxy.update(&ctx, &id, &program).await {
            diagnostics.push(api_error_diagnostic(
                format!("Failed to update program {}", id),
                &e,
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }
        tracing::info!(id = %id, "updated speech and text analytics program");

        let mut new_state = request.planned_state;
        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(program) => flatten_program(&program, &mut new_state),
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
                // no id in state, nothing to delete
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = proxy.delete(&ctx, &id).await {
            diagnostics.push(api_error_diagnostic(
                format!("Failed to delete program {}", id),
                &e,
            ));
            return DeleteResourceResponse { diagnostics };
        }

        // deletes are asynchronous upstream, poll until the API stops
        // returning the program
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
                            format!("Error deleting program {}", id),
                            &e,
                        )),
                        Ok(_) => RetryAction::Retry(Diagnostic::error(
                            format!("Program {} still exists", id),
                            "the API still returns the program after delete",
                        )),
                    }
                }
            })
            .await
        };

        match confirm {
            Ok(()) => tracing::info!(id = %id, "deleted speech and text analytics program"),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for ProgramResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GenesysCloudProviderData>() {
                self.proxy = Some(Arc::new(ProgramsApi::new(provider_data.client.clone())));
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
impl ResourceWithImportState for ProgramResource {
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

fn topic_ref_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("id".to_string(), AttributeType::String),
        ("name".to_string(), AttributeType::String),
    ]))
}

/// Maps the configuration into the API request body.
fn build_program(config: &DynamicValue) -> Result<Program, Diagnostic> {
    let name = config
        .get_string(&AttributePath::new("name"))
        .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;

    let description = config.get_string(&AttributePath::new("description")).ok();
    let published = config.get_bool(&AttributePath::new("published")).ok();
    let topics = config
        .get_list(&AttributePath::new("topics"))
        .ok()
        .map(build_topic_refs);
    let tags = config
        .get_list(&AttributePath::new("tags"))
        .ok()
        .map(string_list);

    Ok(Program {
        name: Some(name),
        description,
        published,
        topics,
        tags,
        ..Default::default()
    })
}

fn build_topic_refs(entries: Vec<Dynamic>) -> Vec<BaseTopicEntity> {
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Dynamic::Map(fields) => Some(BaseTopicEntity {
                id: string_field(&fields, "id"),
                name: string_field(&fields, "name"),
                ..Default::default()
            }),
            _ => None,
        })
        .collect()
}

/// Writes the API model back into Terraform state.
fn flatten_program(program: &Program, state: &mut DynamicValue) {
    if let Some(id) = &program.id {
        let _ = state.set_string(&AttributePath::new("id"), id.clone());
    }
    if let Some(name) = &program.name {
        let _ = state.set_string(&AttributePath::new("name"), name.clone());
    }
    set_opt_string(state, "description", program.description.as_deref());
    set_opt_bool(state, "published", program.published);

    let topics_path = AttributePath::new("topics");
    let _ = match &program.topics {
        Some(topics) => state.set_list(&topics_path, topic_ref_values(topics)),
        None => state.set_null(&topics_path),
    };

    let tags_path = AttributePath::new("tags");
    let _ = match &program.tags {
        Some(tags) => state.set_list(
            &tags_path,
            tags.iter().cloned().map(Dynamic::String).collect(),
        ),
        None => state.set_null(&tags_path),
    };

    set_entity_ref(state, "published_by", program.published_by.as_ref());
    set_opt_string(state, "date_published", program.date_published.as_deref());
    set_entity_ref(state, "topic_links_job", program.topic_links_job.as_ref());
}

fn topic_ref_values(topics: &[BaseTopicEntity]) -> Vec<Dynamic> {
    topics
        .iter()
        .map(|topic| {
            let mut fields = HashMap::new();
            fields.insert("id".to_string(), opt_string_dynamic(topic.id.as_deref()));
            fields.insert(
                "name".to_string(),
                opt_string_dynamic(topic.name.as_deref()),
            );
            Dynamic::Map(fields)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::ApiClient;
    use crate::api::error::ApiError;
    use crate::provider_data::GenesysCloudProviderData;
    use mockito::{Matcher, Server, ServerGuard};
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::context::Context;
    use tfplug::resource::{
        ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
        ImportResourceStateRequest, ReadResourceRequest, Resource, ResourceSchemaRequest,
        ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    };
    use tfplug::types::{AttributePath, ClientCapabilities, Dynamic, DynamicValue};

    fn provider_data(server_url: &str) -> GenesysCloudProviderData {
        let client = ApiClient::new(server_url, "test-token").unwrap();
        GenesysCloudProviderData::new(client)
    }

    async fn configured_resource(server: &ServerGuard) -> ProgramResource {
        let mut resource = ProgramResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(
                        Arc::new(provider_data(&server.url())) as Arc<dyn Any + Send + Sync>
                    ),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    fn program_config() -> DynamicValue {
        let mut fields = HashMap::new();
        fields.insert(
            "name".to_string(),
            Dynamic::String("support calls".to_string()),
        );
        fields.insert(
            "description".to_string(),
            Dynamic::String("inbound support".to_string()),
        );
        DynamicValue::new(Dynamic::Map(fields))
    }

    fn state_with_id(id: &str) -> DynamicValue {
        let mut state = program_config();
        let _ = state.set_string(&AttributePath::new("id"), id.to_string());
        state
    }

    #[test]
    fn resource_type_name() {
        let resource = ProgramResource::new();
        assert_eq!(
            resource.type_name(),
            "genesyscloud_speechandtextanalytics_program"
        );
    }

    #[tokio::test]
    async fn schema_flags_match_api_contract() {
        let resource = ProgramResource::new();
        let response = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.schema.version, 1);

        let attrs = &response.schema.block.attributes;
        assert!(attrs.iter().any(|a| a.name == "id" && a.computed));
        assert!(attrs.iter().any(|a| a.name == "name" && a.required));
        assert!(attrs.iter().any(|a| a.name == "description" && a.optional));
        assert!(attrs
            .iter()
            .any(|a| a.name == "published" && a.optional && a.computed));
        assert!(attrs.iter().any(|a| a.name == "published_by" && a.computed));
        assert!(attrs
            .iter()
            .any(|a| a.name == "topic_links_job" && a.computed));
    }

    #[tokio::test]
    async fn create_without_provider_data_reports_unconfigured() {
        let resource = ProgramResource::new();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    planned_state: program_config(),
                    config: program_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn create_posts_program_and_refreshes_state() {
        let mut server = Server::new_async().await;
        let create_mock = server
            .mock("POST", "/api/v2/speechandtextanalytics/programs")
            .match_body(Matcher::PartialJsonString(
                r#"{"name":"support calls","description":"inbound support"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"prog-1","name":"support calls"}"#)
            .create_async()
            .await;
        let read_mock = server
            .mock("GET", "/api/v2/speechandtextanalytics/programs/prog-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "prog-1",
                    "name": "support calls",
                    "description": "inbound support",
                    "published": false,
                    "tags": ["alpha"],
                    "publishedBy": {"id": "u-1", "name": "admin"},
                    "datePublished": "2024-01-01T00:00:00.000Z"
                }"#,
            )
            .create_async()
            .await;

        let resource = configured_resource(&server).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    planned_state: program_config(),
                    config: program_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            "prog-1"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("description")).unwrap(),
            "inbound support"
        );
        assert!(!state.get_bool(&AttributePath::new("published")).unwrap());
        assert_eq!(
            state.get_list(&AttributePath::new("tags")).unwrap(),
            vec![Dynamic::String("alpha".to_string())]
        );
        let published_by = state.get_map(&AttributePath::new("published_by")).unwrap();
        assert_eq!(published_by["id"], Dynamic::String("u-1".to_string()));
        assert_eq!(published_by["self_uri"], Dynamic::Null);

        create_mock.assert_async().await;
        read_mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_surfaces_api_error() {
        let mut server = Server::new_async().await;
        let create_mock = server
            .mock("POST", "/api/v2/speechandtextanalytics/programs")
            .with_status(400)
            .with_body(r#"{"message": "name already in use"}"#)
            .create_async()
            .await;

        let resource = configured_resource(&server).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    planned_state: program_config(),
                    config: program_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Failed to create program");
        assert!(response.diagnostics[0].detail.contains("name already in use"));
        assert!(response
            .new_state
            .get_string(&AttributePath::new("id"))
            .is_err());
        create_mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_refreshes_fields_from_api() {
        let mut server = Server::new_async().await;
        let read_mock = server
            .mock("GET", "/api/v2/speechandtextanalytics/programs/prog-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": "prog-1", "name": "support calls", "description": "renamed upstream"}"#,
            )
            .create_async()
            .await;

        let resource = configured_resource(&server).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    current_state: state_with_id("prog-1"),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state.unwrap();
        assert_eq!(
            state.get_string(&AttributePath::new("description")).unwrap(),
            "renamed upstream"
        );
        read_mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_clears_state_when_program_never_reappears() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v2/speechandtextanalytics/programs/prog-1")
            .with_status(404)
            .with_body(r#"{"message": "not found"}"#)
            .create_async()
            .await;

        let resource = configured_resource(&server).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    current_state: state_with_id("prog-1"),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn update_puts_changes_and_rereads() {
        let mut server = Server::new_async().await;
        let update_mock = server
            .mock("PUT", "/api/v2/speechandtextanalytics/programs/prog-1")
            .match_body(Matcher::PartialJsonString(
                r#"{"name":"support calls"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "prog-1", "name": "support calls"}"#)
            .create_async()
            .await;
        let read_mock = server
            .mock("GET", "/api/v2/speechandtextanalytics/programs/prog-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": "prog-1", "name": "support calls", "description": "second draft"}"#,
            )
            .create_async()
            .await;

        let resource = configured_resource(&server).await;
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state: state_with_id("prog-1"),
                    planned_state: state_with_id("prog-1"),
                    config: program_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("description"))
                .unwrap(),
            "second draft"
        );
        update_mock.assert_async().await;
        read_mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_removes_program_and_confirms() {
        let mut server = Server::new_async().await;
        let delete_mock = server
            .mock("DELETE", "/api/v2/speechandtextanalytics/programs/prog-1")
            .with_status(204)
            .create_async()
            .await;
        let read_mock = server
            .mock("GET", "/api/v2/speechandtextanalytics/programs/prog-1")
            .with_status(404)
            .with_body(r#"{"message": "not found"}"#)
            .create_async()
            .await;

        let resource = configured_resource(&server).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state: state_with_id("prog-1"),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        delete_mock.assert_async().await;
        read_mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_reports_program_that_never_disappears() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/api/v2/speechandtextanalytics/programs/prog-1")
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/speechandtextanalytics/programs/prog-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "prog-1", "name": "support calls"}"#)
            .create_async()
            .await;

        let resource = configured_resource(&server).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state: state_with_id("prog-1"),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("still exists"));
    }

    #[tokio::test]
    async fn import_state_sets_id() {
        let resource = ProgramResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    id: "prog-9".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "prog-9"
        );
    }

    #[tokio::test]
    async fn configure_rejects_foreign_provider_data() {
        let mut resource = ProgramResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(42u32) as Arc<dyn Any + Send + Sync>),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid provider data");
    }

    #[test]
    fn build_program_requires_name() {
        let config = DynamicValue::new(Dynamic::Map(HashMap::new()));
        let diag = build_program(&config).unwrap_err();
        assert_eq!(diag.summary, "Missing name");
    }

    #[test]
    fn program_round_trips_through_state() {
        let mut topic = HashMap::new();
        topic.insert("id".to_string(), Dynamic::String("topic-1".to_string()));
        topic.insert("name".to_string(), Dynamic::String("refunds".to_string()));

        let mut fields = HashMap::new();
        fields.insert(
            "name".to_string(),
            Dynamic::String("support calls".to_string()),
        );
        fields.insert(
            "topics".to_string(),
            Dynamic::List(vec![Dynamic::Map(topic)]),
        );
        fields.insert(
            "tags".to_string(),
            Dynamic::List(vec![Dynamic::String("alpha".to_string())]),
        );
        let config = DynamicValue::new(Dynamic::Map(fields));

        let program = build_program(&config).unwrap();
        assert_eq!(program.name.as_deref(), Some("support calls"));
        let topics = program.topics.as_ref().unwrap();
        assert_eq!(topics[0].id.as_deref(), Some("topic-1"));

        let mut state = DynamicValue::empty_object();
        flatten_program(&program, &mut state);
        let flattened = state.get_list(&AttributePath::new("topics")).unwrap();
        match &flattened[0] {
            Dynamic::Map(entry) => {
                assert_eq!(entry["name"], Dynamic::String("refunds".to_string()))
            }
            other => panic!("expected object entry, got {:?}", other),
        }
        assert_eq!(
            state.get_list(&AttributePath::new("tags")).unwrap(),
            vec![Dynamic::String("alpha".to_string())]
        );
    }

    // Mock servers cannot vary a response across calls, so the exact
    // poll sequences run against a scripted proxy instead.
    struct ScriptedProgramsProxy {
        get_by_id_script: std::sync::Mutex<std::collections::VecDeque<Result<Program, u16>>>,
        get_by_id_calls: std::sync::atomic::AtomicUsize,
    }

    impl ScriptedProgramsProxy {
        fn new(script: Vec<Result<Program, u16>>) -> Self {
            Self {
                get_by_id_script: std::sync::Mutex::new(script.into_iter().collect()),
                get_by_id_calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        fn get_by_id_count(&self) -> usize {
            self.get_by_id_calls
                .load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ProgramsProxy for ScriptedProgramsProxy {
        async fn create(&self, _ctx: &Context, program: &Program) -> Result<Program, ApiError> {
            let mut created = program.clone();
            created.id = Some("prog-1".to_string());
            Ok(created)
        }

        async fn get_all(&self, _ctx: &Context) -> Result<Vec<Program>, ApiError> {
            unimplemented!("not exercised by the poll tests")
        }

        async fn get_id_by_name(
            &self,
            _ctx: &Context,
            _name: &str,
        ) -> Result<String, crate::api::error::NameLookupError> {
            unimplemented!("not exercised by the poll tests")
        }

        async fn get_by_id(&self, _ctx: &Context, _id: &str) -> Result<Program, ApiError> {
            self.get_by_id_calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            match self.get_by_id_script.lock().unwrap().pop_front() {
                Some(Ok(program)) => Ok(program),
                Some(Err(status)) => Err(ApiError::Api {
                    status,
                    message: "scripted".to_string(),
                    details: None,
                }),
                None => panic!("get_by_id called past the end of the script"),
            }
        }

        async fn update(
            &self,
            _ctx: &Context,
            _id: &str,
            _program: &Program,
        ) -> Result<Program, ApiError> {
            unimplemented!("not exercised by the poll tests")
        }

        async fn delete(&self, _ctx: &Context, _id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn visible_program() -> Program {
        Program {
            id: Some("prog-1".to_string()),
            name: Some("support calls".to_string()),
            description: Some("inbound support".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_keeps_polling_until_the_program_is_visible() {
        let proxy = Arc::new(ScriptedProgramsProxy::new(vec![
            Err(404),
            Err(404),
            Ok(visible_program()),
        ]));
        let resource = ProgramResource {
            proxy: Some(proxy.clone()),
        };

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    planned_state: program_config(),
                    config: program_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(proxy.get_by_id_count(), 3);
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "prog-1"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delete_confirms_on_the_poll_that_sees_the_404() {
        let proxy = Arc::new(ScriptedProgramsProxy::new(vec![
            Ok(visible_program()),
            Ok(visible_program()),
            Err(404),
        ]));
        let resource = ProgramResource {
            proxy: Some(proxy.clone()),
        };

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state: state_with_id("prog-1"),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(proxy.get_by_id_count(), 3);
    }
}
