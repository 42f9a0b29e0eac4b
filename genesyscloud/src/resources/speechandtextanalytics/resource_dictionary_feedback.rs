//! Speech and text analytics dictionary feedback resource
//!
//! Dictionary feedback teaches the transcription engine org-specific terms.
//! The API derives the entity name from the term, so `name` is computed.

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

use crate::api::speechandtextanalytics::dictionary_feedback::{
    DictionaryFeedback, DictionaryFeedbackApi, DictionaryFeedbackExamplePhrase,
    DictionaryFeedbackProxy,
};
use crate::exporter::{ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{
    self, api_error_diagnostic, opt_string_dynamic, set_opt_number, set_opt_string, string_field,
    string_list, RetryAction, RetryFailure,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_speechandtextanalytics_dictionary_feedback";

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(
        RESOURCE_TYPE,
        Box::new(|| Box::new(DictionaryFeedbackResource::new())),
    );
    registrar.register_exporter(
        RESOURCE_TYPE,
        ResourceExporter::new(Box::new(|ctx, client| {
            Box::pin(async move {
                let proxy = DictionaryFeedbackApi::new(client);
                let feedbacks = proxy.get_all(&ctx).await?;

                let mut resources = ResourceIdMetaMap::new();
                for feedback in feedbacks {
                    let id = match feedback.id {
                        Some(id) => id,
                        None => continue,
                    };
                    let block_label = feedback.name.unwrap_or_else(|| id.clone());
                    resources.insert(id, ResourceMeta { block_label });
                }
                Ok(resources)
            })
        })),
    );
}

#[derive(Default)]
pub struct DictionaryFeedbackResource {
    proxy: Option<Arc<dyn DictionaryFeedbackProxy>>,
}

impl DictionaryFeedbackResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_with_read_retries(
        &self,
        ctx: &Context,
        proxy: &Arc<dyn DictionaryFeedbackProxy>,
        id: &str,
    ) -> Result<DictionaryFeedback, RetryFailure> {
        let proxy = proxy.clone();
        let ctx_op = ctx.clone();
        let id = id.to_string();

        util::with_retries_for_read(ctx, move || {
            let proxy = proxy.clone();
            let ctx = ctx_op.clone();
            let id = id.clone();
            async move {
                match proxy.get_by_id(&ctx, &id).await {
                    Ok(feedback) => RetryAction::Done(feedback),
                    Err(e) if e.is_not_found() => RetryAction::Retry(api_error_diagnostic(
                        format!("Failed to read dictionary feedback {}", id),
                        &e,
                    )),
                    Err(e) => RetryAction::Fail(api_error_diagnostic(
                        format!("Failed to read dictionary feedback {}", id),
                        &e,
                    )),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for DictionaryFeedbackResource {
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
            .description("Manages Genesys Cloud speech and text analytics dictionary feedback")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The globally unique identifier of the dictionary feedback")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("term", AttributeType::String)
                    .description("The dictionary term to boost in transcription")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("dialect", AttributeType::String)
                    .description("The dialect of the term, e.g. en-US")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the dictionary feedback, derived from the term")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("boost_value", AttributeType::Number)
                    .description("The confidence boost applied to the term")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source", AttributeType::String)
                    .description("The source of the dictionary feedback")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "example_phrases",
                    AttributeType::List(Box::new(example_phrase_type())),
                )
                .description("Example phrases the term appears in")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "sounds_like",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Phonetic spellings of the term")
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

        let feedback = match build_dictionary_feedback(&request.config) {
            Ok(feedback) => feedback,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let created = match proxy.create(&ctx, &feedback).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(api_error_diagnostic(
                    "Failed to create dictionary feedback",
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
                    "Failed to create dictionary feedback",
                    "API response did not include a dictionary feedback id",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };
        tracing::info!(id = %id, "created dictionary feedback");

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), id.clone());

        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(feedback) => flatten_dictionary_feedback(&feedback, &mut new_state),
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
            Ok(feedback) => {
                let mut new_state = request.current_state.clone();
                flatten_dictionary_feedback(&feedback, &mut new_state);
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
                    "Missing dictionary feedback id",
                    "Prior state does not contain a dictionary feedback id",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let feedback = match build_dictionary_feedback(&request.config) {
            Ok(feedback) => feedback,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        if let Err(e) = proxy.update(&ctx, &id, &feedback).await {
            diagnostics.push(api_error_diagnostic(
                format!("Failed to update dictionary feedback {}", id),
                &e,
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }
        tracing::info!(id = %id, "updated dictionary feedback");

        let mut new_state = request.planned_state;
        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(feedback) => flatten_dictionary_feedback(&feedback, &mut new_state),
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
                format!("Failed to delete dictionary feedback {}", id),
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
                            format!("Error deleting dictionary feedback {}", id),
                            &e,
                        )),
                        Ok(_) => RetryAction::Retry(Diagnostic::error(
                            format!("Dictionary feedback {} still exists", id),
                            "the API still returns the dictionary feedback after delete",
                        )),
                    }
                }
            })
            .await
        };

        match confirm {
            Ok(()) => tracing::info!(id = %id, "deleted dictionary feedback"),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for DictionaryFeedbackResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GenesysCloudProviderData>() {
                self.proxy = Some(Arc::new(DictionaryFeedbackApi::new(
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
impl ResourceWithImportState for DictionaryFeedbackResource {
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

fn example_phrase_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("phrase".to_string(), AttributeType::String),
        ("source".to_string(), AttributeType::String),
    ]))
}

fn build_dictionary_feedback(config: &DynamicValue) -> Result<DictionaryFeedback, Diagnostic> {
    let term = config
        .get_string(&AttributePath::new("term"))
        .map_err(|_| Diagnostic::error("Missing term", "The 'term' attribute is required"))?;
    let dialect = config
        .get_string(&AttributePath::new("dialect"))
        .map_err(|_| Diagnostic::error("Missing dialect", "The 'dialect' attribute is required"))?;

    let example_phrases = config
        .get_list(&AttributePath::new("example_phrases"))
        .ok()
        .map(build_example_phrases);
    let sounds_like = config
        .get_list(&AttributePath::new("sounds_like"))
        .ok()
        .map(string_list);

    Ok(DictionaryFeedback {
        term: Some(term),
        dialect: Some(dialect),
        boost_value: config.get_number(&AttributePath::new("boost_value")).ok(),
        source: config.get_string(&AttributePath::new("source")).ok(),
        example_phrases,
        sounds_like,
        ..Default::default()
    })
}

fn build_example_phrases(entries: Vec<Dynamic>) -> Vec<DictionaryFeedbackExamplePhrase> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            Dynamic::Map(fields) => Some(DictionaryFeedbackExamplePhrase {
                phrase: string_field(fields, "phrase"),
                source: string_field(fields, "source"),
            }),
            _ => None,
        })
        .collect()
}

fn flatten_dictionary_feedback(feedback: &DictionaryFeedback, state: &mut DynamicValue) {
    if let Some(id) = &feedback.id {
        let _ = state.set_string(&AttributePath::new("id"), id.clone());
    }
    if let Some(term) = &feedback.term {
        let _ = state.set_string(&AttributePath::new("term"), term.clone());
    }
    if let Some(dialect) = &feedback.dialect {
        let _ = state.set_string(&AttributePath::new("dialect"), dialect.clone());
    }
    set_opt_string(state, "name", feedback.name.as_deref());
    set_opt_number(state, "boost_value", feedback.boost_value);
    set_opt_string(state, "source", feedback.source.as_deref());

    let phrases_path = AttributePath::new("example_phrases");
    let _ = match &feedback.example_phrases {
        Some(phrases) => state.set_list(&phrases_path, example_phrase_values(phrases)),
        None => state.set_null(&phrases_path),
    };

    let sounds_like_path = AttributePath::new("sounds_like");
    let _ = match &feedback.sounds_like {
        Some(sounds_like) => state.set_list(
            &sounds_like_path,
            sounds_like
                .iter()
                .map(|entry| Dynamic::String(entry.clone()))
                .collect(),
        ),
        None => state.set_null(&sounds_like_path),
    };
}

fn example_phrase_values(phrases: &[DictionaryFeedbackExamplePhrase]) -> Vec<Dynamic> {
    phrases
        .iter()
        .map(|phrase| {
            Dynamic::Map(HashMap::from([
                (
                    "phrase".to_string(),
                    opt_string_dynamic(phrase.phrase.as_deref()),
                ),
                (
                    "source".to_string(),
                    opt_string_dynamic(phrase.source.as_deref()),
                ),
            ]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::ApiClient;
    use mockito::{Matcher, Server};
    use std::any::Any;

    async fn configured_resource(server_url: &str) -> DictionaryFeedbackResource {
        let client = ApiClient::new(server_url, "test-token").unwrap();
        let mut resource = DictionaryFeedbackResource::new();
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

    fn feedback_config() -> DynamicValue {
        let mut phrase = HashMap::new();
        phrase.insert(
            "phrase".to_string(),
            Dynamic::String("calling about my Genesys contract".to_string()),
        );
        phrase.insert(
            "source".to_string(),
            Dynamic::String("Manual".to_string()),
        );

        let mut fields = HashMap::new();
        fields.insert("term".to_string(), Dynamic::String("Genesys".to_string()));
        fields.insert("dialect".to_string(), Dynamic::String("en-US".to_string()));
        fields.insert("boost_value".to_string(), Dynamic::Number(2.5));
        fields.insert(
            "example_phrases".to_string(),
            Dynamic::List(vec![Dynamic::Map(phrase)]),
        );
        fields.insert(
            "sounds_like".to_string(),
            Dynamic::List(vec![
                Dynamic::String("jen-uh-sis".to_string()),
                Dynamic::String("gen-e-sys".to_string()),
            ]),
        );
        DynamicValue::new(Dynamic::Map(fields))
    }

    #[tokio::test]
    async fn create_posts_feedback_and_refreshes_state() {
        let mut server = Server::new_async().await;
        let create_mock = server
            .mock("POST", "/api/v2/speechandtextanalytics/dictionaryfeedback")
            .match_body(Matcher::PartialJsonString(
                r#"{"term":"Genesys","dialect":"en-US","boostValue":2.5,"soundsLike":["jen-uh-sis","gen-e-sys"]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "df-1", "name": "Genesys"}"#)
            .create_async()
            .await;
        let read_mock = server
            .mock("GET", "/api/v2/speechandtextanalytics/dictionaryfeedback/df-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "df-1",
                    "name": "Genesys",
                    "term": "Genesys",
                    "dialect": "en-US",
                    "boostValue": 2.5,
                    "examplePhrases": [{"phrase": "calling about my Genesys contract", "source": "Manual"}],
                    "soundsLike": ["jen-uh-sis", "gen-e-sys"]
                }"#,
            )
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    planned_state: feedback_config(),
                    config: feedback_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "df-1");
        assert_eq!(
            state.get_string(&AttributePath::new("name")).unwrap(),
            "Genesys"
        );
        assert_eq!(
            state.get_number(&AttributePath::new("boost_value")).unwrap(),
            2.5
        );
        let sounds_like = state.get_list(&AttributePath::new("sounds_like")).unwrap();
        assert_eq!(string_list(sounds_like), vec!["jen-uh-sis", "gen-e-sys"]);
        create_mock.assert_async().await;
        read_mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_nulls_fields_the_api_no_longer_returns() {
        let mut server = Server::new_async().await;
        let _read_mock = server
            .mock("GET", "/api/v2/speechandtextanalytics/dictionaryfeedback/df-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "df-1", "name": "Genesys", "term": "Genesys", "dialect": "en-US"}"#)
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let mut current_state = feedback_config();
        let _ = current_state.set_string(&AttributePath::new("id"), "df-1".to_string());

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    current_state,
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: Default::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state.unwrap();
        assert!(state.get_number(&AttributePath::new("boost_value")).is_err());
        assert!(state.get_list(&AttributePath::new("sounds_like")).is_err());
    }

    #[test]
    fn build_requires_term_and_dialect() {
        let mut fields = HashMap::new();
        fields.insert("dialect".to_string(), Dynamic::String("en-US".to_string()));
        let diag =
            build_dictionary_feedback(&DynamicValue::new(Dynamic::Map(fields))).unwrap_err();
        assert_eq!(diag.summary, "Missing term");

        let mut fields = HashMap::new();
        fields.insert("term".to_string(), Dynamic::String("Genesys".to_string()));
        let diag =
            build_dictionary_feedback(&DynamicValue::new(Dynamic::Map(fields))).unwrap_err();
        assert_eq!(diag.summary, "Missing dialect");
    }

    #[test]
    fn example_phrases_round_trip_through_state() {
        let feedback = build_dictionary_feedback(&feedback_config()).unwrap();
        let phrases = feedback.example_phrases.as_ref().unwrap();
        assert_eq!(
            phrases[0].phrase.as_deref(),
            Some("calling about my Genesys contract")
        );

        let mut state = DynamicValue::empty_object();
        flatten_dictionary_feedback(&feedback, &mut state);
        let entries = state
            .get_list(&AttributePath::new("example_phrases"))
            .unwrap();
        match &entries[0] {
            Dynamic::Map(fields) => {
                assert_eq!(
                    fields["phrase"],
                    Dynamic::String("calling about my Genesys contract".to_string())
                );
                assert_eq!(fields["source"], Dynamic::String("Manual".to_string()));
            }
            other => panic!("expected example phrase object, got {:?}", other),
        }
    }
}
