//! Speech and text analytics sentiment feedback resource
//!
//! Feedback entries are immutable upstream, so update never calls the API.

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

use crate::api::speechandtextanalytics::sentiment_feedback::{
    SentimentFeedback, SentimentFeedbackApi, SentimentFeedbackProxy,
};
use crate::exporter::{ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{self, api_error_diagnostic, set_opt_string, RetryAction, RetryFailure};

pub const RESOURCE_TYPE: &str = "genesyscloud_speechandtextanalytics_sentiment_feedback";

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(
        RESOURCE_TYPE,
        Box::new(|| Box::new(SentimentFeedbackResource::new())),
    );
    registrar.register_exporter(
        RESOURCE_TYPE,
        ResourceExporter::new(Box::new(|ctx, client| {
            Box::pin(async move {
                let proxy = SentimentFeedbackApi::new(client);
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
pub struct SentimentFeedbackResource {
    proxy: Option<Arc<dyn SentimentFeedbackProxy>>,
}

impl SentimentFeedbackResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_with_read_retries(
        &self,
        ctx: &Context,
        proxy: &Arc<dyn SentimentFeedbackProxy>,
        id: &str,
    ) -> Result<SentimentFeedback, RetryFailure> {
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
                        format!("Failed to read sentiment feedback {}", id),
                        &e,
                    )),
                    Err(e) => RetryAction::Fail(api_error_diagnostic(
                        format!("Failed to read sentiment feedback {}", id),
                        &e,
                    )),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for SentimentFeedbackResource {
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
            .description("Manages Genesys Cloud speech and text analytics sentiment feedback")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The globally unique identifier of the sentiment feedback")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("phrase", AttributeType::String)
                    .description("The phrase for which sentiment feedback is provided")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("dialect", AttributeType::String)
                    .description(
                        "The dialect for the given phrase, dialect format is \
                         {language}-{country} where language follows ISO 639-1 standard and \
                         country follows ISO 3166-1 alpha 2 standard",
                    )
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("feedback_value", AttributeType::String)
                    .description("The sentiment feedback value for the given phrase")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the sentiment feedback, mirrors the phrase")
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

        let feedback = match build_sentiment_feedback(&request.config) {
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
                    "Failed to create sentiment feedback",
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
                    "Failed to create sentiment feedback",
                    "API response did not include a sentiment feedback id",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };
        tracing::info!(id = %id, "created sentiment feedback");

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), id.clone());

        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(feedback) => flatten_sentiment_feedback(&feedback, &mut new_state),
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
                flatten_sentiment_feedback(&feedback, &mut new_state);
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

    /// Feedback entries cannot be modified upstream; every attribute change
    /// plans as a replacement, so this only carries the plan through.
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
                format!("Failed to delete sentiment feedback {}", id),
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
                            format!("Error deleting sentiment feedback {}", id),
                            &e,
                        )),
                        Ok(_) => RetryAction::Retry(Diagnostic::error(
                            format!("Sentiment feedback {} still exists", id),
                            "the API still returns the sentiment feedback after delete",
                        )),
                    }
                }
            })
            .await
        };

        match confirm {
            Ok(()) => tracing::info!(id = %id, "deleted sentiment feedback"),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for SentimentFeedbackResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GenesysCloudProviderData>() {
                self.proxy = Some(Arc::new(SentimentFeedbackApi::new(
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
impl ResourceWithImportState for SentimentFeedbackResource {
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

fn build_sentiment_feedback(config: &DynamicValue) -> Result<SentimentFeedback, Diagnostic> {
    let phrase = config
        .get_string(&AttributePath::new("phrase"))
        .map_err(|_| Diagnostic::error("Missing phrase", "The 'phrase' attribute is required"))?;
    let dialect = config
        .get_string(&AttributePath::new("dialect"))
        .map_err(|_| Diagnostic::error("Missing dialect", "The 'dialect' attribute is required"))?;
    let feedback_value = config
        .get_string(&AttributePath::new("feedback_value"))
        .map_err(|_| {
            Diagnostic::error(
                "Missing feedback_value",
                "The 'feedback_value' attribute is required",
            )
        })?;

    Ok(SentimentFeedback {
        phrase: Some(phrase),
        dialect: Some(dialect),
        feedback_value: Some(feedback_value),
        ..Default::default()
    })
}

fn flatten_sentiment_feedback(feedback: &SentimentFeedback, state: &mut DynamicValue) {
    if let Some(id) = &feedback.id {
        let _ = state.set_string(&AttributePath::new("id"), id.clone());
    }
    if let Some(phrase) = &feedback.phrase {
        let _ = state.set_string(&AttributePath::new("phrase"), phrase.clone());
    }
    if let Some(dialect) = &feedback.dialect {
        let _ = state.set_string(&AttributePath::new("dialect"), dialect.clone());
    }
    if let Some(feedback_value) = &feedback.feedback_value {
        let _ = state.set_string(&AttributePath::new("feedback_value"), feedback_value.clone());
    }
    set_opt_string(state, "name", feedback.name.as_deref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::ApiClient;
    use mockito::{Matcher, Server};
    use std::any::Any;

    async fn configured_resource(server_url: &str) -> SentimentFeedbackResource {
        let client = ApiClient::new(server_url, "test-token").unwrap();
        let mut resource = SentimentFeedbackResource::new();
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
        let mut fields = HashMap::new();
        fields.insert(
            "phrase".to_string(),
            Dynamic::String("this is terrible".to_string()),
        );
        fields.insert("dialect".to_string(), Dynamic::String("en-US".to_string()));
        fields.insert(
            "feedback_value".to_string(),
            Dynamic::String("Negative".to_string()),
        );
        DynamicValue::new(Dynamic::Map(fields))
    }

    #[tokio::test]
    async fn create_posts_feedback_and_stores_name() {
        let mut server = Server::new_async().await;
        let create_mock = server
            .mock("POST", "/api/v2/speechandtextanalytics/sentimentfeedback")
            .match_body(Matcher::PartialJsonString(
                r#"{"phrase":"this is terrible","dialect":"en-US","feedbackValue":"Negative"}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "sf-1", "name": "this is terrible"}"#)
            .create_async()
            .await;
        let read_mock = server
            .mock("GET", "/api/v2/speechandtextanalytics/sentimentfeedback/sf-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "sf-1",
                    "name": "this is terrible",
                    "phrase": "this is terrible",
                    "dialect": "en-US",
                    "feedbackValue": "Negative"
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
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "sf-1"
        );
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("name"))
                .unwrap(),
            "this is terrible"
        );
        create_mock.assert_async().await;
        read_mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_returns_planned_state_without_api_calls() {
        // Unconfigured on purpose, update must work without a proxy
        let resource = SentimentFeedbackResource::new();
        let mut prior_state = feedback_config();
        let _ = prior_state.set_string(&AttributePath::new("id"), "sf-1".to_string());

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: RESOURCE_TYPE.to_string(),
                    prior_state,
                    planned_state: feedback_config(),
                    config: feedback_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("phrase"))
                .unwrap(),
            "this is terrible"
        );
    }

    #[test]
    fn build_requires_feedback_value() {
        let mut fields = HashMap::new();
        fields.insert(
            "phrase".to_string(),
            Dynamic::String("this is terrible".to_string()),
        );
        fields.insert("dialect".to_string(), Dynamic::String("en-US".to_string()));

        let diag =
            build_sentiment_feedback(&DynamicValue::new(Dynamic::Map(fields))).unwrap_err();
        assert_eq!(diag.summary, "Missing feedback_value");
    }
}
