//! Speech and text analytics category resource
//!
//! A category matches interactions against a criteria tree of operands. The
//! wire model is recursive; Terraform object types are not, so the declared
//! schema bounds the nesting while the converters walk any depth.

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

use crate::api::speechandtextanalytics::categories::{
    CategoriesApi, CategoriesProxy, InfixOperator, Operand, OperandPosition, OperatorPosition,
    StaCategory, Term,
};
use crate::exporter::{ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{
    self, api_error_diagnostic, opt_bool_dynamic, opt_int_dynamic, opt_string_dynamic,
    set_opt_string, string_field, RetryAction, RetryFailure,
};

pub const RESOURCE_TYPE: &str = "genesyscloud_speechandtextanalytics_category";

/// Maximum operand nesting the declared schema can express.
const OPERAND_DEPTH: u8 = 5;

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(RESOURCE_TYPE, Box::new(|| Box::new(CategoryResource::new())));
    registrar.register_exporter(
        RESOURCE_TYPE,
        ResourceExporter::new(Box::new(|ctx, client| {
            Box::pin(async move {
                let proxy = CategoriesApi::new(client);
                let categories = proxy.get_all(&ctx).await?;

                let mut resources = ResourceIdMetaMap::new();
                for category in categories {
                    let id = match category.id {
                        Some(id) => id,
                        None => continue,
                    };
                    let block_label = category.name.unwrap_or_else(|| id.clone());
                    resources.insert(id, ResourceMeta { block_label });
                }
                Ok(resources)
            })
        })),
    );
}

#[derive(Default)]
pub struct CategoryResource {
    proxy: Option<Arc<dyn CategoriesProxy>>,
}

impl CategoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_with_read_retries(
        &self,
        ctx: &Context,
        proxy: &Arc<dyn CategoriesProxy>,
        id: &str,
    ) -> Result<StaCategory, RetryFailure> {
        let proxy = proxy.clone();
        let ctx_op = ctx.clone();
        let id = id.to_string();

        util::with_retries_for_read(ctx, move || {
            let proxy = proxy.clone();
            let ctx = ctx_op.clone();
            let id = id.clone();
            async move {
                match proxy.get_by_id(&ctx, &id).await {
                    Ok(category) => RetryAction::Done(category),
                    Err(e) if e.is_not_found() => RetryAction::Retry(api_error_diagnostic(
                        format!("Failed to read category {}", id),
                        &e,
                    )),
                    Err(e) => RetryAction::Fail(api_error_diagnostic(
                        format!("Failed to read category {}", id),
                        &e,
                    )),
                }
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for CategoryResource {
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
            .description("Manages a Genesys Cloud speech and text analytics category")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The globally unique identifier of the category")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The category name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("The description of the category")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("interaction_type", AttributeType::String)
                    .description("The type of interaction the category will apply to")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("criteria", operand_type(OPERAND_DEPTH))
                    .description(
                        "A collection of conditions joined together by logical operation \
                         to provide more refined filtering of conversations",
                    )
                    .required()
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

        let category = match build_category(&request.config) {
            Ok(category) => category,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let created = match proxy.create(&ctx, &category).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(api_error_diagnostic("Failed to create category", &e));
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
                    "Failed to create category",
                    "API response did not include a category id",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };
        tracing::info!(id = %id, "created speech and text analytics category");

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), id.clone());

        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(category) => flatten_category(&category, &mut new_state),
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
            Ok(category) => {
                let mut new_state = request.current_state.clone();
                flatten_category(&category, &mut new_state);
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
                    "Missing category id",
                    "Prior state does not contain a category id",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let category = match build_category(&request.config) {
            Ok(category) => category,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        if let Err(e) = proxy.update(&ctx, &id, &category).await {
            diagnostics.push(api_error_diagnostic(
                format!("Failed to update category {}", id),
                &e,
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }
        tracing::info!(id = %id, "updated speech and text analytics category");

        let mut new_state = request.planned_state;
        match self.fetch_with_read_retries(&ctx, &proxy, &id).await {
            Ok(category) => flatten_category(&category, &mut new_state),
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
                format!("Failed to delete category {}", id),
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
                            format!("Error deleting category {}", id),
                            &e,
                        )),
                        Ok(_) => RetryAction::Retry(Diagnostic::error(
                            format!("Category {} still exists", id),
                            "the API still returns the category after delete",
                        )),
                    }
                }
            })
            .await
        };

        match confirm {
            Ok(()) => tracing::info!(id = %id, "deleted speech and text analytics category"),
            Err(failure) => diagnostics.push(failure.into_diagnostic()),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for CategoryResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GenesysCloudProviderData>() {
                self.proxy = Some(Arc::new(CategoriesApi::new(provider_data.client.clone())));
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
impl ResourceWithImportState for CategoryResource {
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

fn term_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("word".to_string(), AttributeType::String),
        ("participant_type".to_string(), AttributeType::String),
    ]))
}

fn position_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("starting_position_value".to_string(), AttributeType::Number),
        (
            "starting_position_direction".to_string(),
            AttributeType::String,
        ),
        ("ending_position_value".to_string(), AttributeType::Number),
        (
            "ending_position_direction".to_string(),
            AttributeType::String,
        ),
    ]))
}

fn infix_operator_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("operator_type".to_string(), AttributeType::String),
        (
            "operator_position".to_string(),
            AttributeType::Object(HashMap::from([
                ("voice_seconds_position".to_string(), AttributeType::Number),
                ("digital_words_position".to_string(), AttributeType::Number),
            ])),
        ),
    ]))
}

fn operand_type(depth: u8) -> AttributeType {
    let mut fields = HashMap::from([
        ("type".to_string(), AttributeType::String),
        ("occurrence".to_string(), AttributeType::Number),
        ("inverted".to_string(), AttributeType::Bool),
        ("term".to_string(), term_type()),
        ("topic_id".to_string(), AttributeType::String),
        ("voice_seconds_position".to_string(), position_type()),
        ("digital_words_position".to_string(), position_type()),
        ("infix_operator".to_string(), infix_operator_type()),
    ]);
    if depth > 0 {
        fields.insert(
            "operands".to_string(),
            AttributeType::List(Box::new(operand_type(depth - 1))),
        );
    }
    AttributeType::Object(fields)
}

fn build_category(config: &DynamicValue) -> Result<StaCategory, Diagnostic> {
    let name = config
        .get_string(&AttributePath::new("name"))
        .map_err(|_| Diagnostic::error("Missing name", "The 'name' attribute is required"))?;
    let interaction_type = config
        .get_string(&AttributePath::new("interaction_type"))
        .map_err(|_| {
            Diagnostic::error(
                "Missing interaction_type",
                "The 'interaction_type' attribute is required",
            )
        })?;
    let criteria = config.get_map(&AttributePath::new("criteria")).map_err(|_| {
        Diagnostic::error("Missing criteria", "The 'criteria' attribute is required")
    })?;

    let description = config.get_string(&AttributePath::new("description")).ok();

    Ok(StaCategory {
        name: Some(name),
        description,
        interaction_type: Some(interaction_type),
        criteria: Some(build_operand(&criteria)),
        ..Default::default()
    })
}

fn build_operand(fields: &HashMap<String, Dynamic>) -> Operand {
    Operand {
        r#type: string_field(fields, "type"),
        occurrence: int_field(fields, "occurrence"),
        inverted: bool_field(fields, "inverted"),
        term: map_field(fields, "term").map(build_term),
        topic_id: string_field(fields, "topic_id"),
        voice_seconds_position: map_field(fields, "voice_seconds_position").map(build_position),
        digital_words_position: map_field(fields, "digital_words_position").map(build_position),
        infix_operator: map_field(fields, "infix_operator").map(build_infix_operator),
        operands: list_field(fields, "operands").map(|entries| {
            entries
                .iter()
                .filter_map(|entry| match entry {
                    Dynamic::Map(nested) => Some(build_operand(nested)),
                    _ => None,
                })
                .collect()
        }),
    }
}

fn build_term(fields: &HashMap<String, Dynamic>) -> Term {
    Term {
        word: string_field(fields, "word"),
        participant_type: string_field(fields, "participant_type"),
    }
}

fn build_position(fields: &HashMap<String, Dynamic>) -> OperandPosition {
    OperandPosition {
        starting_position_value: int_field(fields, "starting_position_value"),
        starting_position_direction: string_field(fields, "starting_position_direction"),
        ending_position_value: int_field(fields, "ending_position_value"),
        ending_position_direction: string_field(fields, "ending_position_direction"),
    }
}

fn build_infix_operator(fields: &HashMap<String, Dynamic>) -> InfixOperator {
    InfixOperator {
        operator_type: string_field(fields, "operator_type"),
        operator_position: map_field(fields, "operator_position").map(|position| {
            OperatorPosition {
                voice_seconds_position: int_field(position, "voice_seconds_position"),
                digital_words_position: int_field(position, "digital_words_position"),
            }
        }),
    }
}

fn flatten_category(category: &StaCategory, state: &mut DynamicValue) {
    if let Some(id) = &category.id {
        let _ = state.set_string(&AttributePath::new("id"), id.clone());
    }
    if let Some(name) = &category.name {
        let _ = state.set_string(&AttributePath::new("name"), name.clone());
    }
    set_opt_string(state, "description", category.description.as_deref());
    if let Some(interaction_type) = &category.interaction_type {
        let _ = state.set_string(
            &AttributePath::new("interaction_type"),
            interaction_type.clone(),
        );
    }

    let criteria_path = AttributePath::new("criteria");
    let _ = match &category.criteria {
        Some(criteria) => state.set_map(&criteria_path, operand_fields(criteria)),
        None => state.set_null(&criteria_path),
    };
}

fn operand_fields(operand: &Operand) -> HashMap<String, Dynamic> {
    let mut fields = HashMap::new();
    fields.insert(
        "type".to_string(),
        opt_string_dynamic(operand.r#type.as_deref()),
    );
    fields.insert(
        "occurrence".to_string(),
        opt_int_dynamic(operand.occurrence.map(i64::from)),
    );
    fields.insert("inverted".to_string(), opt_bool_dynamic(operand.inverted));
    fields.insert(
        "term".to_string(),
        match &operand.term {
            Some(term) => Dynamic::Map(term_fields(term)),
            None => Dynamic::Null,
        },
    );
    fields.insert(
        "topic_id".to_string(),
        opt_string_dynamic(operand.topic_id.as_deref()),
    );
    fields.insert(
        "voice_seconds_position".to_string(),
        position_value(operand.voice_seconds_position.as_ref()),
    );
    fields.insert(
        "digital_words_position".to_string(),
        position_value(operand.digital_words_position.as_ref()),
    );
    fields.insert(
        "infix_operator".to_string(),
        match &operand.infix_operator {
            Some(operator) => Dynamic::Map(infix_operator_fields(operator)),
            None => Dynamic::Null,
        },
    );
    fields.insert(
        "operands".to_string(),
        match &operand.operands {
            Some(operands) => Dynamic::List(
                operands
                    .iter()
                    .map(|nested| Dynamic::Map(operand_fields(nested)))
                    .collect(),
            ),
            None => Dynamic::Null,
        },
    );
    fields
}

fn term_fields(term: &Term) -> HashMap<String, Dynamic> {
    HashMap::from([
        (
            "word".to_string(),
            opt_string_dynamic(term.word.as_deref()),
        ),
        (
            "participant_type".to_string(),
            opt_string_dynamic(term.participant_type.as_deref()),
        ),
    ])
}

fn position_value(position: Option<&OperandPosition>) -> Dynamic {
    match position {
        Some(position) => Dynamic::Map(HashMap::from([
            (
                "starting_position_value".to_string(),
                opt_int_dynamic(position.starting_position_value.map(i64::from)),
            ),
            (
                "starting_position_direction".to_string(),
                opt_string_dynamic(position.starting_position_direction.as_deref()),
            ),
            (
                "ending_position_value".to_string(),
                opt_int_dynamic(position.ending_position_value.map(i64::from)),
            ),
            (
                "ending_position_direction".to_string(),
                opt_string_dynamic(position.ending_position_direction.as_deref()),
            ),
        ])),
        None => Dynamic::Null,
    }
}

fn infix_operator_fields(operator: &InfixOperator) -> HashMap<String, Dynamic> {
    let mut fields = HashMap::new();
    fields.insert(
        "operator_type".to_string(),
        opt_string_dynamic(operator.operator_type.as_deref()),
    );
    fields.insert(
        "operator_position".to_string(),
        match &operator.operator_position {
            Some(position) => Dynamic::Map(HashMap::from([
                (
                    "voice_seconds_position".to_string(),
                    opt_int_dynamic(position.voice_seconds_position.map(i64::from)),
                ),
                (
                    "digital_words_position".to_string(),
                    opt_int_dynamic(position.digital_words_position.map(i64::from)),
                ),
            ])),
            None => Dynamic::Null,
        },
    );
    fields
}

fn int_field(fields: &HashMap<String, Dynamic>, key: &str) -> Option<i32> {
    match fields.get(key) {
        Some(Dynamic::Number(value)) => Some(*value as i32),
        _ => None,
    }
}

fn bool_field(fields: &HashMap<String, Dynamic>, key: &str) -> Option<bool> {
    match fields.get(key) {
        Some(Dynamic::Bool(value)) => Some(*value),
        _ => None,
    }
}

fn map_field<'a>(
    fields: &'a HashMap<String, Dynamic>,
    key: &str,
) -> Option<&'a HashMap<String, Dynamic>> {
    match fields.get(key) {
        Some(Dynamic::Map(value)) => Some(value),
        _ => None,
    }
}

fn list_field<'a>(fields: &'a HashMap<String, Dynamic>, key: &str) -> Option<&'a Vec<Dynamic>> {
    match fields.get(key) {
        Some(Dynamic::List(value)) => Some(value),
        _ => None,
    }
}
