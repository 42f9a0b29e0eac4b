//! Program lookup by name

use async_trait::async_trait;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::speechandtextanalytics::programs::{ProgramsApi, ProgramsProxy};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;
use crate::util::{self, RetryAction};

pub const DATA_SOURCE_TYPE: &str = "genesyscloud_speechandtextanalytics_program";

pub fn register(registrar: &mut Registrar) {
    registrar.register_data_source(
        DATA_SOURCE_TYPE,
        Box::new(|| Box::new(ProgramDataSource::new())),
    );
}

#[derive(Default)]
pub struct ProgramDataSource {
    proxy: Option<Arc<dyn ProgramsProxy>>,
}

impl ProgramDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for ProgramDataSource {
    fn type_name(&self) -> &str {
        DATA_SOURCE_TYPE
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(1)
            .description(
                "Selects a Genesys Cloud speech and text analytics program by name",
            )
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
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let name = match request.config.get_string(&AttributePath::new("name")) {
            Ok(name) => name,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing name",
                    "The 'name' attribute is required",
                ));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
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
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                    deferred: None,
                };
            }
        };

        // Listings lag behind writes, so a missing name keeps polling until
        // the lookup window closes.
        let lookup = {
            let proxy = proxy.clone();
            let ctx_op = ctx.clone();
            let name_op = name.clone();
            util::with_retries(&ctx, util::DATA_SOURCE_TIMEOUT, move || {
                let proxy = proxy.clone();
                let ctx = ctx_op.clone();
                let name = name_op.clone();
                async move {
                    match proxy.get_id_by_name(&ctx, &name).await {
                        Ok(id) => RetryAction::Done(id),
                        Err(e) if e.is_retryable() => RetryAction::Retry(Diagnostic::error(
                            format!("No program found with name {}", name),
                            e.to_string(),
                        )),
                        Err(e) => RetryAction::Fail(Diagnostic::error(
                            format!("Error searching program {}", name),
                            format!("API error: {}", e),
                        )),
                    }
                }
            })
            .await
        };

        match lookup {
            Ok(id) => {
                let mut state = request.config;
                let _ = state.set_string(&AttributePath::new("id"), id);
                ReadDataSourceResponse {
                    state,
                    diagnostics,
                    deferred: None,
                }
            }
            Err(failure) => {
                diagnostics.push(failure.into_diagnostic());
                ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                    deferred: None,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ProgramDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
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
                "No provider data was provided to the data source",
            ));
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
