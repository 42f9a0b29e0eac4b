//! Terraform provider for Genesys Cloud
//!
//! The provider owns one `ApiClient` built at configure time; every
//! resource and data source receives it through provider data and talks
//! to the platform API through an entity proxy.

pub mod api;
pub mod data_sources;
pub mod exporter;
pub mod provider_data;
pub mod registrar;
pub mod resources;
pub mod util;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic};

use crate::api::ApiClient;
use crate::exporter::ResourceExporter;
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::Registrar;

const DEFAULT_ENVIRONMENT: &str = "mypurecloud.com";

#[derive(Default)]
pub struct GenesysCloudProvider;

impl GenesysCloudProvider {
    pub fn new() -> Self {
        Self
    }

    /// Exporter registry for export tooling. Not part of the provider
    /// protocol, so it lives outside the `Provider` impl.
    pub fn exporters(&self) -> HashMap<String, ResourceExporter> {
        let mut registrar = Registrar::new();
        registrar::register_all(&mut registrar);
        registrar.into_exporters()
    }
}

#[async_trait]
impl Provider for GenesysCloudProvider {
    fn type_name(&self) -> &str {
        "genesyscloud"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Interact with the Genesys Cloud platform API")
            .attribute(
                AttributeBuilder::new("environment", AttributeType::String)
                    .description(
                        "The Genesys Cloud region domain, e.g. mypurecloud.com or \
                         mypurecloud.ie. Defaults to mypurecloud.com. Can also be set \
                         via the GENESYSCLOUD_ENVIRONMENT environment variable",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_url", AttributeType::String)
                    .description(
                        "Overrides the API base URL derived from the environment. \
                         Intended for testing against a local server",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("access_token", AttributeType::String)
                    .description(
                        "An OAuth bearer token for the Genesys Cloud platform API. \
                         Can also be set via the GENESYSCLOUD_ACCESS_TOKEN environment \
                         variable",
                    )
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut diagnostics = vec![];

        let access_token = request
            .config
            .get_string(&AttributePath::new("access_token"))
            .ok()
            .or_else(|| std::env::var("GENESYSCLOUD_ACCESS_TOKEN").ok());

        let access_token = match access_token {
            Some(token) => token,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Missing access token",
                    "Set 'access_token' in the provider configuration or the \
                     GENESYSCLOUD_ACCESS_TOKEN environment variable",
                ));
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };

        let environment = request
            .config
            .get_string(&AttributePath::new("environment"))
            .ok()
            .or_else(|| std::env::var("GENESYSCLOUD_ENVIRONMENT").ok())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let base_url = match request.config.get_string(&AttributePath::new("api_url")).ok() {
            Some(api_url) => match url::Url::parse(&api_url) {
                Ok(_) => api_url,
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Invalid api_url",
                        format!("'{}' is not a valid URL: {}", api_url, e),
                    ));
                    return ConfigureProviderResponse {
                        diagnostics,
                        provider_data: None,
                    };
                }
            },
            None => format!("https://api.{}", environment),
        };

        match ApiClient::new(&base_url, &access_token) {
            Ok(client) => {
                tracing::debug!(base_url = %base_url, "configured Genesys Cloud API client");
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(GenesysCloudProviderData::new(client))),
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                ));
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut registrar = Registrar::new();
        registrar::register_all(&mut registrar);
        registrar.into_resources()
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut registrar = Registrar::new();
        registrar::register_all(&mut registrar);
        registrar.into_data_sources()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::{ClientCapabilities, Dynamic, DynamicValue};

    fn provider_config(pairs: &[(&str, &str)]) -> DynamicValue {
        let mut fields = HashMap::new();
        for (key, value) in pairs {
            fields.insert(key.to_string(), Dynamic::String(value.to_string()));
        }
        DynamicValue::new(Dynamic::Map(fields))
    }

    fn configure_request(config: DynamicValue) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    fn provider_data_from(
        response: ConfigureProviderResponse,
    ) -> Arc<GenesysCloudProviderData> {
        response
            .provider_data
            .unwrap()
            .downcast::<GenesysCloudProviderData>()
            .unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn configure_reads_token_from_environment() {
        std::env::set_var("GENESYSCLOUD_ACCESS_TOKEN", "env-token");

        let mut provider = GenesysCloudProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(provider_config(&[])))
            .await;

        assert!(response.diagnostics.is_empty());
        let data = provider_data_from(response);
        assert_eq!(data.client.base_url(), "https://api.mypurecloud.com");

        std::env::remove_var("GENESYSCLOUD_ACCESS_TOKEN");
    }

    #[tokio::test]
    #[serial]
    async fn configure_requires_an_access_token() {
        std::env::remove_var("GENESYSCLOUD_ACCESS_TOKEN");

        let mut provider = GenesysCloudProvider::new();
        let response = provider
            .configure(Context::new(), configure_request(provider_config(&[])))
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Missing access token");
        assert!(response.provider_data.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn environment_variable_selects_the_region() {
        std::env::set_var("GENESYSCLOUD_ENVIRONMENT", "mypurecloud.de");

        let mut provider = GenesysCloudProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(provider_config(&[("access_token", "t")])),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let data = provider_data_from(response);
        assert_eq!(data.client.base_url(), "https://api.mypurecloud.de");

        std::env::remove_var("GENESYSCLOUD_ENVIRONMENT");
    }

    #[tokio::test]
    #[serial]
    async fn configured_environment_beats_the_env_var() {
        std::env::set_var("GENESYSCLOUD_ENVIRONMENT", "mypurecloud.de");

        let mut provider = GenesysCloudProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(provider_config(&[
                    ("access_token", "t"),
                    ("environment", "mypurecloud.ie"),
                ])),
            )
            .await;

        let data = provider_data_from(response);
        assert_eq!(data.client.base_url(), "https://api.mypurecloud.ie");

        std::env::remove_var("GENESYSCLOUD_ENVIRONMENT");
    }

    #[tokio::test]
    async fn api_url_overrides_the_environment() {
        let mut provider = GenesysCloudProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(provider_config(&[
                    ("access_token", "t"),
                    ("environment", "mypurecloud.ie"),
                    ("api_url", "http://localhost:8080/"),
                ])),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let data = provider_data_from(response);
        assert_eq!(data.client.base_url(), "http://localhost:8080");
    }

    #[tokio::test]
    async fn malformed_api_url_is_a_configure_error() {
        let mut provider = GenesysCloudProvider::new();
        let response = provider
            .configure(
                Context::new(),
                configure_request(provider_config(&[
                    ("access_token", "t"),
                    ("api_url", "not a url"),
                ])),
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid api_url");
        assert!(response.provider_data.is_none());
    }

    #[tokio::test]
    async fn reconfigure_builds_a_fresh_client() {
        let mut provider = GenesysCloudProvider::new();
        let first = provider_data_from(
            provider
                .configure(
                    Context::new(),
                    configure_request(provider_config(&[("access_token", "t")])),
                )
                .await,
        );
        let second = provider_data_from(
            provider
                .configure(
                    Context::new(),
                    configure_request(provider_config(&[("access_token", "t")])),
                )
                .await,
        );

        assert!(!Arc::ptr_eq(&first.client, &second.client));
    }

    #[tokio::test]
    async fn factory_maps_cover_every_entity() {
        let provider = GenesysCloudProvider::new();

        let resources = provider.resources();
        assert_eq!(resources.len(), 9);
        assert!(resources.contains_key("genesyscloud_speechandtextanalytics_program"));
        assert!(resources.contains_key("genesyscloud_recording_settings"));

        let data_sources = provider.data_sources();
        assert_eq!(data_sources.len(), 7);
        assert!(data_sources.contains_key("genesyscloud_languageunderstanding_miner"));

        let exporters = provider.exporters();
        assert_eq!(exporters.len(), 7);
    }

    #[tokio::test]
    async fn provider_schema_marks_the_token_sensitive() {
        let provider = GenesysCloudProvider::new();
        let response = provider
            .schema(Context::new(), ProviderSchemaRequest)
            .await;

        let token = response
            .schema
            .block
            .attributes
            .iter()
            .find(|a| a.name == "access_token")
            .unwrap();
        assert!(token.sensitive);
        assert!(token.optional);
        assert!(!token.required);
    }
}
