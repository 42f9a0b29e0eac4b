#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

//! Walks the async provider surface end to end with an in-memory provider:
//! configure publishes provider data, factories hand out instances, and the
//! instances pick the shared state up through their configure hooks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::import::import_state_passthrough_id;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, ClientCapabilities, Diagnostic, DynamicValue};

#[derive(Default)]
struct TestStore {
    entries: Mutex<HashMap<String, String>>,
}

struct TestProvider;

#[async_trait]
impl Provider for TestProvider {
    fn type_name(&self) -> &str {
        "testkv"
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
        ProviderSchemaResponse {
            schema: SchemaBuilder::new().version(1).build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(TestStore::default())),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "testkv_entry".to_string(),
            Box::new(|| Box::new(EntryResource::default())),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            "testkv_entry".to_string(),
            Box::new(|| Box::new(EntryDataSource::default())),
        );
        data_sources
    }
}

#[derive(Default)]
struct EntryResource {
    store: Option<Arc<TestStore>>,
}

fn entry_schema() -> ResourceSchemaResponse {
    let schema = SchemaBuilder::new()
        .version(1)
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("key", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("value", AttributeType::String)
                .required()
                .build(),
        )
        .build();
    ResourceSchemaResponse {
        schema,
        diagnostics: vec![],
    }
}

fn unconfigured() -> Diagnostic {
    Diagnostic::error("Provider not configured", "No provider data available")
}

#[async_trait]
impl Resource for EntryResource {
    fn type_name(&self) -> &str {
        "testkv_entry"
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
        entry_schema()
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

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let store = match &self.store {
            Some(store) => store,
            None => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![unconfigured()],
                }
            }
        };

        let key = request
            .planned_state
            .get_string(&AttributePath::new("key"))
            .unwrap();
        let value = request
            .planned_state
            .get_string(&AttributePath::new("value"))
            .unwrap();
        store.entries.lock().unwrap().insert(key.clone(), value);

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), key);
        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let store = match &self.store {
            Some(store) => store,
            None => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![unconfigured()],
                    private: vec![],
                    deferred: None,
                }
            }
        };

        let id = request
            .current_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        match store.entries.lock().unwrap().get(&id) {
            Some(value) => {
                let mut new_state = request.current_state;
                let _ = new_state.set_string(&AttributePath::new("key"), id);
                let _ = new_state.set_string(&AttributePath::new("value"), value.clone());
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics: vec![],
                    private: vec![],
                    deferred: None,
                }
            }
            None => ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
                private: vec![],
                deferred: None,
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let store = match &self.store {
            Some(store) => store,
            None => {
                return UpdateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![unconfigured()],
                }
            }
        };

        let key = request
            .planned_state
            .get_string(&AttributePath::new("key"))
            .unwrap();
        let value = request
            .planned_state
            .get_string(&AttributePath::new("value"))
            .unwrap();
        store.entries.lock().unwrap().insert(key, value);

        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let store = match &self.store {
            Some(store) => store,
            None => {
                return DeleteResourceResponse {
                    diagnostics: vec![unconfigured()],
                }
            }
        };

        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        store.entries.lock().unwrap().remove(&id);
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for EntryResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match request
            .provider_data
            .and_then(|data| data.downcast::<TestStore>().ok())
        {
            Some(store) => self.store = Some(store),
            None => diagnostics.push(unconfigured()),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for EntryResource {
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

#[derive(Default)]
struct EntryDataSource {
    store: Option<Arc<TestStore>>,
}

#[async_trait]
impl DataSource for EntryDataSource {
    fn type_name(&self) -> &str {
        "testkv_entry"
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
            .attribute(
                AttributeBuilder::new("key", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value", AttributeType::String)
                    .computed()
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

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let store = match &self.store {
            Some(store) => store,
            None => {
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics: vec![unconfigured()],
                    deferred: None,
                }
            }
        };

        let key = request
            .config
            .get_string(&AttributePath::new("key"))
            .unwrap();
        let mut diagnostics = vec![];
        let mut state = request.config;
        match store.entries.lock().unwrap().get(&key) {
            Some(value) => {
                let _ = state.set_string(&AttributePath::new("value"), value.clone());
            }
            None => diagnostics.push(Diagnostic::error(
                "Entry not found",
                format!("No entry stored under key '{}'", key),
            )),
        }
        ReadDataSourceResponse {
            state,
            diagnostics,
            deferred: None,
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for EntryDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match request
            .provider_data
            .and_then(|data| data.downcast::<TestStore>().ok())
        {
            Some(store) => self.store = Some(store),
            None => diagnostics.push(unconfigured()),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}

fn capabilities() -> ClientCapabilities {
    ClientCapabilities {
        deferral_allowed: false,
        write_only_attributes_allowed: false,
    }
}

async fn configured_provider_data() -> Arc<dyn std::any::Any + Send + Sync> {
    let mut provider = TestProvider;
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::empty_object(),
                client_capabilities: capabilities(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    response.provider_data.unwrap()
}

fn entry_state(key: &str, value: &str) -> DynamicValue {
    let mut state = DynamicValue::empty_object();
    let _ = state.set_string(&AttributePath::new("key"), key.to_string());
    let _ = state.set_string(&AttributePath::new("value"), value.to_string());
    state
}

#[tokio::test]
async fn full_resource_lifecycle_through_the_provider() {
    let provider_data = configured_provider_data().await;
    let provider = TestProvider;

    let mut resource = provider.resources().remove("testkv_entry").unwrap()();
    let configure_response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(provider_data),
            },
        )
        .await;
    assert!(configure_response.diagnostics.is_empty());

    let create_response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "testkv_entry".to_string(),
                planned_state: entry_state("region", "emea"),
                config: entry_state("region", "emea"),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(create_response.diagnostics.is_empty());
    let state = create_response.new_state;
    assert_eq!(
        state.get_string(&AttributePath::new("id")).unwrap(),
        "region"
    );

    let mut updated = entry_state("region", "apac");
    let _ = updated.set_string(&AttributePath::new("id"), "region".to_string());
    let update_response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "testkv_entry".to_string(),
                prior_state: state.clone(),
                planned_state: updated.clone(),
                config: updated,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(update_response.diagnostics.is_empty());

    let read_response = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "testkv_entry".to_string(),
                current_state: state.clone(),
                private: vec![],
                provider_meta: None,
                client_capabilities: capabilities(),
            },
        )
        .await;
    let refreshed = read_response.new_state.unwrap();
    assert_eq!(
        refreshed.get_string(&AttributePath::new("value")).unwrap(),
        "apac"
    );

    let delete_response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "testkv_entry".to_string(),
                prior_state: state.clone(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(delete_response.diagnostics.is_empty());

    // Gone from the store, so refresh signals removal
    let read_response = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "testkv_entry".to_string(),
                current_state: state,
                private: vec![],
                provider_meta: None,
                client_capabilities: capabilities(),
            },
        )
        .await;
    assert!(read_response.new_state.is_none());
    assert!(read_response.diagnostics.is_empty());
}

#[tokio::test]
async fn data_source_reads_what_the_resource_wrote() {
    let provider_data = configured_provider_data().await;
    let provider = TestProvider;

    let mut resource = provider.resources().remove("testkv_entry").unwrap()();
    resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(provider_data.clone()),
            },
        )
        .await;
    resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "testkv_entry".to_string(),
                planned_state: entry_state("owner", "platform"),
                config: entry_state("owner", "platform"),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    let mut data_source = provider.data_sources().remove("testkv_entry").unwrap()();
    data_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: Some(provider_data),
            },
        )
        .await;

    let mut config = DynamicValue::empty_object();
    let _ = config.set_string(&AttributePath::new("key"), "owner".to_string());
    let read_response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "testkv_entry".to_string(),
                config,
                provider_meta: None,
                client_capabilities: capabilities(),
            },
        )
        .await;

    assert!(read_response.diagnostics.is_empty());
    assert_eq!(
        read_response
            .state
            .get_string(&AttributePath::new("value"))
            .unwrap(),
        "platform"
    );
}

#[tokio::test]
async fn factories_build_unconfigured_instances() {
    let provider = TestProvider;
    let resource = provider.resources().remove("testkv_entry").unwrap()();

    let create_response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "testkv_entry".to_string(),
                planned_state: entry_state("region", "emea"),
                config: entry_state("region", "emea"),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert_eq!(create_response.diagnostics.len(), 1);
    assert_eq!(
        create_response.diagnostics[0].summary,
        "Provider not configured"
    );
}

#[tokio::test]
async fn import_state_passes_the_id_through() {
    let resource = EntryResource::default();
    let response = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "testkv_entry".to_string(),
                id: "region".to_string(),
                client_capabilities: capabilities(),
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
        "region"
    );
}

#[tokio::test]
async fn schemas_carry_the_declared_flags() {
    let resource = EntryResource::default();
    let response = resource.schema(Context::new(), ResourceSchemaRequest).await;

    let key = response
        .schema
        .block
        .attributes
        .iter()
        .find(|a| a.name == "key")
        .unwrap();
    assert!(key.required);

    let id = response
        .schema
        .block
        .attributes
        .iter()
        .find(|a| a.name == "id")
        .unwrap();
    assert!(id.computed);
}
