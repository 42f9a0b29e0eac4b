//! Central registry of resources, data sources and exporters
//!
//! Each entity module contributes its own registrations through a
//! `register` hook; the provider builds its factory maps from here so
//! adding an entity never touches the provider itself.

use std::collections::HashMap;
use tfplug::provider::{DataSourceFactory, ResourceFactory};

use crate::exporter::ResourceExporter;

#[derive(Default)]
pub struct Registrar {
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    exporters: HashMap<String, ResourceExporter>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(&mut self, type_name: &str, factory: ResourceFactory) {
        self.resources.insert(type_name.to_string(), factory);
    }

    pub fn register_data_source(&mut self, type_name: &str, factory: DataSourceFactory) {
        self.data_sources.insert(type_name.to_string(), factory);
    }

    pub fn register_exporter(&mut self, type_name: &str, exporter: ResourceExporter) {
        self.exporters.insert(type_name.to_string(), exporter);
    }

    pub fn into_resources(self) -> HashMap<String, ResourceFactory> {
        self.resources
    }

    pub fn into_data_sources(self) -> HashMap<String, DataSourceFactory> {
        self.data_sources
    }

    pub fn into_exporters(self) -> HashMap<String, ResourceExporter> {
        self.exporters
    }
}

/// Runs every entity module's registration hook.
pub fn register_all(registrar: &mut Registrar) {
    crate::resources::speechandtextanalytics::resource_program::register(registrar);
    crate::resources::speechandtextanalytics::resource_topic::register(registrar);
    crate::resources::speechandtextanalytics::resource_category::register(registrar);
    crate::resources::speechandtextanalytics::resource_dictionary_feedback::register(registrar);
    crate::resources::speechandtextanalytics::resource_sentiment_feedback::register(registrar);
    crate::resources::speechandtextanalytics::resource_sta_settings::register(registrar);
    crate::resources::languageunderstanding::resource_miner::register(registrar);
    crate::resources::presence::resource_presence_definition::register(registrar);
    crate::resources::recording::resource_recording_settings::register(registrar);

    crate::data_sources::data_source_program::register(registrar);
    crate::data_sources::data_source_topic::register(registrar);
    crate::data_sources::data_source_category::register(registrar);
    crate::data_sources::data_source_dictionary_feedback::register(registrar);
    crate::data_sources::data_source_sentiment_feedback::register(registrar);
    crate::data_sources::data_source_miner::register(registrar);
    crate::data_sources::data_source_presence_definition::register(registrar);
}
