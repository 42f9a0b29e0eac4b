//! Data source implementations, one per named entity
//!
//! Every data source does the same thing: resolve an entity name to its id
//! through the proxy's `get_id_by_name`, polling briefly because listings
//! lag behind writes.

pub mod data_source_category;
pub mod data_source_dictionary_feedback;
pub mod data_source_miner;
pub mod data_source_presence_definition;
pub mod data_source_program;
pub mod data_source_sentiment_feedback;
pub mod data_source_topic;
