//! Resource implementations grouped by API family

pub mod languageunderstanding;
pub mod presence;
pub mod recording;
pub mod speechandtextanalytics;
