pub mod resource_category;
pub mod resource_dictionary_feedback;
pub mod resource_program;
pub mod resource_sentiment_feedback;
pub mod resource_sta_settings;
pub mod resource_topic;
