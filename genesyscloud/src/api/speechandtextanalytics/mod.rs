//! Speech and text analytics API family

pub mod categories;
pub mod dictionary_feedback;
pub mod programs;
pub mod sentiment_feedback;
pub mod settings;
pub mod topics;
