//! Presence API family

pub mod definitions;
