//! Recording API family

pub mod settings;
