//! Language understanding API family

pub mod miners;
