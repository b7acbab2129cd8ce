//! Core data types for the toll/EV study

pub mod adoption;
pub mod scenario;
pub mod vehicle;
