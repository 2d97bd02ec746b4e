//! Core business logic for unipoll.

pub mod services;

pub use services::*;
