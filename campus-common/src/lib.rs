//! # Campus Common Library
//!
//! Shared code for campus microservices including:
//! - Event types (NotifyEvent enum) and the EventBus
//! - API envelope and response normalization types
//! - Configuration loading
//! - Error types

pub mod api;
pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
