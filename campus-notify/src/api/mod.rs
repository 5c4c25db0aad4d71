//! HTTP API handlers for campus-notify

pub mod feed;
pub mod health;
pub mod sse;
