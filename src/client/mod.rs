//! Client Module
//!
//! HTTP transport shared by the provider adapters.

pub mod http;

pub use http::{headers_from, HttpClient};
