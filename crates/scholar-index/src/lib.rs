//! scholar-index
//!
//! HTTP client for the OpenSearch document index. Implements the ANN,
//! multi-get and lexical seams from `scholar_core::traits`.

pub mod client;
pub mod dsl;
pub mod response;

pub use client::OpenSearchClient;
