//! GitHub as the content store
//!
//! - `client`: shared, credential-injecting HTTP client
//! - `contents`: file create/update through the contents API

mod client;
mod contents;

pub use client::{ForwardRequest, GITHUB_ACCEPT, GitHubClient, filter_request_headers};
pub use contents::FileWrite;
