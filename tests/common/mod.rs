//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, TEST_EMAIL, TEST_PASS};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_list_tracks() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::authenticated(server.base_url.clone(), TEST_EMAIL, TEST_PASS).await;
//!
//!     let response = client.get_tracks("").await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod fixtures;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{mp3_bytes, png_bytes, token_from_link};
pub use server::TestServer;
