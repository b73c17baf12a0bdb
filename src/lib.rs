//! # Hybrik client for Rust
//!
//! Rust client and CLI for the [Dolby Hybrik](https://hybrik.com) video
//! transcoding API: submit jobs, list them, and fetch their results over a
//! thin synchronous HTTP layer.
//!
//! ## Quick start
//!
//! ```no_run
//! use hybrik::{CreateJobOptions, HybrikClient};
//! use serde_json::json;
//!
//! fn main() -> hybrik::Result<()> {
//!     let mut client = HybrikClient::new(
//!         "https://api-demo.hybrik.com/v1",
//!         "org-key",
//!         "org-secret",
//!         "user@example.com",
//!         "password",
//!     )?;
//!     client.connect()?;
//!
//!     let payload = json!({"elements": []});
//!     let response = client.create_job("demo", &payload, &CreateJobOptions::default())?;
//!     println!("{:?}", response.payload);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Builder pattern
//!
//! ```no_run
//! use hybrik::HybrikClientBuilder;
//!
//! # fn example() -> hybrik::Result<()> {
//! let client = HybrikClientBuilder::new()
//!     .api_url("https://api-demo.hybrik.com/v1")
//!     .oapi_key("org-key")
//!     .oapi_secret("org-secret")
//!     .compliance_date("20240228")
//!     .output_curl(true)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
mod client;
mod errors;
mod http;
mod models;

pub use client::{HybrikClient, HybrikClientBuilder};
pub use errors::{HybrikError, Result};
pub use http::{ApiResponse, HttpClient, Payload};
pub use models::{CreateJobOptions, ListJobsQuery, Session};
