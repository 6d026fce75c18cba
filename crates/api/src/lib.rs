//! Planning backend access for Planboard.
//!
//! This crate provides a trait-based interface to the planning REST API with
//! an HTTP implementation, an offline snapshot implementation, and the
//! caching, retry and stale-response plumbing the views share.

#![warn(missing_docs)]

pub mod trait_;
pub mod config;
pub mod http;
pub mod json_dir;
pub mod cache;
pub mod retry;
pub mod latest;

pub use trait_::{ApiError, PlanFilter, PlanningApi, Result, GENERIC_ERROR_MESSAGE};
pub use config::ClientConfig;
pub use http::HttpApi;
pub use json_dir::JsonDirApi;
pub use cache::{CachedApi, CacheKey, EntityKind};
pub use retry::{with_read_retries, RetryPolicy};
pub use latest::{LatestOnly, Ticket};
