//! Client for the upstream CRM REST API.
//!
//! Every operation maps to exactly one HTTP call and produces an [`UpstreamEnvelope`] on
//! success. Non-2xx replies and transport failures surface as [`UpstreamError`] values; turning
//! those into user-facing envelopes is the caller's job.
//!
//! This crate holds **no** per-call state and applies **no** admission control.

pub mod client;
pub mod envelope;
pub mod error;
pub mod operations;
pub mod safety;

pub use client::{ClientConfig, CrmClient, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
pub use envelope::UpstreamEnvelope;
pub use error::{Result, UpstreamError};
