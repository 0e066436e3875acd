//! CRM tool gateway.
//!
//! A fixed catalog of CRM tools served over MCP (stdio or streamable HTTP) and a REST API. Every
//! call passes through one [`dispatch::Dispatcher`], which applies the admission limiter, runs a
//! single upstream operation and normalizes failures into an [`errors::ErrorEnvelope`].

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod limiter;
pub mod logging;
pub mod mcp;
pub mod rest;
pub mod server;
pub mod tool_name;
