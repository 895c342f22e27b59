//! # IAM Registry Library
//!
//! Core functionality for the IAM Registry service: a typed query and
//! mutation surface over a hierarchical resource graph, kept coherent with
//! an external policy decision service.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod models;
pub mod policy;
pub mod projection;
pub mod registry;
pub mod seeds;
pub mod server;
pub mod store;
pub mod telemetry;
pub use migration;
