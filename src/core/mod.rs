//! core
//!
//! Core domain types, the Puppetfile model and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: EnvironmentName, ModuleId, Oid
//! - [`pinfile`] - Puppetfile parsing and canonical rendering
//! - [`policy`] - Protected environment lookup
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here touches git or spawns processes

pub mod config;
pub mod pinfile;
pub mod policy;
pub mod types;
