//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing output goes through this module so the `ERROR:` prefix
//! and quiet mode are applied consistently.

pub mod output;
