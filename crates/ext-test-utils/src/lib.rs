//! Shared test utilities for the extension manager workspace.
//!
//! This crate provides fixtures for crate test suites. It is a
//! dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`descriptor`]: [`DescriptorBuilder`] for `extension.toml` content
//! - [`platform`]: [`TestPlatform`], a temporary platform root with an
//!   extensions tree

pub mod descriptor;
pub mod platform;

pub use descriptor::DescriptorBuilder;
pub use platform::TestPlatform;
