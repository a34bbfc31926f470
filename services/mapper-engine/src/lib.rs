//! Protocol mapper engine library crate.
//!
//! # Purpose
//! Registers OIDC protocol mapper types, validates and stores per-client mapper
//! instances, and assembles token claims from them at issuance time.
//!
//! # How it fits
//! - [`registry`] holds mapper type descriptors and their transforms.
//! - [`validation`] and [`store`] guard and own the per-client instances.
//! - [`pipeline`] and [`consent`] serve the token-issuance flow.
//! - [`providers`] are the read-only identity data seams.
//! - [`app`], [`config`], [`observability`], and [`seed`] wire the service.
pub mod app;
pub mod config;
pub mod consent;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod registry;
pub mod seed;
pub mod store;
pub mod templates;
pub mod transform;
pub mod validation;
