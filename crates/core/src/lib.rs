//! Hoby Loop Core - Shared domain types.
//!
//! This crate provides the types used across all Hoby Loop components:
//! - `api` - HTTP service and the reconciling seeder
//! - `cli` - Command-line tools for migrations, seeding and tax-ID checks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`document`] - CPF/CNPJ check-digit validation and formatting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod document;
pub mod types;

pub use document::{Cnpj, Cpf, DocumentError};
pub use types::*;
