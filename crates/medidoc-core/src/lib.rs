//! # medidoc core
//!
//! Shared logic for medidoc: the document record model, error kinds,
//! metadata and blob store abstractions, storage-name generation, the
//! [`DocumentService`](service::DocumentService) that ties the two stores
//! together, and the patient-intake form model.
//!
//! This crate contains no sqlx, axum, or filesystem I/O. Native store
//! implementations live in the `medidoc` crate; in-memory ones live in
//! [`store::memory`].

pub mod error;
pub mod intake;
pub mod models;
pub mod naming;
pub mod service;
pub mod store;

pub use error::{DocumentError, Result};
pub use models::{DocumentRecord, Download, DriftReport};
pub use service::DocumentService;
