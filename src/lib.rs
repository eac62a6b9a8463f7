//! # medidoc
//!
//! A medical document upload-and-retrieval portal.
//!
//! Users upload existing PDFs, or fill in a patient-intake form that is
//! rendered to PDF before upload. Uploaded bytes land in a flat directory
//! under generated names; a SQLite table records what exists and where.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   HTTP    ┌──────────────┐   ┌──────────────────┐
//! │  Workspace   │──────────▶│    Server    │──▶│ DocumentService  │
//! │ CLI / client │           │ (axum)       │   │ (medidoc-core)   │
//! └──────┬───────┘           └──────────────┘   └───┬──────────┬───┘
//!        │  local                                    ▼          ▼
//!        └─────────────────────────────────────▶ ┌────────┐ ┌────────┐
//!                                                │ SQLite │ │ uploads│
//!                                                └────────┘ └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! medidoc init                              # create database + upload dir
//! medidoc serve                             # start HTTP server
//! medidoc upload ./scan.pdf                 # upload locally
//! medidoc --remote --url http://host:5000 list   # list via a running server
//! medidoc intake submit ./form.toml         # render + upload an intake form
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite metadata store |
//! | [`fs_blob`] | Filesystem blob store |
//! | [`app`] | Service wiring |
//! | [`server`] | HTTP server |
//! | [`client`] | HTTP client |
//! | [`intake_pdf`] | Intake form PDF rendering |
//! | [`workspace`] | Client workspace and CLI commands |

pub mod app;
pub mod client;
pub mod config;
pub mod db;
pub mod fs_blob;
pub mod intake_pdf;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
pub mod workspace;

pub use medidoc_core;
