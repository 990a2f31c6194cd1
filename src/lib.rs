//! # tabwash
//!
//! Ingests tabular files (CSV, TSV, Excel, OpenDocument), normalizes them
//! into a canonical CSV form, and serves bounded JSON-safe previews.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌─────────┐
//! │  upload  │──▶│   raw   │──▶│  decode + │──▶│ cleaned │
//! │ CLI/HTTP │   │  store  │   │ normalize │   │  store  │
//! └──────────┘   └─────────┘   └───────────┘   └────┬────┘
//!                                                   │
//!                                   ┌───────────────┤
//!                                   ▼               ▼
//!                              ┌─────────┐    ┌──────────┐
//!                              │ preview │    │ download │
//!                              └─────────┘    └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tabwash upload ./sales.csv
//! tabwash clean sales.csv
//! tabwash view sales.csv
//! tabwash serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Tables, cells, previews, reports |
//! | [`error`] | Pipeline error taxonomy |
//! | [`store`] | Raw/cleaned blob storage |
//! | [`decode`] | Bytes → table, by extension, with encoding fallback |
//! | [`normalize`] | Canonical cleaning transform |
//! | [`project`] | JSON-safe bounded previews |
//! | [`activity`] | Append-only activity log |
//! | [`pipeline`] | Operation orchestration |
//! | [`commands`] | CLI printers |
//! | [`server`] | HTTP API |

pub mod activity;
pub mod commands;
pub mod config;
pub mod decode;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod project;
pub mod server;
pub mod store;
