//! # contextdb-server
//!
//! Thin adapters over [`contextdb_core`]: an HTTP+JSON surface (axum)
//! and an equivalent single-shot CLI surface, both exposed through the
//! `context-db` binary.

/// REST API layer: router, handlers, request/response models, errors.
pub mod api;
/// Single-shot CLI commands reading a JSON payload and writing one JSON line.
pub mod cli;
