//! # coursedir-sync - Catalog Reconciliation Engine
//!
//! Reconciles the upstream course export against the local course catalog
//! and keeps offering enrollment counters in step with the upstream
//! attendance export:
//! - key and normalized-name indexes over the catalog
//! - exact / duplicate-candidate / no-match classification
//! - field-level merge under a per-field ownership policy
//! - inclusion/lifecycle state machine
//! - crash-safe persistence and best-effort notification

pub mod engine;
pub mod enrollment;
pub mod index;
pub mod lifecycle;
pub mod matcher;
pub mod merge;
pub mod notify;
