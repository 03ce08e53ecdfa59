//! `dashpanel-core` -- pure domain logic for dashboard panels.
//!
//! Contains the access-list reconciler and the series normalization
//! pipeline. The crate performs no I/O; every input is passed in by the
//! caller and every output is a plain value.

pub mod acl;
pub mod error;
pub mod export;
pub mod panel_config;
pub mod series;
pub mod types;
