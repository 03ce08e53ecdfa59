//! `dashpanel-panel` -- async controllers for dashboard panels.
//!
//! Wraps the pure pipelines of `dashpanel-core` with the collaborators
//! they need at runtime: a permission backend, an annotation source, and
//! a [`reqwest`]-based HTTP implementation of both. The `dashpanel`
//! binary in `main.rs` drives them from the command line.

pub mod acl_editor;
pub mod backend;
pub mod config;
pub mod error;
pub mod graph_panel;
pub mod http;

pub use acl_editor::AclEditor;
pub use backend::{AclBackend, AnnotationSource};
pub use config::ClientConfig;
pub use error::{PanelError, PanelResult};
pub use graph_panel::{CsvLayout, GraphPanel};
pub use http::HttpBackend;
