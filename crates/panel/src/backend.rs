//! Collaborator seams: the permission store and the annotation source.

use async_trait::async_trait;

use dashpanel_core::acl::{AclUpdatePayload, PermissionEntry};
use dashpanel_core::series::Annotation;
use dashpanel_core::types::DbId;

use crate::error::PanelResult;

/// Reads and replaces a dashboard's permission list.
#[async_trait]
pub trait AclBackend: Send + Sync {
    async fn fetch_acl(&self, dashboard_id: DbId) -> PanelResult<Vec<PermissionEntry>>;

    /// Replace the dashboard's direct permissions with `payload`.
    async fn save_acl(&self, dashboard_id: DbId, payload: &AclUpdatePayload) -> PanelResult<()>;
}

/// Supplies the annotations drawn over a dashboard's graphs.
#[async_trait]
pub trait AnnotationSource: Send + Sync {
    async fn get_annotations(&self, dashboard_id: DbId) -> PanelResult<Vec<Annotation>>;
}
