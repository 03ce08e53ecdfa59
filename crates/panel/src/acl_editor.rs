//! Permission editor for a single dashboard.
//!
//! Holds the classified, sorted access list in memory, applies user
//! edits, and sends the direct-permission subset to the backend on save.

use dashpanel_core::acl::{
    self, AclItem, AclUpdatePayload, PermissionLevel, PickedGroup, PickedUser, PickerReset,
    DEFAULT_SUBJECT_TYPE,
};
use dashpanel_core::error::CoreError;
use dashpanel_core::types::DbId;

use crate::backend::AclBackend;
use crate::error::PanelResult;

#[derive(Debug, Clone)]
pub struct AclEditor {
    dashboard_id: DbId,
    items: Vec<AclItem>,
    can_update: bool,
    subject_type: String,
}

impl AclEditor {
    /// An editor with an empty list; see [`AclEditor::load`].
    pub fn new(dashboard_id: DbId) -> Self {
        Self {
            dashboard_id,
            items: Vec::new(),
            can_update: false,
            subject_type: DEFAULT_SUBJECT_TYPE.to_string(),
        }
    }

    /// Fetch the dashboard's permissions and prepare them for display.
    pub async fn load<B: AclBackend + ?Sized>(backend: &B, dashboard_id: DbId) -> PanelResult<Self> {
        let entries = backend.fetch_acl(dashboard_id).await?;
        let mut editor = Self::new(dashboard_id);
        editor.items = acl::prepare_items(entries, dashboard_id);
        tracing::info!(
            dashboard_id,
            item_count = editor.items.len(),
            "Loaded dashboard permissions"
        );
        Ok(editor)
    }

    pub fn dashboard_id(&self) -> DbId {
        self.dashboard_id
    }

    pub fn items(&self) -> &[AclItem] {
        &self.items
    }

    /// Whether there are unsaved edits.
    pub fn can_update(&self) -> bool {
        self.can_update
    }

    /// Current value of the subject type selector.
    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    pub fn user_picked(&mut self, user: PickedUser) -> PickerReset {
        let reset = acl::add_user(&mut self.items, user, self.dashboard_id);
        self.can_update = true;
        reset
    }

    pub fn group_picked(&mut self, group: PickedGroup) -> PickerReset {
        let reset = acl::add_group(&mut self.items, group, self.dashboard_id);
        self.can_update = true;
        reset
    }

    /// The subject type selector changed. Role selections add an entry
    /// immediately and reset the selector; other values just stick.
    pub fn subject_type_changed(&mut self, selector: &str) -> Option<PickerReset> {
        match acl::add_role(&mut self.items, selector, self.dashboard_id) {
            Some(reset) => {
                self.can_update = true;
                self.subject_type = DEFAULT_SUBJECT_TYPE.to_string();
                Some(reset)
            }
            None => {
                self.subject_type = selector.to_string();
                None
            }
        }
    }

    /// Change the level of the entry at `index`.
    pub fn set_permission(&mut self, index: usize, level: PermissionLevel) -> PanelResult<()> {
        let item = self.direct_item_mut(index)?;
        item.entry.permission = level;
        self.can_update = true;
        Ok(())
    }

    /// Remove the entry at `index` from the in-memory list.
    pub fn remove(&mut self, index: usize) -> PanelResult<AclItem> {
        self.direct_item_mut(index)?;
        self.can_update = true;
        Ok(self.items.remove(index))
    }

    /// The payload [`AclEditor::save`] would send.
    pub fn payload(&self) -> AclUpdatePayload {
        acl::build_persistable_payload(&self.items)
    }

    /// Persist the direct permissions. On failure the in-memory list and
    /// the unsaved-edits flag are left as they were.
    pub async fn save<B: AclBackend + ?Sized>(&mut self, backend: &B) -> PanelResult<()> {
        let payload = self.payload();
        match backend.save_acl(self.dashboard_id, &payload).await {
            Ok(()) => {
                self.can_update = false;
                tracing::info!(
                    dashboard_id = self.dashboard_id,
                    item_count = payload.items.len(),
                    "Saved dashboard permissions"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    dashboard_id = self.dashboard_id,
                    error = %e,
                    "Saving dashboard permissions failed"
                );
                Err(e)
            }
        }
    }

    /// Inherited entries belong to a parent dashboard and cannot be
    /// edited here.
    fn direct_item_mut(&mut self, index: usize) -> PanelResult<&mut AclItem> {
        let item = self.items.get_mut(index).ok_or(CoreError::NotFound {
            entity: "acl item",
            id: index as DbId,
        })?;
        if item.inherited {
            return Err(CoreError::Validation(format!(
                "acl item {index} is inherited from another dashboard"
            ))
            .into());
        }
        Ok(item)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
