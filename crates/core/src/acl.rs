//! Dashboard access-list reconciliation.
//!
//! Classifies permission entries by grant subject, derives their display
//! name and sort key, orders the list, and reduces it to the payload the
//! backend stores as the dashboard's direct permission set. Derived
//! fields live on [`AclItem`] only and are recomputed from the raw
//! [`PermissionEntry`] every time, so nothing the server sends for them
//! is ever trusted.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Base sort rank for user grants.
pub const RANK_USER: i32 = 10;

/// Base sort rank for group grants.
pub const RANK_GROUP: i32 = 20;

/// Base sort rank for role grants.
pub const RANK_ROLE: i32 = 30;

/// Extra rank applied once to the `Viewer` role grant.
pub const RANK_VIEWER_OFFSET: i32 = 3;

/// Extra rank applied to entries owned by another (parent) dashboard.
pub const RANK_INHERITED_OFFSET: i32 = 100;

pub const ICON_USER: &str = "fa fa-fw fa-user";
pub const ICON_GROUP: &str = "fa fa-fw fa-users";
pub const ICON_ROLE: &str = "fa fa-fw fa-street-view";

pub const ROLE_VIEWER: &str = "Viewer";
pub const ROLE_EDITOR: &str = "Editor";

/// Roles that can be granted through the subject type selector.
const SELECTABLE_ROLES: &[&str] = &[ROLE_VIEWER, ROLE_EDITOR];

/// Permission level choices offered by the editor, in display order.
pub const PERMISSION_OPTIONS: &[(PermissionLevel, &str)] = &[
    (PermissionLevel::View, "View"),
    (PermissionLevel::Edit, "Edit"),
    (PermissionLevel::Admin, "Admin"),
];

/// Subject type selector values and labels, in display order.
pub const SUBJECT_TYPE_OPTIONS: &[(&str, &str)] = &[
    ("Group", "User Group"),
    ("User", "User"),
    (ROLE_VIEWER, "Everyone With Viewer Role"),
    (ROLE_EDITOR, "Everyone With Editor Role"),
];

/// Selector value the subject type control returns to after an add.
pub const DEFAULT_SUBJECT_TYPE: &str = "Group";

// ---------------------------------------------------------------------------
// Permission level
// ---------------------------------------------------------------------------

/// Access level granted by an entry. Serialized as its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum PermissionLevel {
    #[default]
    View = 1,
    Edit = 2,
    Admin = 4,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Edit => "Edit",
            Self::Admin => "Admin",
        }
    }
}

impl From<PermissionLevel> for i32 {
    fn from(level: PermissionLevel) -> Self {
        level as i32
    }
}

impl TryFrom<i32> for PermissionLevel {
    type Error = CoreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::View),
            2 => Ok(Self::Edit),
            4 => Ok(Self::Admin),
            other => Err(CoreError::Validation(format!(
                "Invalid permission level {other}. Must be one of: 1, 2, 4"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A permission row as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    #[serde(default)]
    pub dashboard_id: Option<DbId>,
    #[serde(default)]
    pub user_id: Option<DbId>,
    #[serde(default)]
    pub user_login: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_group_id: Option<DbId>,
    #[serde(default)]
    pub user_group: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub permission: PermissionLevel,
    #[serde(default)]
    pub permission_name: Option<String>,
}

/// The kind of principal a permission is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    User,
    Group,
    Role,
}

/// A permission entry together with its derived view-model fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AclItem {
    #[serde(flatten)]
    pub entry: PermissionEntry,
    /// `None` when the entry names no subject at all.
    pub kind: Option<SubjectKind>,
    pub inherited: bool,
    pub sort_rank: i32,
    pub sort_name: String,
    pub icon: Option<&'static str>,
    /// HTML-safe display name.
    pub name_html: String,
}

/// A user chosen in the user picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedUser {
    pub id: DbId,
    pub login: String,
}

/// A group chosen in the group picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedGroup {
    pub id: DbId,
    pub name: String,
}

/// Which input control the caller should clear after an entry was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerReset {
    UserPicker,
    GroupPicker,
    SubjectTypeSelector,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify an entry and compute its derived fields.
///
/// Subject kind is decided in the order user, group, role. An entry with
/// none of them stays unclassified: no icon, rank 0 (plus the inherited
/// offset), empty sort name.
pub fn classify(entry: PermissionEntry, current_dashboard_id: DbId) -> AclItem {
    let inherited = entry.dashboard_id != Some(current_dashboard_id);

    let mut kind = None;
    let mut sort_rank = 0;
    let mut sort_name = String::new();
    let mut icon = None;
    let mut name_html = String::new();

    if entry.user_id.is_some_and(|id| id > 0) {
        let login = entry.user_login.clone().unwrap_or_default();
        kind = Some(SubjectKind::User);
        icon = Some(ICON_USER);
        name_html = escape_html(&login);
        sort_name = login;
        sort_rank = RANK_USER;
    } else if entry.user_group_id.is_some_and(|id| id > 0) {
        let group = entry.user_group.clone().unwrap_or_default();
        kind = Some(SubjectKind::Group);
        icon = Some(ICON_GROUP);
        name_html = escape_html(&group);
        sort_name = group;
        sort_rank = RANK_GROUP;
    } else if let Some(role) = entry.role.as_deref().filter(|r| !r.is_empty()) {
        kind = Some(SubjectKind::Role);
        icon = Some(ICON_ROLE);
        name_html = role_display_html(role);
        sort_name = role.to_string();
        sort_rank = RANK_ROLE;
        if role == ROLE_VIEWER {
            sort_rank += RANK_VIEWER_OFFSET;
        }
    }

    if inherited {
        sort_rank += RANK_INHERITED_OFFSET;
    }

    AclItem {
        entry,
        kind,
        inherited,
        sort_rank,
        sort_name,
        icon,
        name_html,
    }
}

/// Display markup for a role grant. The role is the only interpolated
/// value and is escaped before being wrapped in the keyword span.
pub fn role_display_html(role: &str) -> String {
    format!(
        "Everyone with <span class=\"query-keyword\">{}</span> Role",
        escape_html(role)
    )
}

/// Escape the five HTML-significant characters.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Stable sort by `(sort_rank, sort_name)`, both ascending.
///
/// Direct entries (rank < 100) always precede inherited ones; equal keys
/// keep their input order.
pub fn sort_entries(items: &mut [AclItem]) {
    items.sort_by(|a, b| {
        a.sort_rank
            .cmp(&b.sort_rank)
            .then_with(|| a.sort_name.cmp(&b.sort_name))
    });
}

/// Classify a fetched list and return it sorted.
pub fn prepare_items(entries: Vec<PermissionEntry>, current_dashboard_id: DbId) -> Vec<AclItem> {
    let mut items: Vec<AclItem> = entries
        .into_iter()
        .map(|e| classify(e, current_dashboard_id))
        .collect();
    sort_entries(&mut items);
    items
}

// ---------------------------------------------------------------------------
// Persistence payload
// ---------------------------------------------------------------------------

/// One direct permission in the save payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclPayloadItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_group_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub permission: PermissionLevel,
}

/// Full replacement set for a dashboard's direct permissions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AclUpdatePayload {
    pub items: Vec<AclPayloadItem>,
}

/// Reduce the list to the entries owned by the current dashboard,
/// keeping only the persisted fields.
pub fn build_persistable_payload(items: &[AclItem]) -> AclUpdatePayload {
    let items = items
        .iter()
        .filter(|item| !item.inherited)
        .map(|item| AclPayloadItem {
            id: item.entry.id,
            user_id: item.entry.user_id,
            user_group_id: item.entry.user_group_id,
            role: item.entry.role.clone(),
            permission: item.entry.permission,
        })
        .collect();
    AclUpdatePayload { items }
}

// ---------------------------------------------------------------------------
// Adding entries
// ---------------------------------------------------------------------------

/// Classify `entry` as owned by the current dashboard, append it and
/// re-sort the list.
pub fn add_entry(items: &mut Vec<AclItem>, mut entry: PermissionEntry, current_dashboard_id: DbId) {
    entry.dashboard_id = Some(current_dashboard_id);
    items.push(classify(entry, current_dashboard_id));
    sort_entries(items);
}

/// Grant View to a picked user.
pub fn add_user(items: &mut Vec<AclItem>, user: PickedUser, current_dashboard_id: DbId) -> PickerReset {
    let entry = PermissionEntry {
        user_id: Some(user.id),
        user_login: Some(user.login),
        permission: PermissionLevel::View,
        ..Default::default()
    };
    add_entry(items, entry, current_dashboard_id);
    PickerReset::UserPicker
}

/// Grant View to a picked group.
pub fn add_group(items: &mut Vec<AclItem>, group: PickedGroup, current_dashboard_id: DbId) -> PickerReset {
    let entry = PermissionEntry {
        user_group_id: Some(group.id),
        user_group: Some(group.name),
        permission: PermissionLevel::View,
        ..Default::default()
    };
    add_entry(items, entry, current_dashboard_id);
    PickerReset::GroupPicker
}

/// Grant View to everyone holding the selected role.
///
/// Only `Viewer` and `Editor` add an entry; any other selector value
/// (including the user/group selectors) leaves the list untouched and
/// returns `None`.
pub fn add_role(
    items: &mut Vec<AclItem>,
    selector: &str,
    current_dashboard_id: DbId,
) -> Option<PickerReset> {
    let role = SELECTABLE_ROLES.iter().find(|r| **r == selector)?;
    let entry = PermissionEntry {
        role: Some((*role).to_string()),
        permission: PermissionLevel::View,
        ..Default::default()
    };
    add_entry(items, entry, current_dashboard_id);
    Some(PickerReset::SubjectTypeSelector)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const DASH: DbId = 7;

    fn role_entry(role: &str, dashboard_id: DbId) -> PermissionEntry {
        PermissionEntry {
            role: Some(role.to_string()),
            dashboard_id: Some(dashboard_id),
            ..Default::default()
        }
    }

    fn user_entry(id: DbId, login: &str, dashboard_id: DbId) -> PermissionEntry {
        PermissionEntry {
            user_id: Some(id),
            user_login: Some(login.to_string()),
            dashboard_id: Some(dashboard_id),
            ..Default::default()
        }
    }

    fn group_entry(id: DbId, name: &str, dashboard_id: DbId) -> PermissionEntry {
        PermissionEntry {
            user_group_id: Some(id),
            user_group: Some(name.to_string()),
            dashboard_id: Some(dashboard_id),
            ..Default::default()
        }
    }

    // -- PermissionLevel -------------------------------------------------

    #[test]
    fn permission_level_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&PermissionLevel::Admin).unwrap(), "4");
    }

    #[test]
    fn permission_level_rejects_unknown_integer() {
        assert_matches!(PermissionLevel::try_from(3), Err(CoreError::Validation(_)));
        assert!(serde_json::from_str::<PermissionLevel>("8").is_err());
    }

    // -- classify --------------------------------------------------------

    #[test]
    fn classify_user_entry() {
        let item = classify(user_entry(5, "al", DASH), DASH);
        assert_eq!(item.kind, Some(SubjectKind::User));
        assert_eq!(item.sort_rank, RANK_USER);
        assert_eq!(item.sort_name, "al");
        assert_eq!(item.icon, Some(ICON_USER));
        assert!(!item.inherited);
    }

    #[test]
    fn classify_group_entry() {
        let item = classify(group_entry(3, "ops", DASH), DASH);
        assert_eq!(item.kind, Some(SubjectKind::Group));
        assert_eq!(item.sort_rank, RANK_GROUP);
        assert_eq!(item.icon, Some(ICON_GROUP));
    }

    #[test]
    fn classify_prefers_user_over_group_and_role() {
        let mut entry = user_entry(5, "al", DASH);
        entry.user_group_id = Some(3);
        entry.role = Some("Editor".into());
        assert_eq!(classify(entry, DASH).kind, Some(SubjectKind::User));
    }

    #[test]
    fn classify_zero_user_id_falls_through_to_group() {
        let mut entry = group_entry(3, "ops", DASH);
        entry.user_id = Some(0);
        assert_eq!(classify(entry, DASH).kind, Some(SubjectKind::Group));
    }

    #[test]
    fn viewer_offset_applied_once() {
        let item = classify(role_entry("Viewer", DASH), DASH);
        assert_eq!(item.sort_rank, 33);
        let editor = classify(role_entry("Editor", DASH), DASH);
        assert_eq!(editor.sort_rank, 30);
    }

    #[test]
    fn inherited_adds_hundred() {
        let item = classify(role_entry("Viewer", 1), DASH);
        assert!(item.inherited);
        assert_eq!(item.sort_rank, 133);
    }

    #[test]
    fn unclassified_entry_degrades() {
        let entry = PermissionEntry {
            dashboard_id: Some(DASH),
            role: Some(String::new()),
            ..Default::default()
        };
        let item = classify(entry, DASH);
        assert_eq!(item.kind, None);
        assert_eq!(item.icon, None);
        assert_eq!(item.sort_rank, 0);
        assert_eq!(item.sort_name, "");
    }

    #[test]
    fn role_display_name_wraps_keyword() {
        let item = classify(role_entry("Editor", DASH), DASH);
        assert_eq!(
            item.name_html,
            "Everyone with <span class=\"query-keyword\">Editor</span> Role"
        );
    }

    #[test]
    fn display_names_are_escaped() {
        let item = classify(role_entry("<b>x</b>", DASH), DASH);
        assert_eq!(
            item.name_html,
            "Everyone with <span class=\"query-keyword\">&lt;b&gt;x&lt;/b&gt;</span> Role"
        );
        let user = classify(user_entry(1, "a&\"b'", DASH), DASH);
        assert_eq!(user.name_html, "a&amp;&quot;b&#39;");
    }

    #[test]
    fn derived_fields_from_server_are_ignored() {
        let json = serde_json::json!({
            "id": 1,
            "dashboardId": DASH,
            "userId": 5,
            "userLogin": "al",
            "permission": 2,
            "inherited": true,
            "sortRank": 999,
            "sortName": "zzz"
        });
        let entry: PermissionEntry = serde_json::from_value(json).unwrap();
        let item = classify(entry, DASH);
        assert!(!item.inherited);
        assert_eq!(item.sort_rank, RANK_USER);
        assert_eq!(item.sort_name, "al");
        assert_eq!(item.entry.permission, PermissionLevel::Edit);
    }

    // -- sort_entries ----------------------------------------------------

    #[test]
    fn scenario_roles_then_inherited_user() {
        let items = prepare_items(
            vec![
                role_entry("Viewer", DASH),
                role_entry("Editor", DASH),
                user_entry(5, "al", 1),
            ],
            DASH,
        );
        let order: Vec<(&str, i32)> = items
            .iter()
            .map(|i| (i.sort_name.as_str(), i.sort_rank))
            .collect();
        assert_eq!(order, vec![("Editor", 30), ("Viewer", 33), ("al", 110)]);
    }

    #[test]
    fn sort_is_stable_for_duplicate_keys() {
        let mut first = user_entry(1, "dup", DASH);
        first.id = Some(100);
        let mut second = user_entry(2, "dup", DASH);
        second.id = Some(200);
        let mut third = user_entry(3, "dup", DASH);
        third.id = Some(300);

        let items = prepare_items(vec![first, second, third], DASH);
        let ids: Vec<_> = items.iter().map(|i| i.entry.id).collect();
        assert_eq!(ids, vec![Some(100), Some(200), Some(300)]);
    }

    #[test]
    fn inherited_always_after_direct() {
        let items = prepare_items(
            vec![
                user_entry(1, "inherited-user", 1),
                role_entry("Viewer", DASH),
                group_entry(2, "zz", DASH),
                group_entry(3, "inherited-group", 2),
            ],
            DASH,
        );
        let first_inherited = items.iter().position(|i| i.inherited).unwrap();
        assert!(items[first_inherited..].iter().all(|i| i.inherited));
        assert!(items[..first_inherited].iter().all(|i| !i.inherited));
    }

    #[test]
    fn unclassified_sorts_first() {
        let items = prepare_items(
            vec![user_entry(1, "al", DASH), PermissionEntry {
                dashboard_id: Some(DASH),
                ..Default::default()
            }],
            DASH,
        );
        assert_eq!(items[0].kind, None);
    }

    #[test]
    fn names_ascending_within_rank() {
        let items = prepare_items(
            vec![user_entry(1, "zed", DASH), user_entry(2, "amy", DASH)],
            DASH,
        );
        assert_eq!(items[0].sort_name, "amy");
        assert_eq!(items[1].sort_name, "zed");
    }

    // -- build_persistable_payload ---------------------------------------

    #[test]
    fn payload_excludes_inherited_and_keeps_direct_once() {
        let mut direct = user_entry(5, "al", DASH);
        direct.id = Some(11);
        direct.permission = PermissionLevel::Admin;
        let items = prepare_items(
            vec![direct, role_entry("Editor", DASH), role_entry("Viewer", 1)],
            DASH,
        );
        let payload = build_persistable_payload(&items);
        assert_eq!(payload.items.len(), 2);
        assert!(payload.items.iter().all(|p| p.role.as_deref() != Some("Viewer")));
        assert_eq!(
            payload.items.iter().filter(|p| p.user_id == Some(5)).count(),
            1
        );
    }

    #[test]
    fn payload_strips_display_fields() {
        let mut entry = user_entry(5, "al", DASH);
        entry.id = Some(11);
        let items = prepare_items(vec![entry], DASH);
        let json = serde_json::to_value(build_persistable_payload(&items)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"items": [{"id": 11, "userId": 5, "permission": 1}]})
        );
    }

    // -- add paths -------------------------------------------------------

    #[test]
    fn add_user_defaults_to_view_and_resorts() {
        let mut items = prepare_items(vec![role_entry("Editor", DASH)], DASH);
        let reset = add_user(
            &mut items,
            PickedUser {
                id: 9,
                login: "bo".into(),
            },
            DASH,
        );
        assert_eq!(reset, PickerReset::UserPicker);
        assert_eq!(items[0].sort_name, "bo");
        assert_eq!(items[0].entry.permission, PermissionLevel::View);
        assert!(!items[0].inherited);
    }

    #[test]
    fn add_group_returns_group_reset() {
        let mut items = Vec::new();
        let reset = add_group(
            &mut items,
            PickedGroup {
                id: 4,
                name: "ops".into(),
            },
            DASH,
        );
        assert_eq!(reset, PickerReset::GroupPicker);
        assert_eq!(items[0].kind, Some(SubjectKind::Group));
    }

    #[test]
    fn add_role_accepts_viewer_and_editor_only() {
        let mut items = Vec::new();
        assert_eq!(
            add_role(&mut items, "Viewer", DASH),
            Some(PickerReset::SubjectTypeSelector)
        );
        assert_eq!(
            add_role(&mut items, "Editor", DASH),
            Some(PickerReset::SubjectTypeSelector)
        );
        assert_eq!(add_role(&mut items, "Group", DASH), None);
        assert_eq!(add_role(&mut items, "Admin", DASH), None);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| !i.inherited));
    }

    #[test]
    fn added_role_is_persisted() {
        let mut items = Vec::new();
        add_role(&mut items, "Editor", DASH);
        let payload = build_persistable_payload(&items);
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].role.as_deref(), Some("Editor"));
    }
}
