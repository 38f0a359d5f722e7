//! Priority list scope and change type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of a priority list scope, as stored in `list_orders.scope_kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Global,
    Category,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Category => "category",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "global" => Some(ScopeKind::Global),
            "category" => Some(ScopeKind::Category),
            _ => None,
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The domain over which one order is defined
///
/// `Global` covers all items; `Category` covers the items of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "category_id", rename_all = "snake_case")]
pub enum Scope {
    Global,
    Category(Uuid),
}

impl Scope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Global => ScopeKind::Global,
            Scope::Category(_) => ScopeKind::Category,
        }
    }

    /// Category key stored with rows of this scope (absent for global)
    pub fn category_id(&self) -> Option<Uuid> {
        match self {
            Scope::Global => None,
            Scope::Category(id) => Some(*id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Category(id) => write!(f, "category:{}", id),
        }
    }
}

/// Item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Planned,
    InProgress,
    OnHold,
    Completed,
}

impl ItemStatus {
    /// Statuses shown on the priority board
    pub const ACTIVE: [ItemStatus; 3] = [ItemStatus::Planned, ItemStatus::InProgress, ItemStatus::OnHold];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Planned => "planned",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::OnHold => "on_hold",
            ItemStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(ItemStatus::Planned),
            "in_progress" => Some(ItemStatus::InProgress),
            "on_hold" => Some(ItemStatus::OnHold),
            "completed" => Some(ItemStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
