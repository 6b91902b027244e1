//! Enumeration types for the TiddlyStore content model.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// The kind of a stored entity.
///
/// Used to label encoded values, to name the missing thing in
/// `NotFound` errors, and to namespace keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A named container of tiddlers.
    Bag,
    /// A named ordered composition of bags.
    Recipe,
    /// A titled content unit scoped to a bag.
    Tiddler,
    /// One immutable numbered snapshot of a tiddler.
    Revision,
    /// An account with credentials, roles, and a profile policy.
    User,
    /// A permission-to-principal mapping.
    Policy,
}

impl EntityKind {
    /// Stable lowercase name, as written into encoded values.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bag => "bag",
            Self::Recipe => "recipe",
            Self::Tiddler => "tiddler",
            Self::Revision => "revision",
            Self::User => "user",
            Self::Policy => "policy",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Policy constraints
// ---------------------------------------------------------------------------

/// A permission named by a [`Policy`](crate::Policy).
///
/// The storage layer never evaluates these; it only keeps the principal
/// lists intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// View the container or its contents.
    Read,
    /// Modify existing contents.
    Write,
    /// Add new contents.
    Create,
    /// Remove contents.
    Delete,
    /// Change the container itself, including its policy.
    Manage,
    /// Accept incoming content without moderation.
    Accept,
}

impl Constraint {
    /// Every constraint, in the order they are stored.
    pub const ALL: [Self; 6] = [
        Self::Read,
        Self::Write,
        Self::Create,
        Self::Delete,
        Self::Manage,
        Self::Accept,
    ];

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Manage => "manage",
            Self::Accept => "accept",
        }
    }
}

impl core::fmt::Display for Constraint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_serializes_as_display_name() {
        for kind in [
            EntityKind::Bag,
            EntityKind::Recipe,
            EntityKind::Tiddler,
            EntityKind::Revision,
            EntityKind::User,
            EntityKind::Policy,
        ] {
            let json = serde_json::to_string(&kind).unwrap_or_default();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn constraint_names_are_unique() {
        let mut names: Vec<&str> = Constraint::ALL.iter().map(|c| c.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Constraint::ALL.len());
    }
}
