//! Core entity structs for the TiddlyStore content model.
//!
//! Covers `Policy`, `Bag`, `Recipe`, `Tiddler` with its `Revision`
//! snapshots, and `User`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::enums::Constraint;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Access policy attached to a bag, recipe, or user.
///
/// Each constraint maps to an ordered list of principals (user names or
/// `R:ROLE` style group names). The list order is preserved as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// The principal that owns the container, if any.
    pub owner: Option<String>,
    /// Principals allowed to read.
    pub read: Vec<String>,
    /// Principals allowed to write.
    pub write: Vec<String>,
    /// Principals allowed to create.
    pub create: Vec<String>,
    /// Principals allowed to delete.
    pub delete: Vec<String>,
    /// Principals allowed to manage.
    pub manage: Vec<String>,
    /// Principals whose content is accepted.
    pub accept: Vec<String>,
}

impl Policy {
    /// Principals listed for `constraint`.
    pub fn principals(&self, constraint: Constraint) -> &[String] {
        match constraint {
            Constraint::Read => &self.read,
            Constraint::Write => &self.write,
            Constraint::Create => &self.create,
            Constraint::Delete => &self.delete,
            Constraint::Manage => &self.manage,
            Constraint::Accept => &self.accept,
        }
    }

    /// Mutable principal list for `constraint`.
    pub const fn principals_mut(&mut self, constraint: Constraint) -> &mut Vec<String> {
        match constraint {
            Constraint::Read => &mut self.read,
            Constraint::Write => &mut self.write,
            Constraint::Create => &mut self.create,
            Constraint::Delete => &mut self.delete,
            Constraint::Manage => &mut self.manage,
            Constraint::Accept => &mut self.accept,
        }
    }
}

// ---------------------------------------------------------------------------
// Bag
// ---------------------------------------------------------------------------

/// A named container of tiddlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    /// Unique bag name.
    pub name: String,
    /// Free-form description.
    pub desc: String,
    /// Access policy for the bag and its tiddlers.
    pub policy: Policy,
}

impl Bag {
    /// Create an empty bag with a default policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// One line of a recipe: a bag reference with an optional filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeEntry {
    /// Name of the referenced bag. Not checked for existence.
    pub bag: String,
    /// Filter expression applied to the bag's tiddlers, if any.
    pub filter: Option<String>,
}

impl RecipeEntry {
    /// A bag reference without a filter.
    pub fn bag(bag: impl Into<String>) -> Self {
        Self {
            bag: bag.into(),
            filter: None,
        }
    }

    /// A bag reference with a filter expression.
    pub fn filtered(bag: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            bag: bag.into(),
            filter: Some(filter.into()),
        }
    }
}

/// A named ordered composition of bags.
///
/// The entry list is opaque ordered data: duplicates are kept and
/// referenced bags need not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipe {
    /// Unique recipe name.
    pub name: String,
    /// Free-form description.
    pub desc: String,
    /// Access policy for the recipe.
    pub policy: Policy,
    /// Ordered bag references.
    pub entries: Vec<RecipeEntry>,
}

impl Recipe {
    /// Create an empty recipe with a default policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Replace the entry list.
    #[must_use]
    pub fn with_entries(mut self, entries: Vec<RecipeEntry>) -> Self {
        self.entries = entries;
        self
    }
}

// ---------------------------------------------------------------------------
// Tiddler & Revision
// ---------------------------------------------------------------------------

/// Immutable content snapshot stored for one revision of a tiddler.
///
/// Timestamps are Unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Body text.
    pub text: String,
    /// MIME type of the body, when not plain wikitext.
    pub content_type: Option<String>,
    /// Tags in the order given.
    pub tags: Vec<String>,
    /// Arbitrary extended fields.
    pub fields: BTreeMap<String, String>,
    /// Who wrote this revision.
    pub modifier: Option<String>,
    /// When this revision was written.
    pub modified: i64,
}

/// A titled content unit scoped to a bag.
///
/// `bag` and `title` identify the tiddler and never change. The remaining
/// content fields mirror the current [`Revision`]; `creator` and `created`
/// come from the first revision when read back from a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tiddler {
    /// Owning bag name.
    pub bag: String,
    /// Title, unique within the bag.
    pub title: String,
    /// Current revision number, or 0 for a tiddler never stored.
    pub revision: u64,
    /// Body text.
    pub text: String,
    /// MIME type of the body.
    pub content_type: Option<String>,
    /// Tags in the order given.
    pub tags: Vec<String>,
    /// Arbitrary extended fields.
    pub fields: BTreeMap<String, String>,
    /// Author of the current revision.
    pub modifier: Option<String>,
    /// Timestamp of the current revision (Unix seconds).
    pub modified: i64,
    /// Author of the first revision.
    pub creator: Option<String>,
    /// Timestamp of the first revision (Unix seconds).
    pub created: i64,
}

impl Tiddler {
    /// Create an empty, unsaved tiddler.
    pub fn new(bag: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            bag: bag.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the body text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Stamp the tiddler as modified by `modifier` now.
    pub fn touch(&mut self, modifier: impl Into<String>) {
        self.modifier = Some(modifier.into());
        self.modified = Utc::now().timestamp();
    }

    /// Content snapshot for a new revision.
    pub fn snapshot(&self) -> Revision {
        Revision {
            text: self.text.clone(),
            content_type: self.content_type.clone(),
            tags: self.tags.clone(),
            fields: self.fields.clone(),
            modifier: self.modifier.clone(),
            modified: self.modified,
        }
    }

    /// Rebuild a tiddler from its stored revisions.
    ///
    /// `current` supplies the content; `first` supplies the creation
    /// metadata.
    pub fn from_revisions(
        bag: impl Into<String>,
        title: impl Into<String>,
        revision: u64,
        current: Revision,
        first: &Revision,
    ) -> Self {
        Self {
            bag: bag.into(),
            title: title.into(),
            revision,
            text: current.text,
            content_type: current.content_type,
            tags: current.tags,
            fields: current.fields,
            modifier: current.modifier,
            modified: current.modified,
            creator: first.modifier.clone(),
            created: first.modified,
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An account known to the hosting application.
///
/// The credential is stored as given; hashing and checking it belongs to
/// the authentication layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user name.
    pub usersign: String,
    /// Opaque credential (typically a password hash).
    pub credential: Option<String>,
    /// Role names.
    pub roles: BTreeSet<String>,
    /// Free-form profile note.
    pub note: Option<String>,
    /// Policy guarding the user's own profile.
    pub policy: Policy,
}

impl User {
    /// Create a user with no credential, roles, or note.
    pub fn new(usersign: impl Into<String>) -> Self {
        Self {
            usersign: usersign.into(),
            ..Self::default()
        }
    }

    /// Grant a role. Returns `false` if it was already held.
    pub fn add_role(&mut self, role: impl Into<String>) -> bool {
        self.roles.insert(role.into())
    }

    /// Whether the user holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
