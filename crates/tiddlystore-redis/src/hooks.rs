//! Post-write notification hooks.
//!
//! Secondary indexes (tags, modifiers, policy principals) are not kept by
//! this crate. An [`IndexHook`] registered on the
//! [`TiddlerStore`](crate::TiddlerStore) sees every completed write and
//! delete and can maintain such an index itself.

use tiddlystore_types::Tiddler;

/// A completed write or delete.
#[derive(Debug, Clone, Copy)]
pub enum StoreEvent<'a> {
    /// A bag was created or replaced.
    BagPut {
        /// Bag name.
        name: &'a str,
    },
    /// A bag and its tiddlers were deleted.
    BagDeleted {
        /// Bag name.
        name: &'a str,
    },
    /// A recipe was created or replaced.
    RecipePut {
        /// Recipe name.
        name: &'a str,
    },
    /// A recipe was deleted.
    RecipeDeleted {
        /// Recipe name.
        name: &'a str,
    },
    /// A new tiddler revision was stored.
    TiddlerPut {
        /// The tiddler as written.
        tiddler: &'a Tiddler,
        /// The revision number it was stored under.
        revision: u64,
    },
    /// A tiddler and all its revisions were deleted.
    TiddlerDeleted {
        /// Owning bag.
        bag: &'a str,
        /// Title.
        title: &'a str,
    },
    /// A user was created or replaced.
    UserPut {
        /// User name.
        usersign: &'a str,
    },
    /// A user was deleted.
    UserDeleted {
        /// User name.
        usersign: &'a str,
    },
}

/// Receives a [`StoreEvent`] after each successful adapter operation.
///
/// Hooks run inline, in registration order, after the last store command
/// of the operation. They cannot fail the operation.
pub trait IndexHook: Send + Sync {
    /// Called once per completed operation.
    fn after_write(&self, event: &StoreEvent<'_>);
}
