//! Shared entity definitions for the TiddlyStore key-value backend.
//!
//! These are the in-memory shapes the hosting application works with. The
//! storage crate maps them onto flat key/value operations; nothing here
//! performs I/O.
//!
//! # Modules
//!
//! - [`enums`] -- Entity kinds and policy constraint names
//! - [`structs`] -- Bags, recipes, tiddlers, revisions, users, and policies

pub mod enums;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Constraint, EntityKind};
pub use structs::{Bag, Policy, Recipe, RecipeEntry, Revision, Tiddler, User};
