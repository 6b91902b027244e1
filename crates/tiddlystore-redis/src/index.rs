//! Container membership and master lists.
//!
//! - `bag-tiddlers:{bag}` is an unordered set of titles.
//! - `recipe-bags:{recipe}` is an ordered list of encoded entries, replaced
//!   wholesale on every recipe write.
//! - `bags`, `recipes`, `users`, `tiddlers` are sets enumerating every
//!   stored identity of a kind, so listing never scans the keyspace.
//!
//! Removing something that is not a member is a no-op.

use tiddlystore_types::RecipeEntry;

use crate::backend::KvBackend;
use crate::codec;
use crate::error::StoreError;
use crate::keys::{self, KeyKind};

/// Index operations over a backend.
pub(crate) struct ContainerIndex<'a> {
    kv: &'a KvBackend,
}

impl<'a> ContainerIndex<'a> {
    pub(crate) const fn new(kv: &'a KvBackend) -> Self {
        Self { kv }
    }

    // =========================================================================
    // Bag membership
    // =========================================================================

    /// Record `title` as present in `bag`. Returns whether it was new.
    pub(crate) async fn add_member(&self, bag: &str, title: &str) -> Result<bool, StoreError> {
        keys::validate(title)?;
        self.kv.sadd(&keys::bag_tiddlers(bag)?, title).await
    }

    /// Forget `title` in `bag`. Returns whether it was present.
    pub(crate) async fn remove_member(&self, bag: &str, title: &str) -> Result<bool, StoreError> {
        self.kv.srem(&keys::bag_tiddlers(bag)?, title).await
    }

    /// Titles currently indexed under `bag`, sorted.
    pub(crate) async fn get_members(&self, bag: &str) -> Result<Vec<String>, StoreError> {
        let mut members = self.kv.smembers(&keys::bag_tiddlers(bag)?).await?;
        members.sort_unstable();
        Ok(members)
    }

    /// Drop the whole membership set of `bag`.
    pub(crate) async fn clear_members(&self, bag: &str) -> Result<(), StoreError> {
        self.kv.delete(&keys::bag_tiddlers(bag)?).await?;
        Ok(())
    }

    // =========================================================================
    // Recipe definitions
    // =========================================================================

    /// Replace the definition list of `recipe`.
    pub(crate) async fn replace_all(
        &self,
        recipe: &str,
        entries: &[RecipeEntry],
    ) -> Result<(), StoreError> {
        let encoded = entries
            .iter()
            .map(codec::encode_entry)
            .collect::<Result<Vec<_>, _>>()?;
        self.kv.replace_list(&keys::recipe_bags(recipe)?, &encoded).await
    }

    /// Definition list of `recipe`, in stored order.
    pub(crate) async fn get_entries(&self, recipe: &str) -> Result<Vec<RecipeEntry>, StoreError> {
        let raw = self.kv.lrange(&keys::recipe_bags(recipe)?).await?;
        raw.iter().map(|element| codec::decode_entry(element)).collect()
    }

    /// Drop the definition list of `recipe`.
    pub(crate) async fn clear_entries(&self, recipe: &str) -> Result<(), StoreError> {
        self.kv.delete(&keys::recipe_bags(recipe)?).await?;
        Ok(())
    }

    // =========================================================================
    // Master lists
    // =========================================================================

    /// Add `member` to the master list of `kind`. Returns whether it was new.
    pub(crate) async fn enlist(&self, kind: KeyKind, member: &str) -> Result<bool, StoreError> {
        self.kv.sadd(keys::master(kind), member).await
    }

    /// Remove `member` from the master list of `kind`.
    pub(crate) async fn delist(&self, kind: KeyKind, member: &str) -> Result<bool, StoreError> {
        self.kv.srem(keys::master(kind), member).await
    }

    /// Every member of the master list of `kind`, sorted.
    pub(crate) async fn listed(&self, kind: KeyKind) -> Result<Vec<String>, StoreError> {
        let mut members = self.kv.smembers(keys::master(kind)).await?;
        members.sort_unstable();
        Ok(members)
    }
}
