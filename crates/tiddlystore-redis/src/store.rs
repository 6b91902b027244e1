//! The storage contract used by the hosting application.
//!
//! [`TiddlerStore`] exposes get/put/delete/list per entity and composes the
//! key scheme, codec, revision chains, and indexes underneath. No
//! multi-key operation is atomic; each one orders its steps so that a
//! concurrent reader sees at worst a short-lived gap, never a dangling
//! reference.
//!
//! # Write ordering
//!
//! ```text
//! put_tiddler:    revision record -> pointer -> bag membership -> `tiddlers`
//! delete_tiddler: bag membership -> `tiddlers` -> pointer -> revision records
//! delete_bag:     `bags` -> bag value -> each indexed tiddler -> membership set
//! delete_recipe:  `recipes` -> recipe value -> definition list
//! delete_user:    `users` -> user value
//! ```
//!
//! A reader racing `put_tiddler` can fetch the new revision before the bag
//! listing shows it. A reader racing `delete_tiddler` may still fetch the
//! tiddler by identity after it left the listing, but never finds a listed
//! title whose content is gone.

use std::sync::Arc;

use tiddlystore_types::{Bag, EntityKind, Policy, Recipe, Revision, Tiddler, User};

use crate::backend::KvBackend;
use crate::codec::{self, Encodable, RecipeRecord};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::hooks::{IndexHook, StoreEvent};
use crate::index::ContainerIndex;
use crate::keys::{self, KeyKind, TiddlerKey};
use crate::redis::RedisPool;
use crate::revisions::RevisionStore;

/// The entity whose embedded policy [`TiddlerStore::get_policy`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyHolder<'a> {
    /// A bag, by name.
    Bag(&'a str),
    /// A recipe, by name.
    Recipe(&'a str),
    /// A user, by usersign.
    User(&'a str),
}

/// Storage backend for bags, recipes, tiddlers, and users.
///
/// Cheap to clone; clones share the backend connection and hooks.
#[derive(Clone)]
pub struct TiddlerStore {
    kv: KvBackend,
    hooks: Vec<Arc<dyn IndexHook>>,
}

impl TiddlerStore {
    /// Build a store over an already connected backend.
    pub fn new(kv: impl Into<KvBackend>) -> Self {
        Self {
            kv: kv.into(),
            hooks: Vec::new(),
        }
    }

    /// Connect to Redis and build a store over it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL is invalid or the connection fails.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = RedisPool::connect(config).await?;
        Ok(Self::new(pool))
    }

    /// Register a hook called after every completed write or delete.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn IndexHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    const fn revisions(&self) -> RevisionStore<'_> {
        RevisionStore::new(&self.kv)
    }

    const fn index(&self) -> ContainerIndex<'_> {
        ContainerIndex::new(&self.kv)
    }

    fn notify(&self, event: &StoreEvent<'_>) {
        for hook in &self.hooks {
            hook.after_write(event);
        }
    }

    /// Read and decode the value at `key`, or report `kind`/`id` missing.
    async fn read<E: Encodable>(
        &self,
        key: &str,
        kind: EntityKind,
        id: &str,
    ) -> Result<E, StoreError> {
        let raw = self
            .kv
            .get(key)
            .await?
            .ok_or_else(|| StoreError::not_found(kind, id))?;
        codec::decode(&raw)
    }

    async fn require(&self, key: &str, kind: EntityKind, id: &str) -> Result<(), StoreError> {
        if self.kv.exists(key).await? {
            Ok(())
        } else {
            Err(StoreError::not_found(kind, id))
        }
    }

    // =========================================================================
    // Bags
    // =========================================================================

    /// Create or replace a bag, including its policy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if the name is empty.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn put_bag(&self, bag: &Bag) -> Result<(), StoreError> {
        let key = keys::bag(&bag.name)?;
        self.kv.set(&key, &codec::encode(bag)?).await?;
        self.index().enlist(KeyKind::BagList, &bag.name).await?;

        tracing::debug!(bag = bag.name.as_str(), "Stored bag");
        self.notify(&StoreEvent::BagPut { name: &bag.name });
        Ok(())
    }

    /// Load a bag with its policy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the bag does not exist,
    /// [`StoreError::Decode`] or [`StoreError::UnsupportedFieldType`] if the
    /// stored value is corrupt, and [`StoreError::StoreUnavailable`] if the
    /// store cannot be reached.
    pub async fn get_bag(&self, name: &str) -> Result<Bag, StoreError> {
        self.read(&keys::bag(name)?, EntityKind::Bag, name).await
    }

    /// Whether a bag exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if the name is empty.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn bag_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.kv.exists(&keys::bag(name)?).await
    }

    /// Delete a bag and every tiddler indexed under it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the bag does not exist.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached;
    /// tiddlers deleted before the failure stay deleted.
    pub async fn delete_bag(&self, name: &str) -> Result<(), StoreError> {
        let key = keys::bag(name)?;
        self.require(&key, EntityKind::Bag, name).await?;

        let index = self.index();
        index.delist(KeyKind::BagList, name).await?;
        self.kv.delete(&key).await?;

        let titles = index.get_members(name).await?;
        for title in &titles {
            match self.delete_tiddler(name, title).await {
                Ok(()) => {}
                Err(StoreError::NotFound { .. }) => {
                    tracing::warn!(
                        bag = name,
                        title = title.as_str(),
                        "Indexed tiddler already gone"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        index.clear_members(name).await?;

        tracing::debug!(bag = name, tiddlers = titles.len(), "Deleted bag");
        self.notify(&StoreEvent::BagDeleted { name });
        Ok(())
    }

    /// Names of all bags, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn list_bags(&self) -> Result<Vec<String>, StoreError> {
        self.index().listed(KeyKind::BagList).await
    }

    /// Titles of the tiddlers in a bag, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the bag does not exist.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn list_bag_tiddlers(&self, bag: &str) -> Result<Vec<String>, StoreError> {
        self.require(&keys::bag(bag)?, EntityKind::Bag, bag).await?;
        self.index().get_members(bag).await
    }

    // =========================================================================
    // Recipes
    // =========================================================================

    /// Create or replace a recipe; its entry list is replaced wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if the name is empty.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn put_recipe(&self, recipe: &Recipe) -> Result<(), StoreError> {
        let key = keys::recipe(&recipe.name)?;
        let index = self.index();

        self.kv
            .set(&key, &codec::encode(&RecipeRecord::of(recipe))?)
            .await?;
        index.replace_all(&recipe.name, &recipe.entries).await?;
        index.enlist(KeyKind::RecipeList, &recipe.name).await?;

        tracing::debug!(
            recipe = recipe.name.as_str(),
            entries = recipe.entries.len(),
            "Stored recipe"
        );
        self.notify(&StoreEvent::RecipePut { name: &recipe.name });
        Ok(())
    }

    /// Load a recipe with its policy and entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the recipe does not exist,
    /// [`StoreError::Decode`] if the header or an entry is corrupt, and
    /// [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn get_recipe(&self, name: &str) -> Result<Recipe, StoreError> {
        let record: RecipeRecord = self
            .read(&keys::recipe(name)?, EntityKind::Recipe, name)
            .await?;
        let entries = self.index().get_entries(name).await?;
        Ok(record.into_recipe(entries))
    }

    /// Delete a recipe.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the recipe does not exist.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn delete_recipe(&self, name: &str) -> Result<(), StoreError> {
        let key = keys::recipe(name)?;
        self.require(&key, EntityKind::Recipe, name).await?;

        let index = self.index();
        index.delist(KeyKind::RecipeList, name).await?;
        self.kv.delete(&key).await?;
        index.clear_entries(name).await?;

        tracing::debug!(recipe = name, "Deleted recipe");
        self.notify(&StoreEvent::RecipeDeleted { name });
        Ok(())
    }

    /// Names of all recipes, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn list_recipes(&self) -> Result<Vec<String>, StoreError> {
        self.index().listed(KeyKind::RecipeList).await
    }

    // =========================================================================
    // Tiddlers
    // =========================================================================

    /// Store the tiddler's content as a new revision. Returns its number.
    ///
    /// The bag must exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the bag does not exist,
    /// [`StoreError::InvalidIdentifier`] if the bag or title is empty,
    /// [`StoreError::Decode`] if the stored pointer is corrupt, and
    /// [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn put_tiddler(&self, tiddler: &Tiddler) -> Result<u64, StoreError> {
        let id = TiddlerKey::new(&tiddler.bag, &tiddler.title);
        let pointer = id.current()?;
        self.require(&keys::bag(&tiddler.bag)?, EntityKind::Bag, &tiddler.bag)
            .await?;

        let revision = self
            .revisions()
            .put_revision(id, &tiddler.snapshot())
            .await?;

        let index = self.index();
        index.add_member(&tiddler.bag, &tiddler.title).await?;
        index.enlist(KeyKind::TiddlerList, &id.member()?).await?;

        tracing::debug!(
            bag = tiddler.bag.as_str(),
            title = tiddler.title.as_str(),
            revision,
            key = pointer.as_str(),
            "Stored tiddler revision"
        );
        self.notify(&StoreEvent::TiddlerPut { tiddler, revision });
        Ok(revision)
    }

    /// Load the current revision of a tiddler.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the tiddler has no current revision,
    /// [`StoreError::InvalidIdentifier`] if the bag or title is empty, and
    /// [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn get_tiddler(&self, bag: &str, title: &str) -> Result<Tiddler, StoreError> {
        let id = TiddlerKey::new(bag, title);
        let revisions = self.revisions();
        let (n, current) = revisions.get_current(id).await?;
        let first = if n == 1 {
            current.clone()
        } else {
            revisions.get_revision(id, 1).await?
        };
        Ok(Tiddler::from_revisions(bag, title, n, current, &first))
    }

    /// Load a specific revision of a tiddler.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the tiddler does not exist or
    /// `revision` is outside `1..=current`. Returns
    /// [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn get_tiddler_revision(
        &self,
        bag: &str,
        title: &str,
        revision: u64,
    ) -> Result<Tiddler, StoreError> {
        let id = TiddlerKey::new(bag, title);
        let revisions = self.revisions();
        let content = revisions.get_revision(id, revision).await?;
        let first = if revision == 1 {
            content.clone()
        } else {
            revisions.get_revision(id, 1).await?
        };
        Ok(Tiddler::from_revisions(bag, title, revision, content, &first))
    }

    /// Current revision number and content of a tiddler.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the tiddler does not exist.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn get_current_revision(
        &self,
        bag: &str,
        title: &str,
    ) -> Result<(u64, Revision), StoreError> {
        self.revisions()
            .get_current(TiddlerKey::new(bag, title))
            .await
    }

    /// Whether a tiddler has a current revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if the bag or title is empty.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn tiddler_exists(&self, bag: &str, title: &str) -> Result<bool, StoreError> {
        self.kv
            .exists(&TiddlerKey::new(bag, title).current()?)
            .await
    }

    /// Revision numbers of a tiddler, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the tiddler does not exist,
    /// [`StoreError::Decode`] if its pointer names a missing record, and
    /// [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn list_tiddler_revisions(
        &self,
        bag: &str,
        title: &str,
    ) -> Result<Vec<u64>, StoreError> {
        self.revisions()
            .list_revisions(TiddlerKey::new(bag, title))
            .await
    }

    /// Delete a tiddler and all its revisions.
    ///
    /// Leaves the bag listing and the `tiddlers` list first. A second
    /// delete of the same tiddler passes both listing steps and reports
    /// `NotFound` from the revisions, so retrying an interrupted delete
    /// always clears the listings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the tiddler does not exist.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn delete_tiddler(&self, bag: &str, title: &str) -> Result<(), StoreError> {
        let id = TiddlerKey::new(bag, title);
        let member = id.member()?;
        let index = self.index();

        index.remove_member(bag, title).await?;
        index.delist(KeyKind::TiddlerList, &member).await?;
        self.revisions().delete_all(id).await?;

        tracing::debug!(bag, title, "Deleted tiddler");
        self.notify(&StoreEvent::TiddlerDeleted { bag, title });
        Ok(())
    }

    /// Every stored tiddler as `(bag, title)`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if a listed member is
    /// malformed. Returns [`StoreError::StoreUnavailable`] if the store cannot
    /// be reached.
    pub async fn list_tiddlers(&self) -> Result<Vec<(String, String)>, StoreError> {
        let members = self.index().listed(KeyKind::TiddlerList).await?;
        let mut tiddlers = members
            .iter()
            .map(|member| keys::split_member(member))
            .collect::<Result<Vec<_>, _>>()?;
        tiddlers.sort_unstable();
        Ok(tiddlers)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create or replace a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if the usersign is empty.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        let key = keys::user(&user.usersign)?;
        self.kv.set(&key, &codec::encode(user)?).await?;
        self.index().enlist(KeyKind::UserList, &user.usersign).await?;

        tracing::debug!(user = user.usersign.as_str(), "Stored user");
        self.notify(&StoreEvent::UserPut {
            usersign: &user.usersign,
        });
        Ok(())
    }

    /// Load a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the user does not exist.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn get_user(&self, usersign: &str) -> Result<User, StoreError> {
        self.read(&keys::user(usersign)?, EntityKind::User, usersign)
            .await
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the user does not exist.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn delete_user(&self, usersign: &str) -> Result<(), StoreError> {
        let key = keys::user(usersign)?;
        self.require(&key, EntityKind::User, usersign).await?;

        self.index().delist(KeyKind::UserList, usersign).await?;
        self.kv.delete(&key).await?;

        tracing::debug!(user = usersign, "Deleted user");
        self.notify(&StoreEvent::UserDeleted { usersign });
        Ok(())
    }

    /// Names of all users, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn list_users(&self) -> Result<Vec<String>, StoreError> {
        self.index().listed(KeyKind::UserList).await
    }

    // =========================================================================
    // Policies
    // =========================================================================

    /// The policy embedded in a bag, recipe, or user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the holder does not exist.
    /// Returns [`StoreError::StoreUnavailable`] if the store cannot be reached.
    pub async fn get_policy(&self, holder: PolicyHolder<'_>) -> Result<Policy, StoreError> {
        match holder {
            PolicyHolder::Bag(name) => Ok(self.get_bag(name).await?.policy),
            PolicyHolder::Recipe(name) => {
                let record: RecipeRecord = self
                    .read(&keys::recipe(name)?, EntityKind::Recipe, name)
                    .await?;
                Ok(record.policy)
            }
            PolicyHolder::User(usersign) => Ok(self.get_user(usersign).await?.policy),
        }
    }
}
