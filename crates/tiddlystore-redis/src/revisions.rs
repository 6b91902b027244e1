//! Tiddler revision chains.
//!
//! Each tiddler has immutable revision records `revision:{bag}:{title}:{n}`
//! numbered from 1, and a pointer `tiddler:{bag}:{title}` holding the
//! current number. Writers store the record before moving the pointer;
//! deleters drop the pointer before the records. Either way the pointer
//! never names a record that is absent.
//!
//! Two writers racing on the same tiddler can both allocate the same
//! number and the last record write wins. There is no compare-and-set
//! guard.

use tiddlystore_types::{EntityKind, Revision};

use crate::backend::KvBackend;
use crate::codec;
use crate::error::StoreError;
use crate::keys::TiddlerKey;

/// Revision operations over a backend.
pub(crate) struct RevisionStore<'a> {
    kv: &'a KvBackend,
}

impl<'a> RevisionStore<'a> {
    pub(crate) const fn new(kv: &'a KvBackend) -> Self {
        Self { kv }
    }

    /// Current revision number, or `None` if the tiddler has no pointer.
    pub(crate) async fn current(&self, tiddler: TiddlerKey<'_>) -> Result<Option<u64>, StoreError> {
        let raw = self.kv.get(&tiddler.current()?).await?;
        raw.as_deref().map(codec::decode_pointer).transpose()
    }

    /// Current revision number, confirmed against its record.
    ///
    /// Writers never move the pointer past a stored record, so a pointer
    /// whose record is absent is corrupt. The exception is a delete racing
    /// this read, which removes the pointer before the records; the pointer
    /// is read again to tell the two apart.
    async fn head(&self, tiddler: TiddlerKey<'_>) -> Result<u64, StoreError> {
        let current = self
            .current(tiddler)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Tiddler, tiddler.to_string()))?;
        if self.kv.exists(&tiddler.revision(current)?).await? {
            return Ok(current);
        }
        match self.current(tiddler).await? {
            None => Err(StoreError::not_found(EntityKind::Tiddler, tiddler.to_string())),
            Some(_) => Err(StoreError::decode(format!(
                "pointer for {tiddler} names missing revision {current}"
            ))),
        }
    }

    /// Append a revision and move the pointer to it. Returns its number.
    pub(crate) async fn put_revision(
        &self,
        tiddler: TiddlerKey<'_>,
        content: &Revision,
    ) -> Result<u64, StoreError> {
        let current = self.current(tiddler).await?.unwrap_or(0);
        let next = current.checked_add(1).ok_or_else(|| {
            StoreError::decode(format!("revision pointer for {tiddler} is at its maximum"))
        })?;

        let record = codec::encode(content)?;
        self.kv.set(&tiddler.revision(next)?, &record).await?;
        self.kv
            .set(&tiddler.current()?, &codec::encode_pointer(next))
            .await?;

        Ok(next)
    }

    /// The current revision number and its content.
    pub(crate) async fn get_current(
        &self,
        tiddler: TiddlerKey<'_>,
    ) -> Result<(u64, Revision), StoreError> {
        let current = self
            .current(tiddler)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Tiddler, tiddler.to_string()))?;
        let content = self.read_record(tiddler, current).await?;
        Ok((current, content))
    }

    /// Content of revision `n`.
    ///
    /// Only numbers up to the current pointer exist. Records left behind by
    /// an interrupted delete are never served, even once the tiddler is
    /// written again and numbering restarts.
    pub(crate) async fn get_revision(
        &self,
        tiddler: TiddlerKey<'_>,
        n: u64,
    ) -> Result<Revision, StoreError> {
        let current = self
            .current(tiddler)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Tiddler, tiddler.to_string()))?;
        if n == 0 || n > current {
            return Err(StoreError::not_found(
                EntityKind::Revision,
                format!("{tiddler}#{n}"),
            ));
        }
        self.read_record(tiddler, n).await
    }

    async fn read_record(&self, tiddler: TiddlerKey<'_>, n: u64) -> Result<Revision, StoreError> {
        let raw = self
            .kv
            .get(&tiddler.revision(n)?)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Revision, format!("{tiddler}#{n}")))?;
        codec::decode(&raw)
    }

    /// Stored revision numbers, ascending.
    pub(crate) async fn list_revisions(&self, tiddler: TiddlerKey<'_>) -> Result<Vec<u64>, StoreError> {
        let current = self.head(tiddler).await?;

        let mut revisions = Vec::new();
        for n in 1..current {
            if self.kv.exists(&tiddler.revision(n)?).await? {
                revisions.push(n);
            }
        }
        revisions.push(current);
        Ok(revisions)
    }

    /// Remove the pointer, then every revision record up to it.
    pub(crate) async fn delete_all(&self, tiddler: TiddlerKey<'_>) -> Result<(), StoreError> {
        let current = self.head(tiddler).await?;

        self.kv.delete(&tiddler.current()?).await?;
        for n in 1..=current {
            self.kv.delete(&tiddler.revision(n)?).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn content(text: &str) -> Revision {
        Revision {
            text: text.to_owned(),
            ..Revision::default()
        }
    }

    #[tokio::test]
    async fn revisions_are_numbered_from_one() {
        let kv = KvBackend::from(MemoryStore::new());
        let revisions = RevisionStore::new(&kv);
        let home = TiddlerKey::new("alpha", "Home");

        let mut numbers = Vec::new();
        for i in 0..5 {
            numbers.push(
                revisions
                    .put_revision(home, &content(&format!("v{i}")))
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(numbers, [1, 2, 3, 4, 5]);

        let (n, current) = revisions.get_current(home).await.unwrap();
        assert_eq!(n, 5);
        assert_eq!(current.text, "v4");
        assert_eq!(revisions.get_revision(home, 2).await.unwrap().text, "v1");
        assert_eq!(revisions.list_revisions(home).await.unwrap(), [1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn missing_tiddler_and_revision_are_not_found() {
        let kv = KvBackend::from(MemoryStore::new());
        let revisions = RevisionStore::new(&kv);
        let home = TiddlerKey::new("alpha", "Home");

        assert!(revisions.get_current(home).await.unwrap_err().is_not_found());
        assert!(revisions.list_revisions(home).await.unwrap_err().is_not_found());
        assert!(revisions.delete_all(home).await.unwrap_err().is_not_found());

        revisions.put_revision(home, &content("a")).await.unwrap();
        let err = revisions.get_revision(home, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Revision, .. }));
        assert!(revisions.get_revision(home, 0).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_all_removes_everything() {
        let store = MemoryStore::new();
        let kv = KvBackend::from(store.clone());
        let revisions = RevisionStore::new(&kv);
        let home = TiddlerKey::new("alpha", "Home");

        revisions.put_revision(home, &content("a")).await.unwrap();
        revisions.put_revision(home, &content("b")).await.unwrap();
        revisions.delete_all(home).await.unwrap();

        assert_eq!(store.key_count(), 0);
        assert_eq!(revisions.current(home).await.unwrap(), None);
        assert_eq!(revisions.put_revision(home, &content("c")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn interrupted_delete_never_leaves_dangling_pointer() {
        let store = MemoryStore::new();
        let kv = KvBackend::from(store.clone());
        let revisions = RevisionStore::new(&kv);
        let home = TiddlerKey::new("alpha", "Home");

        revisions.put_revision(home, &content("a")).await.unwrap();
        revisions.put_revision(home, &content("b")).await.unwrap();

        // Pointer read, head check, and pointer delete succeed, then the
        // store drops.
        store.fail_after(3);
        let err = revisions.delete_all(home).await.unwrap_err();
        assert!(matches!(err, StoreError::StoreUnavailable(_)));
        store.set_offline(false);

        assert!(revisions.get_current(home).await.unwrap_err().is_not_found());
        assert_eq!(store.keys(), ["revision:alpha:Home:1", "revision:alpha:Home:2"]);
    }

    #[tokio::test]
    async fn interrupted_put_keeps_previous_pointer() {
        let store = MemoryStore::new();
        let kv = KvBackend::from(store.clone());
        let revisions = RevisionStore::new(&kv);
        let home = TiddlerKey::new("alpha", "Home");

        revisions.put_revision(home, &content("a")).await.unwrap();

        // Pointer read and record write succeed, pointer update fails.
        store.fail_after(2);
        assert!(revisions.put_revision(home, &content("b")).await.is_err());
        store.set_offline(false);

        let (n, current) = revisions.get_current(home).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(current.text, "a");
    }

    #[tokio::test]
    async fn corrupt_pointer_is_decode_error() {
        let store = MemoryStore::new();
        let kv = KvBackend::from(store.clone());
        let revisions = RevisionStore::new(&kv);
        store.set("tiddler:alpha:Home", "many").unwrap();

        let err = revisions
            .get_current(TiddlerKey::new("alpha", "Home"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn leftover_records_are_not_served_after_recreate() {
        let store = MemoryStore::new();
        let kv = KvBackend::from(store.clone());
        let revisions = RevisionStore::new(&kv);
        let home = TiddlerKey::new("alpha", "Home");

        for text in ["one", "two", "three"] {
            revisions.put_revision(home, &content(text)).await.unwrap();
        }
        store.fail_after(3);
        assert!(revisions.delete_all(home).await.is_err());
        store.set_offline(false);

        let err = revisions.get_revision(home, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Tiddler, .. }));

        assert_eq!(revisions.put_revision(home, &content("fresh")).await.unwrap(), 1);
        let err = revisions.get_revision(home, 3).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Revision, .. }));
        assert_eq!(revisions.get_revision(home, 1).await.unwrap().text, "fresh");
        assert_eq!(revisions.list_revisions(home).await.unwrap(), [1]);
    }

    #[tokio::test]
    async fn pointer_past_its_record_is_decode_error() {
        let store = MemoryStore::new();
        let kv = KvBackend::from(store.clone());
        let revisions = RevisionStore::new(&kv);
        let home = TiddlerKey::new("alpha", "Home");

        revisions.put_revision(home, &content("a")).await.unwrap();
        store.set("tiddler:alpha:Home", "18446744073709551615").unwrap();

        let err = revisions.list_revisions(home).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
        let err = revisions.delete_all(home).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
        assert!(store.exists("revision:alpha:Home:1").unwrap());
    }

    #[tokio::test]
    async fn exhausted_pointer_is_decode_error() {
        let store = MemoryStore::new();
        let kv = KvBackend::from(store.clone());
        let revisions = RevisionStore::new(&kv);
        let home = TiddlerKey::new("alpha", "Home");
        store.set("tiddler:alpha:Home", "18446744073709551615").unwrap();

        let err = revisions.put_revision(home, &content("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
        assert_eq!(store.keys(), ["tiddler:alpha:Home"]);
    }
}
