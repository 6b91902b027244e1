//! Key naming scheme.
//!
//! Every key is a kind prefix followed by escaped identifier parts and, for
//! revision records, a decimal revision number, all joined with `:`.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `bag:{name}` | JSON | Bag with embedded policy |
//! | `bag-tiddlers:{name}` | Set | Titles with at least one revision in the bag |
//! | `recipe:{name}` | JSON | Recipe header with embedded policy |
//! | `recipe-bags:{name}` | List | Encoded recipe entries, in order |
//! | `tiddler:{bag}:{title}` | Integer | Current revision number |
//! | `revision:{bag}:{title}:{n}` | JSON | Revision record `n` |
//! | `user:{usersign}` | JSON | User with embedded policy |
//! | `bags`, `recipes`, `users`, `tiddlers` | Set | Master lists per kind |
//!
//! Inside a part, `%` is written as `%25` and `:` as `%3A`, so a part never
//! contains the separator and distinct tuples always give distinct keys.
//! Empty parts are rejected.

use crate::error::StoreError;

/// Separator between key segments.
pub const SEPARATOR: char = ':';

/// The namespace a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// `bag:{name}`
    Bag,
    /// `bag-tiddlers:{name}`
    BagTiddlers,
    /// `recipe:{name}`
    Recipe,
    /// `recipe-bags:{name}`
    RecipeBags,
    /// `tiddler:{bag}:{title}` (current revision pointer)
    Tiddler,
    /// `revision:{bag}:{title}:{n}`
    Revision,
    /// `user:{usersign}`
    User,
    /// `bags`
    BagList,
    /// `recipes`
    RecipeList,
    /// `users`
    UserList,
    /// `tiddlers` (members are escaped `{bag}:{title}` pairs)
    TiddlerList,
}

impl KeyKind {
    const ALL: [Self; 11] = [
        Self::Bag,
        Self::BagTiddlers,
        Self::Recipe,
        Self::RecipeBags,
        Self::Tiddler,
        Self::Revision,
        Self::User,
        Self::BagList,
        Self::RecipeList,
        Self::UserList,
        Self::TiddlerList,
    ];

    /// Leading key segment for this kind.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Bag => "bag",
            Self::BagTiddlers => "bag-tiddlers",
            Self::Recipe => "recipe",
            Self::RecipeBags => "recipe-bags",
            Self::Tiddler => "tiddler",
            Self::Revision => "revision",
            Self::User => "user",
            Self::BagList => "bags",
            Self::RecipeList => "recipes",
            Self::UserList => "users",
            Self::TiddlerList => "tiddlers",
        }
    }

    /// Number of identifier parts a key of this kind carries.
    pub const fn arity(self) -> usize {
        match self {
            Self::BagList | Self::RecipeList | Self::UserList | Self::TiddlerList => 0,
            Self::Bag | Self::BagTiddlers | Self::Recipe | Self::RecipeBags | Self::User => 1,
            Self::Tiddler | Self::Revision => 2,
        }
    }

    /// Whether keys of this kind end with a revision number.
    pub const fn has_revision(self) -> bool {
        matches!(self, Self::Revision)
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }
}

/// A key split back into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    /// Namespace of the key.
    pub kind: KeyKind,
    /// Unescaped identifier parts.
    pub parts: Vec<String>,
    /// Revision number, for revision records.
    pub revision: Option<u64>,
}

/// Build the key for `kind` from identifier parts and an optional revision.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] if the part count or revision
/// presence does not match `kind`, a part is empty, or the revision is 0.
pub fn key_for(kind: KeyKind, parts: &[&str], revision: Option<u64>) -> Result<String, StoreError> {
    if parts.len() != kind.arity() {
        return Err(StoreError::InvalidIdentifier(format!(
            "{} keys take {} identifier parts, got {}",
            kind.prefix(),
            kind.arity(),
            parts.len()
        )));
    }

    let mut key = String::from(kind.prefix());
    for part in parts {
        key.push(SEPARATOR);
        key.push_str(&escape(part)?);
    }

    match (kind.has_revision(), revision) {
        (true, Some(0)) => Err(StoreError::InvalidIdentifier(
            "revision numbers start at 1".to_owned(),
        )),
        (true, Some(n)) => {
            key.push(SEPARATOR);
            key.push_str(&n.to_string());
            Ok(key)
        }
        (false, None) => Ok(key),
        (true, None) => Err(StoreError::InvalidIdentifier(format!(
            "{} keys need a revision number",
            kind.prefix()
        ))),
        (false, Some(_)) => Err(StoreError::InvalidIdentifier(format!(
            "{} keys take no revision number",
            kind.prefix()
        ))),
    }
}

/// Split a key produced by [`key_for`] back into its components.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] if `key` does not follow the
/// scheme.
pub fn parse(key: &str) -> Result<ParsedKey, StoreError> {
    let mut segments = key.split(SEPARATOR);
    let prefix = segments.next().unwrap_or_default();
    let kind = KeyKind::from_prefix(prefix)
        .ok_or_else(|| StoreError::InvalidIdentifier(format!("unknown key prefix in `{key}`")))?;

    let rest: Vec<&str> = segments.collect();
    let (id_segments, revision) = if kind.has_revision() {
        let (last, ids) = rest
            .split_last()
            .ok_or_else(|| StoreError::InvalidIdentifier(format!("missing revision in `{key}`")))?;
        let n: u64 = last.parse().map_err(|e| {
            StoreError::InvalidIdentifier(format!("bad revision `{last}` in `{key}`: {e}"))
        })?;
        if n == 0 {
            return Err(StoreError::InvalidIdentifier(format!(
                "revision 0 in `{key}`"
            )));
        }
        (ids, Some(n))
    } else {
        (rest.as_slice(), None)
    };

    if id_segments.len() != kind.arity() {
        return Err(StoreError::InvalidIdentifier(format!(
            "`{key}` has {} identifier parts, expected {}",
            id_segments.len(),
            kind.arity()
        )));
    }

    let parts = id_segments
        .iter()
        .map(|segment| unescape(segment))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedKey {
        kind,
        parts,
        revision,
    })
}

/// Check that `part` can be used as an identifier.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] if `part` is empty.
pub fn validate(part: &str) -> Result<(), StoreError> {
    if part.is_empty() {
        return Err(StoreError::InvalidIdentifier(
            "identifier parts must not be empty".to_owned(),
        ));
    }
    Ok(())
}

/// Escape one identifier part so it contains no separator.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] if `part` is empty.
pub fn escape(part: &str) -> Result<String, StoreError> {
    validate(part)?;
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            SEPARATOR => escaped.push_str("%3A"),
            other => escaped.push(other),
        }
    }
    Ok(escaped)
}

/// Reverse [`escape`].
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] on an empty segment, a raw
/// separator, or an unknown escape sequence.
pub fn unescape(segment: &str) -> Result<String, StoreError> {
    if segment.is_empty() {
        return Err(StoreError::InvalidIdentifier("empty key segment".to_owned()));
    }
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(pos) = rest.find(['%', SEPARATOR]) {
        let (plain, tail) = rest.split_at(pos);
        out.push_str(plain);
        if tail.starts_with("%25") {
            out.push('%');
        } else if tail.starts_with("%3A") {
            out.push(SEPARATOR);
        } else {
            return Err(StoreError::InvalidIdentifier(format!(
                "bad escape in key segment `{segment}`"
            )));
        }
        rest = tail.get(3..).unwrap_or_default();
    }
    out.push_str(rest);
    Ok(out)
}

// =========================================================================
// Typed helpers
// =========================================================================

/// `bag:{name}`
pub fn bag(name: &str) -> Result<String, StoreError> {
    key_for(KeyKind::Bag, &[name], None)
}

/// `bag-tiddlers:{name}`
pub fn bag_tiddlers(name: &str) -> Result<String, StoreError> {
    key_for(KeyKind::BagTiddlers, &[name], None)
}

/// `recipe:{name}`
pub fn recipe(name: &str) -> Result<String, StoreError> {
    key_for(KeyKind::Recipe, &[name], None)
}

/// `recipe-bags:{name}`
pub fn recipe_bags(name: &str) -> Result<String, StoreError> {
    key_for(KeyKind::RecipeBags, &[name], None)
}

/// `user:{usersign}`
pub fn user(usersign: &str) -> Result<String, StoreError> {
    key_for(KeyKind::User, &[usersign], None)
}

/// Master list key for a list kind.
pub const fn master(kind: KeyKind) -> &'static str {
    kind.prefix()
}

/// Identity of a tiddler: its bag and title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TiddlerKey<'a> {
    /// Owning bag.
    pub bag: &'a str,
    /// Title within the bag.
    pub title: &'a str,
}

impl<'a> TiddlerKey<'a> {
    /// Identity from bag and title.
    pub const fn new(bag: &'a str, title: &'a str) -> Self {
        Self { bag, title }
    }

    /// Current revision pointer key.
    pub fn current(&self) -> Result<String, StoreError> {
        key_for(KeyKind::Tiddler, &[self.bag, self.title], None)
    }

    /// Key of revision record `n`.
    pub fn revision(&self, n: u64) -> Result<String, StoreError> {
        key_for(KeyKind::Revision, &[self.bag, self.title], Some(n))
    }

    /// Member string used in the `tiddlers` master list.
    pub fn member(&self) -> Result<String, StoreError> {
        Ok(format!("{}{SEPARATOR}{}", escape(self.bag)?, escape(self.title)?))
    }
}

impl core::fmt::Display for TiddlerKey<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.bag, self.title)
    }
}

/// Split a `tiddlers` master list member back into `(bag, title)`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] if the member is malformed.
pub fn split_member(member: &str) -> Result<(String, String), StoreError> {
    let (bag, title) = member.split_once(SEPARATOR).ok_or_else(|| {
        StoreError::InvalidIdentifier(format!("malformed tiddler list member `{member}`"))
    })?;
    Ok((unescape(bag)?, unescape(title)?))
}
