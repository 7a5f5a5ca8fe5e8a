//! Deduplication of harvested book records.
//!
//! Every record gets an [`IdentityKey`]: its first ISBN token when it has
//! one, otherwise a composite of title, publisher and authors. Records are
//! reduced to one per key, keeping the first one seen.

use std::collections::HashMap;

use crate::models::Book;

/// Characters that separate identifiers inside the raw `isbn` field
/// (whitespace is also a separator)
const ISBN_DELIMITERS: [char; 4] = [',', ';', '|', '/'];

/// Identity of a record for deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// First ISBN token of the record
    Isbn(String),
    /// Used when the record carries no ISBN token
    Fallback {
        title: String,
        publisher: String,
        authors: String,
    },
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityKey::Isbn(isbn) => write!(f, "isbn:{}", isbn),
            IdentityKey::Fallback {
                title,
                publisher,
                authors,
            } => write!(f, "fallback:{}||{}||{}", title, publisher, authors),
        }
    }
}

/// First identifier in a raw ISBN field, if any
///
/// Kakao sends `"ISBN10 ISBN13"`; other separators show up in the wild.
pub fn canonical_isbn(raw: &str) -> Option<&str> {
    raw.split(|c: char| c.is_whitespace() || ISBN_DELIMITERS.contains(&c))
        .find(|token| !token.is_empty())
}

/// Derive the identity key of a record
pub fn identity_key(book: &Book) -> IdentityKey {
    match canonical_isbn(&book.isbn()) {
        Some(isbn) => IdentityKey::Isbn(isbn.to_string()),
        None => IdentityKey::Fallback {
            title: book.title().trim().to_string(),
            publisher: book.publisher().trim().to_string(),
            authors: book.authors_joined().trim().to_string(),
        },
    }
}

/// Records keyed by identity, in order of first occurrence
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: Vec<(IdentityKey, Book)>,
    index: HashMap<IdentityKey, usize>,
    discarded: usize,
}

impl ResultSet {
    /// Create an empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `book` under `key` unless the key is taken.
    ///
    /// Returns `false` (and drops `book`) when the key is already present.
    pub fn insert(&mut self, key: IdentityKey, book: Book) -> bool {
        if self.index.contains_key(&key) {
            self.discarded += 1;
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, book));
        true
    }

    /// Look up the record kept for `key`
    pub fn get(&self, key: &IdentityKey) -> Option<&Book> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &IdentityKey) -> bool {
        self.index.contains_key(key)
    }

    /// Number of unique records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records dropped as duplicates
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Records in insertion order
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.entries.iter().map(|(_, b)| b)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&IdentityKey, &Book)> {
        self.entries.iter().map(|(k, b)| (k, b))
    }
}

/// Reduce `records` to one per identity key, first occurrence wins
pub fn dedupe<I>(records: I) -> ResultSet
where
    I: IntoIterator<Item = Book>,
{
    let mut set = ResultSet::new();
    for book in records {
        let key = identity_key(&book);
        if !set.insert(key, book) {
            tracing::trace!("dropping duplicate record");
        }
    }
    tracing::debug!(
        unique = set.len(),
        discarded = set.discarded(),
        "deduplicated records"
    );
    set
}
