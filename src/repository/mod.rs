//! Repository layer: the persistence gateway used by the services
//!
//! Reads go straight to the store. Writes are staged in a [`ChangeSet`] and
//! applied by a single [`CatalogStore::commit`], which is all-or-nothing.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Author, Book, Loan},
};

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

/// Shared handle on the configured store
pub type Repository = Arc<dyn CatalogStore>;

/// A persisted entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Author(Author),
    Book(Book),
    Loan(Loan),
}

impl From<Author> for Record {
    fn from(author: Author) -> Self {
        Record::Author(author)
    }
}

impl From<Book> for Record {
    fn from(book: Book) -> Self {
        Record::Book(book)
    }
}

impl From<Loan> for Record {
    fn from(loan: Loan) -> Self {
        Record::Loan(loan)
    }
}

/// Primary key of a persisted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Author(Uuid),
    Book(Uuid),
    Loan(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Add(Record),
    Update(Record),
    Remove(RecordKey),
}

/// Mutations staged for one commit, applied in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: impl Into<Record>) -> &mut Self {
        self.changes.push(Change::Add(record.into()));
        self
    }

    pub fn update(&mut self, record: impl Into<Record>) -> &mut Self {
        self.changes.push(Change::Update(record.into()));
        self
    }

    pub fn remove(&mut self, key: RecordKey) -> &mut Self {
        self.changes.push(Change::Remove(key));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Persistence gateway for authors, books and loans.
///
/// Lookups by id return `Ok(None)` when the row does not exist. `commit`
/// returns `true` iff at least one row changed; `false` is not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Check that the backing store is reachable
    async fn ping(&self) -> AppResult<()>;

    async fn author_by_id(&self, id: Uuid) -> AppResult<Option<Author>>;

    /// All authors ordered by last name, then first name
    async fn authors(&self) -> AppResult<Vec<Author>>;

    async fn book_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// All books ordered by title
    async fn books(&self) -> AppResult<Vec<Book>>;

    async fn books_by_author(&self, author_id: Uuid) -> AppResult<Vec<Book>>;

    /// Books whose title contains `title`, case-insensitively, ordered by title
    async fn search_books_by_title(&self, title: &str) -> AppResult<Vec<Book>>;

    async fn loan_by_id(&self, id: Uuid) -> AppResult<Option<Loan>>;

    /// All loans, newest loan date first
    async fn loans(&self) -> AppResult<Vec<Loan>>;

    /// Loans whose stored status is `Active` or `Overdue`, newest first
    async fn active_loans(&self) -> AppResult<Vec<Loan>>;

    /// Loans of one book, newest first
    async fn loans_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>>;

    /// Apply every staged change atomically
    async fn commit(&self, changes: ChangeSet) -> AppResult<bool>;
}

/// Case-insensitive substring match used by title search
pub(crate) fn title_matches(title: &str, fragment: &str) -> bool {
    title.to_lowercase().contains(&fragment.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_set_keeps_order() {
        let book_id = Uuid::new_v4();
        let mut changes = ChangeSet::new();
        changes
            .remove(RecordKey::Book(book_id))
            .remove(RecordKey::Loan(book_id));

        assert_eq!(changes.len(), 2);
        let keys: Vec<_> = changes
            .into_iter()
            .map(|c| match c {
                Change::Remove(key) => key,
                other => panic!("unexpected change {:?}", other),
            })
            .collect();
        assert_eq!(keys, vec![RecordKey::Book(book_id), RecordKey::Loan(book_id)]);
    }

    #[test]
    fn test_title_matches_ignores_case() {
        assert!(title_matches("The Lord of the Rings", "lord"));
        assert!(title_matches("The Lord of the Rings", ""));
        assert!(!title_matches("Dune", "hobbit"));
    }
}
