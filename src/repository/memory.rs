//! In-memory catalog store
//!
//! Enforces the same constraints as the PostgreSQL schema (primary keys,
//! unique ISBN, foreign keys with restrict, copy-count check, book row
//! versions). A commit applies its changes in place while journaling the
//! prior rows, and replays the journal backwards when a change fails.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{title_matches, CatalogStore, Change, ChangeSet, Record, RecordKey};
use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{Author, Book, Loan},
};

/// Row as it was before a change; `None` means it did not exist
#[derive(Debug)]
enum Undo {
    Author(Uuid, Option<Author>),
    Book(Uuid, Option<Book>),
    Loan(Uuid, Option<Loan>),
}

#[derive(Debug, Default)]
struct Tables {
    authors: HashMap<Uuid, Author>,
    books: HashMap<Uuid, Book>,
    loans: HashMap<Uuid, Loan>,
}

impl Tables {
    /// Apply one change, returning the number of rows it touched
    fn apply(&mut self, change: Change, journal: &mut Vec<Undo>) -> AppResult<u64> {
        match change {
            Change::Add(record) => self.insert(record, journal),
            Change::Update(record) => self.replace(record, journal),
            Change::Remove(key) => self.delete(key, journal),
        }
    }

    fn insert(&mut self, record: Record, journal: &mut Vec<Undo>) -> AppResult<u64> {
        match record {
            Record::Author(author) => {
                if self.authors.contains_key(&author.id) {
                    return Err(duplicate_key("author", author.id));
                }
                journal.push(Undo::Author(author.id, None));
                self.authors.insert(author.id, author);
            }
            Record::Book(book) => {
                if self.books.contains_key(&book.id) {
                    return Err(duplicate_key("book", book.id));
                }
                self.check_book(&book)?;
                journal.push(Undo::Book(book.id, None));
                self.books.insert(book.id, book);
            }
            Record::Loan(loan) => {
                if self.loans.contains_key(&loan.id) {
                    return Err(duplicate_key("loan", loan.id));
                }
                self.check_loan(&loan)?;
                journal.push(Undo::Loan(loan.id, None));
                self.loans.insert(loan.id, loan);
            }
        }
        Ok(1)
    }

    fn replace(&mut self, record: Record, journal: &mut Vec<Undo>) -> AppResult<u64> {
        match record {
            Record::Author(author) => {
                if !self.authors.contains_key(&author.id) {
                    return Ok(0);
                }
                let id = author.id;
                let prior = self.authors.insert(id, author);
                journal.push(Undo::Author(id, prior));
            }
            Record::Book(mut book) => {
                let Some(stored) = self.books.get(&book.id) else {
                    return Ok(0);
                };
                if stored.version != book.version {
                    return Err(stale_book(book.id));
                }
                self.check_book(&book)?;
                book.version += 1;
                let id = book.id;
                let prior = self.books.insert(id, book);
                journal.push(Undo::Book(id, prior));
            }
            Record::Loan(loan) => {
                if !self.loans.contains_key(&loan.id) {
                    return Ok(0);
                }
                self.check_loan(&loan)?;
                let id = loan.id;
                let prior = self.loans.insert(id, loan);
                journal.push(Undo::Loan(id, prior));
            }
        }
        Ok(1)
    }

    fn delete(&mut self, key: RecordKey, journal: &mut Vec<Undo>) -> AppResult<u64> {
        let removed = match key {
            RecordKey::Author(id) => {
                if self.books.values().any(|b| b.author_id == id) {
                    return Err(AppError::Conflict(format!("Author {} is referenced by books", id)));
                }
                self.authors.remove(&id).map(|a| journal.push(Undo::Author(id, Some(a))))
            }
            RecordKey::Book(id) => {
                if self.loans.values().any(|l| l.book_id == id) {
                    return Err(AppError::Conflict(format!("Book {} is referenced by loans", id)));
                }
                self.books.remove(&id).map(|b| journal.push(Undo::Book(id, Some(b))))
            }
            RecordKey::Loan(id) => self.loans.remove(&id).map(|l| journal.push(Undo::Loan(id, Some(l)))),
        };
        Ok(u64::from(removed.is_some()))
    }

    /// Restore the rows recorded in `journal`, newest first
    fn rollback(&mut self, journal: Vec<Undo>) {
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Author(id, Some(author)) => {
                    self.authors.insert(id, author);
                }
                Undo::Author(id, None) => {
                    self.authors.remove(&id);
                }
                Undo::Book(id, Some(book)) => {
                    self.books.insert(id, book);
                }
                Undo::Book(id, None) => {
                    self.books.remove(&id);
                }
                Undo::Loan(id, Some(loan)) => {
                    self.loans.insert(id, loan);
                }
                Undo::Loan(id, None) => {
                    self.loans.remove(&id);
                }
            }
        }
    }

    fn check_book(&self, book: &Book) -> AppResult<()> {
        if !book.has_consistent_copies() {
            return Err(RuleViolation::CopiesExceedTotal.into());
        }
        if !self.authors.contains_key(&book.author_id) {
            return Err(AppError::NotFound(format!("Author with id {} not found", book.author_id)));
        }
        let isbn_taken = self
            .books
            .values()
            .any(|other| other.id != book.id && other.isbn == book.isbn);
        if isbn_taken {
            return Err(AppError::Conflict(format!("ISBN {} already exists", book.isbn)));
        }
        Ok(())
    }

    fn check_loan(&self, loan: &Loan) -> AppResult<()> {
        if !self.books.contains_key(&loan.book_id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", loan.book_id)));
        }
        Ok(())
    }
}

fn stale_book(id: Uuid) -> AppError {
    AppError::Conflict(format!("Book {} was modified concurrently", id))
}

fn duplicate_key(entity: &str, id: Uuid) -> AppError {
    AppError::Conflict(format!("{} {} already exists", entity, id))
}

fn newest_first(mut loans: Vec<Loan>) -> Vec<Loan> {
    loans.sort_by(|a, b| b.loan_date.cmp(&a.loan_date));
    loans
}

fn by_title(mut books: Vec<Book>) -> Vec<Book> {
    books.sort_by(|a, b| a.title.cmp(&b.title));
    books
}

/// Catalog store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn author_by_id(&self, id: Uuid) -> AppResult<Option<Author>> {
        Ok(self.tables.read().await.authors.get(&id).cloned())
    }

    async fn authors(&self) -> AppResult<Vec<Author>> {
        let mut authors: Vec<Author> = self.tables.read().await.authors.values().cloned().collect();
        authors.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(authors)
    }

    async fn book_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn books(&self) -> AppResult<Vec<Book>> {
        Ok(by_title(self.tables.read().await.books.values().cloned().collect()))
    }

    async fn books_by_author(&self, author_id: Uuid) -> AppResult<Vec<Book>> {
        let tables = self.tables.read().await;
        Ok(by_title(
            tables
                .books
                .values()
                .filter(|b| b.author_id == author_id)
                .cloned()
                .collect(),
        ))
    }

    async fn search_books_by_title(&self, title: &str) -> AppResult<Vec<Book>> {
        let tables = self.tables.read().await;
        Ok(by_title(
            tables
                .books
                .values()
                .filter(|b| title_matches(&b.title, title))
                .cloned()
                .collect(),
        ))
    }

    async fn loan_by_id(&self, id: Uuid) -> AppResult<Option<Loan>> {
        Ok(self.tables.read().await.loans.get(&id).cloned())
    }

    async fn loans(&self) -> AppResult<Vec<Loan>> {
        Ok(newest_first(self.tables.read().await.loans.values().cloned().collect()))
    }

    async fn active_loans(&self) -> AppResult<Vec<Loan>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.loans.values().filter(|l| l.is_active()).cloned().collect(),
        ))
    }

    async fn loans_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .loans
                .values()
                .filter(|l| l.book_id == book_id)
                .cloned()
                .collect(),
        ))
    }

    async fn commit(&self, changes: ChangeSet) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let mut journal = Vec::with_capacity(changes.len());
        let mut rows = 0;
        for change in changes {
            match tables.apply(change, &mut journal) {
                Ok(n) => rows += n,
                Err(e) => {
                    tables.rollback(journal);
                    return Err(e);
                }
            }
        }
        Ok(rows > 0)
    }
}
