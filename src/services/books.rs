//! Book catalog service
//!
//! Edits and deletions of a book take the same per-book lock as borrows and
//! returns, so an administrative change never interleaves with a loan.

use std::collections::HashMap;

use uuid::Uuid;

use super::locks::BookLocks;
use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        book::{CreateBook, UpdateBook},
        Book, BookDetails,
    },
    repository::{ChangeSet, RecordKey, Repository},
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    locks: BookLocks,
}

impl BooksService {
    pub fn new(repository: Repository, locks: BookLocks) -> Self {
        Self { repository, locks }
    }

    /// List books ordered by title
    pub async fn get_all(&self) -> AppResult<Vec<BookDetails>> {
        let books = self.repository.books().await?;
        self.with_authors(books).await
    }

    /// Books whose title contains `fragment`, ignoring case
    pub async fn search_by_title(&self, fragment: &str) -> AppResult<Vec<BookDetails>> {
        let books = self.repository.search_books_by_title(fragment.trim()).await?;
        self.with_authors(books).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BookDetails> {
        let book = self.find(id).await?;
        let author_name = self.author_name(book.author_id).await?;
        Ok(BookDetails::new(book, author_name))
    }

    pub async fn create(&self, data: CreateBook) -> AppResult<BookDetails> {
        let author_name = self.require_author(data.author_id).await?;
        let book = Book::new(data);
        if !book.has_consistent_copies() {
            return Err(RuleViolation::CopiesExceedTotal.into());
        }

        let mut changes = ChangeSet::new();
        changes.add(book.clone());
        self.repository.commit(changes).await?;

        tracing::info!("Created book {} ({})", book.id, book.isbn);
        Ok(BookDetails::new(book, Some(author_name)))
    }

    pub async fn update(&self, id: Uuid, data: UpdateBook) -> AppResult<BookDetails> {
        let _guard = self.locks.lock(id).await;

        let mut book = self.find(id).await?;
        book.apply(data);
        if !book.has_consistent_copies() {
            return Err(RuleViolation::CopiesExceedTotal.into());
        }
        let author_name = self.require_author(book.author_id).await?;

        let mut changes = ChangeSet::new();
        changes.update(book.clone());
        if !self.repository.commit(changes).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        tracing::info!(
            "Updated book {} ({}/{} copies)",
            book.id,
            book.available_copies,
            book.total_copies
        );
        Ok(BookDetails::new(book, Some(author_name)))
    }

    /// Delete a book that has no active loan
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let _guard = self.locks.lock(id).await;

        self.find(id).await?;
        if self.has_active_loans(id).await? {
            return Err(RuleViolation::BookHasActiveLoans.into());
        }

        let mut changes = ChangeSet::new();
        changes.remove(RecordKey::Book(id));
        self.repository.commit(changes).await?;

        tracing::info!("Deleted book {}", id);
        Ok(())
    }

    /// True when the book exists and no loan on it is active
    pub async fn can_delete(&self, id: Uuid) -> AppResult<bool> {
        if self.repository.book_by_id(id).await?.is_none() {
            return Ok(false);
        }
        Ok(!self.has_active_loans(id).await?)
    }

    async fn has_active_loans(&self, id: Uuid) -> AppResult<bool> {
        Ok(self
            .repository
            .loans_by_book(id)
            .await?
            .iter()
            .any(|l| l.is_active()))
    }

    async fn find(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .book_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn author_name(&self, author_id: Uuid) -> AppResult<Option<String>> {
        Ok(self
            .repository
            .author_by_id(author_id)
            .await?
            .map(|a| a.full_name()))
    }

    async fn require_author(&self, author_id: Uuid) -> AppResult<String> {
        self.author_name(author_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", author_id)))
    }

    async fn with_authors(&self, books: Vec<Book>) -> AppResult<Vec<BookDetails>> {
        let names: HashMap<Uuid, String> = self
            .repository
            .authors()
            .await?
            .into_iter()
            .map(|a| (a.id, a.full_name()))
            .collect();

        Ok(books
            .into_iter()
            .map(|b| {
                let name = names.get(&b.author_id).cloned();
                BookDetails::new(b, name)
            })
            .collect())
    }
}
