//! Author management service

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        author::{CreateAuthor, UpdateAuthor},
        Author, AuthorDetails,
    },
    repository::{ChangeSet, RecordKey, Repository},
};

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
}

impl AuthorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List authors with the number of books each has written
    pub async fn get_all(&self) -> AppResult<Vec<AuthorDetails>> {
        let authors = self.repository.authors().await?;
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for book in self.repository.books().await? {
            *counts.entry(book.author_id).or_default() += 1;
        }

        Ok(authors
            .into_iter()
            .map(|a| {
                let count = counts.get(&a.id).copied().unwrap_or(0);
                AuthorDetails::new(a, count)
            })
            .collect())
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<AuthorDetails> {
        let author = self.find(id).await?;
        let count = self.repository.books_by_author(id).await?.len();
        Ok(AuthorDetails::new(author, count))
    }

    pub async fn create(&self, data: CreateAuthor) -> AppResult<AuthorDetails> {
        let author = Author::new(data);

        let mut changes = ChangeSet::new();
        changes.add(author.clone());
        self.repository.commit(changes).await?;

        tracing::info!("Created author {} ({})", author.id, author.full_name());
        Ok(AuthorDetails::new(author, 0))
    }

    pub async fn update(&self, id: Uuid, data: UpdateAuthor) -> AppResult<AuthorDetails> {
        let mut author = self.find(id).await?;
        author.apply(data);

        let mut changes = ChangeSet::new();
        changes.update(author.clone());
        if !self.repository.commit(changes).await? {
            // Removed between the read and the write
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }

        self.get_by_id(author.id).await
    }

    /// Delete an author who has no books
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.find(id).await?;
        if !self.repository.books_by_author(id).await?.is_empty() {
            return Err(RuleViolation::AuthorHasBooks.into());
        }

        let mut changes = ChangeSet::new();
        changes.remove(RecordKey::Author(id));
        self.repository.commit(changes).await?;

        tracing::info!("Deleted author {}", id);
        Ok(())
    }

    /// True when the author exists and has no books
    pub async fn can_delete(&self, id: Uuid) -> AppResult<bool> {
        if self.repository.author_by_id(id).await?.is_none() {
            return Ok(false);
        }
        Ok(self.repository.books_by_author(id).await?.is_empty())
    }

    async fn find(&self, id: Uuid) -> AppResult<Author> {
        self.repository
            .author_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }
}
