//! Business logic services

pub mod authors;
pub mod books;
pub mod loans;
pub mod locks;
pub mod stats;

use crate::{error::AppResult, repository::Repository};

pub use locks::BookLocks;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub authors: authors::AuthorsService,
    pub books: books::BooksService,
    pub loans: loans::LoansService,
    pub stats: stats::StatsService,
    repository: Repository,
}

impl Services {
    /// Create all services over one repository. Books and loans share the
    /// same per-book locks.
    pub fn new(repository: Repository) -> Self {
        let locks = BookLocks::new();
        Self {
            authors: authors::AuthorsService::new(repository.clone()),
            books: books::BooksService::new(repository.clone(), locks.clone()),
            loans: loans::LoansService::new(repository.clone(), locks),
            stats: stats::StatsService::new(repository.clone()),
            repository,
        }
    }

    /// Check that the store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
