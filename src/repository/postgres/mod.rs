//! PostgreSQL catalog store
//!
//! A commit runs every staged change inside one transaction; any failure
//! drops the transaction, which rolls it back. Book updates are conditional
//! on the row version read, so writers in other processes cannot overwrite
//! each other's copy counts.

mod authors;
mod books;
mod loans;

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::{CatalogStore, Change, ChangeSet, Record, RecordKey};
use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{Author, Book, Loan},
};

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: Pool<Postgres>,
}

impl PgCatalogStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

async fn apply(conn: &mut PgConnection, change: Change) -> AppResult<u64> {
    let rows = match change {
        Change::Update(Record::Book(b)) => return books::update(conn, &b).await,
        Change::Add(Record::Author(a)) => authors::insert(conn, &a).await,
        Change::Add(Record::Book(b)) => books::insert(conn, &b).await,
        Change::Add(Record::Loan(l)) => loans::insert(conn, &l).await,
        Change::Update(Record::Author(a)) => authors::update(conn, &a).await,
        Change::Update(Record::Loan(l)) => loans::update(conn, &l).await,
        Change::Remove(RecordKey::Author(id)) => authors::delete(conn, id).await,
        Change::Remove(RecordKey::Book(id)) => books::delete(conn, id).await,
        Change::Remove(RecordKey::Loan(id)) => loans::delete(conn, id).await,
    };
    rows.map_err(map_constraint_error)
}

/// Translate constraint violations into domain errors; everything else stays
/// a database fault.
fn map_constraint_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        let constraint = db.constraint().unwrap_or("unknown").to_string();
        if db.is_unique_violation() {
            return AppError::Conflict(format!("Duplicate value violates {}", constraint));
        }
        if db.is_foreign_key_violation() {
            return AppError::Conflict(format!("Referenced row violates {}", constraint));
        }
        if db.is_check_violation() {
            return RuleViolation::CopiesExceedTotal.into();
        }
    }
    AppError::Database(e)
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn author_by_id(&self, id: Uuid) -> AppResult<Option<Author>> {
        Ok(authors::get_by_id(&self.pool, id).await?)
    }

    async fn authors(&self) -> AppResult<Vec<Author>> {
        Ok(authors::list(&self.pool).await?)
    }

    async fn book_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(books::get_by_id(&self.pool, id).await?)
    }

    async fn books(&self) -> AppResult<Vec<Book>> {
        Ok(books::list(&self.pool).await?)
    }

    async fn books_by_author(&self, author_id: Uuid) -> AppResult<Vec<Book>> {
        Ok(books::list_by_author(&self.pool, author_id).await?)
    }

    async fn search_books_by_title(&self, title: &str) -> AppResult<Vec<Book>> {
        Ok(books::search_by_title(&self.pool, title).await?)
    }

    async fn loan_by_id(&self, id: Uuid) -> AppResult<Option<Loan>> {
        loans::get_by_id(&self.pool, id).await
    }

    async fn loans(&self) -> AppResult<Vec<Loan>> {
        loans::list(&self.pool).await
    }

    async fn active_loans(&self) -> AppResult<Vec<Loan>> {
        loans::list_active(&self.pool).await
    }

    async fn loans_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>> {
        loans::list_by_book(&self.pool, book_id).await
    }

    async fn commit(&self, changes: ChangeSet) -> AppResult<bool> {
        if changes.is_empty() {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        let mut rows = 0;
        for change in changes {
            rows += apply(&mut *tx, change).await?;
        }
        tx.commit().await?;

        tracing::debug!("Committed change set ({} rows)", rows);
        Ok(rows > 0)
    }
}
