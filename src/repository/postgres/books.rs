//! Book queries

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::map_constraint_error;
use crate::{
    error::{AppError, AppResult},
    models::Book,
};

/// Escape LIKE wildcards so user input matches literally
fn escape_like(fragment: &str) -> String {
    fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub(super) async fn get_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(super) async fn list(pool: &Pool<Postgres>) -> Result<Vec<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title")
        .fetch_all(pool)
        .await
}

pub(super) async fn list_by_author(pool: &Pool<Postgres>, author_id: Uuid) -> Result<Vec<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE author_id = $1 ORDER BY title")
        .bind(author_id)
        .fetch_all(pool)
        .await
}

pub(super) async fn search_by_title(pool: &Pool<Postgres>, title: &str) -> Result<Vec<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>(
        r#"
        SELECT * FROM books
        WHERE title ILIKE '%' || $1 || '%' ESCAPE '\'
        ORDER BY title
        "#,
    )
    .bind(escape_like(title))
    .fetch_all(pool)
    .await
}

pub(super) async fn insert(conn: &mut PgConnection, book: &Book) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO books (id, title, isbn, publication_year, available_copies, total_copies, author_id, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(book.id)
    .bind(&book.title)
    .bind(&book.isbn)
    .bind(book.publication_year)
    .bind(book.available_copies)
    .bind(book.total_copies)
    .bind(book.author_id)
    .bind(book.version)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Update a book read at `book.version`.
///
/// A row that exists under another version was written since it was read;
/// that is a conflict and aborts the surrounding transaction.
pub(super) async fn update(conn: &mut PgConnection, book: &Book) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET title = $2, isbn = $3, publication_year = $4,
            available_copies = $5, total_copies = $6, author_id = $7,
            version = version + 1
        WHERE id = $1 AND version = $8
        "#,
    )
    .bind(book.id)
    .bind(&book.title)
    .bind(&book.isbn)
    .bind(book.publication_year)
    .bind(book.available_copies)
    .bind(book.total_copies)
    .bind(book.author_id)
    .bind(book.version)
    .execute(&mut *conn)
    .await
    .map_err(map_constraint_error)?;

    if result.rows_affected() == 0 {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
            .bind(book.id)
            .fetch_one(&mut *conn)
            .await?;
        if exists {
            return Err(AppError::Conflict(format!("Book {} was modified concurrently", book.id)));
        }
    }
    Ok(result.rows_affected())
}

pub(super) async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100% pure_rust"), "100\\% pure\\_rust");
        assert_eq!(escape_like("plain"), "plain");
    }
}
