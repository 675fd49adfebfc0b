//! Author queries

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::models::Author;

pub(super) async fn get_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Author>, sqlx::Error> {
    sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(super) async fn list(pool: &Pool<Postgres>) -> Result<Vec<Author>, sqlx::Error> {
    sqlx::query_as::<_, Author>("SELECT * FROM authors ORDER BY last_name, first_name")
        .fetch_all(pool)
        .await
}

pub(super) async fn insert(conn: &mut PgConnection, author: &Author) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO authors (id, first_name, last_name, birth_date, biography)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(author.id)
    .bind(&author.first_name)
    .bind(&author.last_name)
    .bind(author.birth_date)
    .bind(&author.biography)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub(super) async fn update(conn: &mut PgConnection, author: &Author) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE authors
        SET first_name = $2, last_name = $3, birth_date = $4, biography = $5
        WHERE id = $1
        "#,
    )
    .bind(author.id)
    .bind(&author.first_name)
    .bind(&author.last_name)
    .bind(author.birth_date)
    .bind(&author.biography)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub(super) async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM authors WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
