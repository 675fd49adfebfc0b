//! Loan queries

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Loan, LoanStatus},
};

/// Loan row as stored; `status` is a small integer
#[derive(Debug, FromRow)]
struct LoanRow {
    id: Uuid,
    book_id: Uuid,
    member_name: String,
    member_email: String,
    loan_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    status: i16,
}

impl TryFrom<LoanRow> for Loan {
    type Error = sqlx::Error;

    fn try_from(row: LoanRow) -> Result<Self, Self::Error> {
        let status = LoanStatus::try_from(row.status).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Loan {
            id: row.id,
            book_id: row.book_id,
            member_name: row.member_name,
            member_email: row.member_email,
            loan_date: row.loan_date,
            due_date: row.due_date,
            return_date: row.return_date,
            status,
        })
    }
}

fn into_loans(rows: Vec<LoanRow>) -> AppResult<Vec<Loan>> {
    Ok(rows.into_iter().map(Loan::try_from).collect::<Result<Vec<_>, _>>()?)
}

pub(super) async fn get_by_id(pool: &Pool<Postgres>, id: Uuid) -> AppResult<Option<Loan>> {
    let row = sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Loan::try_from).transpose()?)
}

pub(super) async fn list(pool: &Pool<Postgres>) -> AppResult<Vec<Loan>> {
    let rows = sqlx::query_as::<_, LoanRow>("SELECT * FROM loans ORDER BY loan_date DESC")
        .fetch_all(pool)
        .await?;
    into_loans(rows)
}

pub(super) async fn list_active(pool: &Pool<Postgres>) -> AppResult<Vec<Loan>> {
    let rows = sqlx::query_as::<_, LoanRow>(
        "SELECT * FROM loans WHERE status IN ($1, $2) ORDER BY loan_date DESC",
    )
    .bind(i16::from(LoanStatus::Active))
    .bind(i16::from(LoanStatus::Overdue))
    .fetch_all(pool)
    .await?;
    into_loans(rows)
}

pub(super) async fn list_by_book(pool: &Pool<Postgres>, book_id: Uuid) -> AppResult<Vec<Loan>> {
    let rows = sqlx::query_as::<_, LoanRow>(
        "SELECT * FROM loans WHERE book_id = $1 ORDER BY loan_date DESC",
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?;
    into_loans(rows)
}

pub(super) async fn insert(conn: &mut PgConnection, loan: &Loan) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO loans (id, book_id, member_name, member_email, loan_date, due_date, return_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(loan.id)
    .bind(loan.book_id)
    .bind(&loan.member_name)
    .bind(&loan.member_email)
    .bind(loan.loan_date)
    .bind(loan.due_date)
    .bind(loan.return_date)
    .bind(i16::from(loan.status))
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub(super) async fn update(conn: &mut PgConnection, loan: &Loan) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE loans
        SET book_id = $2, member_name = $3, member_email = $4,
            loan_date = $5, due_date = $6, return_date = $7, status = $8
        WHERE id = $1
        "#,
    )
    .bind(loan.id)
    .bind(loan.book_id)
    .bind(&loan.member_name)
    .bind(&loan.member_email)
    .bind(loan.loan_date)
    .bind(loan.due_date)
    .bind(loan.return_date)
    .bind(i16::from(loan.status))
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub(super) async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM loans WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
