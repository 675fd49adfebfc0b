//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::loan::{CreateLoan, LoanDetails},
    AppState,
};

/// Create loan request
#[derive(Deserialize, Validate, ToSchema)]
pub struct CreateLoanRequest {
    /// Book to borrow
    pub book_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Member name must be 1-200 characters"))]
    pub member_name: String,
    #[validate(
        email(message = "Invalid email format"),
        length(max = 200, message = "Member email cannot exceed 200 characters")
    )]
    pub member_email: String,
    /// Defaults to now
    pub loan_date: Option<DateTime<Utc>>,
    /// Defaults to the loan date plus the configured loan period
    pub due_date: Option<DateTime<Utc>>,
}

/// Return response with loan details
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Loan details
    pub loan: LoanDetails,
}

/// List all loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    responses(
        (status = 200, description = "Loans, newest first", body = Vec<LoanDetails>)
    )
)]
pub async fn list_loans(State(state): State<AppState>) -> AppResult<Json<Vec<LoanDetails>>> {
    Ok(Json(state.services.loans.get_all().await?))
}

/// List loans not yet returned
#[utoipa::path(
    get,
    path = "/loans/active",
    tag = "loans",
    responses(
        (status = 200, description = "Active loans", body = Vec<LoanDetails>)
    )
)]
pub async fn get_active_loans(State(state): State<AppState>) -> AppResult<Json<Vec<LoanDetails>>> {
    Ok(Json(state.services.loans.get_active_loans().await?))
}

/// List active loans past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Overdue loans", body = Vec<LoanDetails>)
    )
)]
pub async fn get_overdue_loans(State(state): State<AppState>) -> AppResult<Json<Vec<LoanDetails>>> {
    Ok(Json(state.services.loans.get_overdue_loans().await?))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanDetails>> {
    Ok(Json(state.services.loans.get_by_id(id).await?))
}

/// Loan history of a book
#[utoipa::path(
    get,
    path = "/books/{id}/loans",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Loans of the book, newest first", body = Vec<LoanDetails>),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book_loans(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    Ok(Json(state.services.loans.get_loans_by_book(book_id).await?))
}

/// Create a new loan (borrow a copy)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 422, description = "No copies available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    request.validate()?;

    let loan_date = request.loan_date.unwrap_or_else(Utc::now);
    let due_date = match request.due_date {
        Some(due_date) => due_date,
        None => Duration::try_days(state.config.loans.default_duration_days)
            .and_then(|period| loan_date.checked_add_signed(period))
            .ok_or_else(|| AppError::Validation("due date out of range".to_string()))?,
    };

    let loan = CreateLoan {
        book_id: request.book_id,
        member_name: request.member_name,
        member_email: request.member_email,
        loan_date,
        due_date,
    };

    let created = state.services.loans.create_loan(loan).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Copy returned", body = ReturnResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Already returned or cannot be returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<Uuid>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.loans.return_loan(loan_id).await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        loan,
    }))
}
