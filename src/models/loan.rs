//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Stored loan status.
///
/// `Overdue` is part of the stored domain but nothing writes it: lateness is
/// computed from the due date at read time (see [`Loan::is_overdue_at`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum LoanStatus {
    Active = 0,
    Returned = 1,
    Overdue = 2,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid loan status value: {0}")]
pub struct InvalidLoanStatus(pub i16);

impl TryFrom<i16> for LoanStatus {
    type Error = InvalidLoanStatus;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(LoanStatus::Active),
            1 => Ok(LoanStatus::Returned),
            2 => Ok(LoanStatus::Overdue),
            other => Err(InvalidLoanStatus(other)),
        }
    }
}

impl From<LoanStatus> for i16 {
    fn from(s: LoanStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Active => "Active",
            LoanStatus::Returned => "Returned",
            LoanStatus::Overdue => "Overdue",
        };
        write!(f, "{}", label)
    }
}

/// Loan model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub book_id: Uuid,
    pub member_name: String,
    pub member_email: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    /// Set exactly when `status` is `Returned`
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

impl Loan {
    /// Open a new active loan
    pub fn open(data: CreateLoan) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id: data.book_id,
            member_name: data.member_name,
            member_email: data.member_email,
            loan_date: data.loan_date,
            due_date: data.due_date,
            return_date: None,
            status: LoanStatus::Active,
        }
    }

    /// Not yet returned. A stored `Overdue` still counts as active.
    pub fn is_active(&self) -> bool {
        matches!(self.status, LoanStatus::Active | LoanStatus::Overdue)
    }

    /// Close the loan at `now`.
    ///
    /// Unconditional: calling it on a returned loan overwrites the return
    /// date, so callers check `is_active` first.
    pub fn mark_as_returned_at(&mut self, now: DateTime<Utc>) {
        self.return_date = Some(now);
        self.status = LoanStatus::Returned;
    }

    pub fn mark_as_returned(&mut self) {
        self.mark_as_returned_at(Utc::now());
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        if self.status == LoanStatus::Returned {
            return false;
        }
        now > self.due_date
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }
}

/// Loan with display fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: Uuid,
    pub book_id: Uuid,
    pub book_title: Option<String>,
    pub member_name: String,
    pub member_email: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub is_overdue: bool,
}

impl LoanDetails {
    pub fn new(loan: Loan, book_title: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            is_overdue: loan.is_overdue_at(now),
            id: loan.id,
            book_id: loan.book_id,
            book_title,
            member_name: loan.member_name,
            member_email: loan.member_email,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            status: loan.status,
        }
    }
}

/// Validated borrow request handed to the loans service
#[derive(Debug, Clone)]
pub struct CreateLoan {
    pub book_id: Uuid,
    pub member_name: String,
    pub member_email: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}
