//! Loan management service
//!
//! The only place where a book's copy count and a loan's status change
//! together. Both mutations go into one change set and one commit.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::locks::BookLocks;
use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        loan::{CreateLoan, Loan, LoanDetails},
        Book,
    },
    repository::{ChangeSet, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    locks: BookLocks,
}

impl LoansService {
    pub fn new(repository: Repository, locks: BookLocks) -> Self {
        Self { repository, locks }
    }

    /// Get all loans, newest first
    pub async fn get_all(&self) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.loans().await?;
        self.with_titles(loans).await
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, loan_id: Uuid) -> AppResult<LoanDetails> {
        let loan = self.find_loan(loan_id).await?;
        let title = self.repository.book_by_id(loan.book_id).await?.map(|b| b.title);
        Ok(LoanDetails::new(loan, title, Utc::now()))
    }

    /// Create a new loan (borrow a copy of a book)
    pub async fn create_loan(&self, data: CreateLoan) -> AppResult<LoanDetails> {
        let _guard = self.locks.lock(data.book_id).await;

        let mut book = self.find_book(data.book_id).await?;
        if let Err(e) = book.borrow_copy() {
            tracing::info!("Loan refused for book {}: {}", book.id, e);
            return Err(RuleViolation::NoCopiesAvailable.into());
        }

        let loan = Loan::open(data);

        let mut changes = ChangeSet::new();
        changes.update(book.clone()).add(loan.clone());
        if !self.repository.commit(changes).await? {
            tracing::warn!("Loan {} commit reported no changed rows", loan.id);
        }

        tracing::info!(
            "Loan {} created for book {} ({} copies left)",
            loan.id,
            book.id,
            book.available_copies
        );
        Ok(LoanDetails::new(loan, Some(book.title), Utc::now()))
    }

    /// Return a borrowed copy
    pub async fn return_loan(&self, loan_id: Uuid) -> AppResult<LoanDetails> {
        let loan = self.find_loan(loan_id).await?;
        if !loan.is_active() {
            return Err(RuleViolation::AlreadyReturned.into());
        }

        let _guard = self.locks.lock(loan.book_id).await;

        // Re-read under the guard: a concurrent return may have completed
        let mut loan = self.find_loan(loan_id).await?;
        if !loan.is_active() {
            return Err(RuleViolation::AlreadyReturned.into());
        }

        let Some(mut book) = self.repository.book_by_id(loan.book_id).await? else {
            tracing::warn!("Loan {} references missing book {}", loan.id, loan.book_id);
            return Err(RuleViolation::CannotReturn.into());
        };
        if let Err(e) = book.return_copy() {
            tracing::warn!(
                "Loan {} cannot be returned to book {}: {} ({}/{})",
                loan.id,
                book.id,
                e,
                book.available_copies,
                book.total_copies
            );
            return Err(RuleViolation::CannotReturn.into());
        }

        loan.mark_as_returned();

        let mut changes = ChangeSet::new();
        changes.update(loan.clone()).update(book.clone());
        if !self.repository.commit(changes).await? {
            tracing::warn!("Return of loan {} reported no changed rows", loan.id);
        }

        tracing::info!("Loan {} returned to book {}", loan.id, book.id);
        Ok(LoanDetails::new(loan, Some(book.title), Utc::now()))
    }

    /// Loans not yet returned
    pub async fn get_active_loans(&self) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.active_loans().await?;
        self.with_titles(loans).await
    }

    /// Active loans past their due date, evaluated now
    pub async fn get_overdue_loans(&self) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        let loans = self
            .repository
            .active_loans()
            .await?
            .into_iter()
            .filter(|l| l.is_overdue_at(now))
            .collect();
        self.with_titles(loans).await
    }

    /// Loan history of one book
    pub async fn get_loans_by_book(&self, book_id: Uuid) -> AppResult<Vec<LoanDetails>> {
        let book = self.find_book(book_id).await?;
        let now = Utc::now();
        let loans = self.repository.loans_by_book(book_id).await?;
        Ok(loans
            .into_iter()
            .map(|l| LoanDetails::new(l, Some(book.title.clone()), now))
            .collect())
    }

    async fn find_loan(&self, loan_id: Uuid) -> AppResult<Loan> {
        self.repository
            .loan_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    async fn find_book(&self, book_id: Uuid) -> AppResult<Book> {
        self.repository
            .book_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn with_titles(&self, loans: Vec<Loan>) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        let mut titles: HashMap<Uuid, Option<String>> = HashMap::new();
        let mut result = Vec::with_capacity(loans.len());

        for loan in loans {
            let title = match titles.get(&loan.book_id) {
                Some(title) => title.clone(),
                None => {
                    let title = self.repository.book_by_id(loan.book_id).await?.map(|b| b.title);
                    titles.insert(loan.book_id, title.clone());
                    title
                }
            };
            result.push(LoanDetails::new(loan, title, now));
        }

        Ok(result)
    }
}
