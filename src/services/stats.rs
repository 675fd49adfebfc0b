//! Statistics service

use chrono::Utc;

use crate::{api::stats::StatsResponse, error::AppResult, repository::Repository};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Catalog totals and loan counts, overdue evaluated now
    pub async fn get_stats(&self) -> AppResult<StatsResponse> {
        let now = Utc::now();
        let total_books = self.repository.books().await?.len();
        let total_authors = self.repository.authors().await?.len();
        let active = self.repository.active_loans().await?;
        let overdue_loans = active.iter().filter(|l| l.is_overdue_at(now)).count();

        Ok(StatsResponse {
            total_books,
            total_authors,
            active_loans: active.len(),
            overdue_loans,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;

    use crate::{
        models::{author::CreateAuthor, book::CreateBook, loan::CreateLoan, Author, Book, Loan},
        repository::{CatalogStore, ChangeSet, MemoryCatalogStore},
    };

    #[tokio::test]
    async fn test_counts() {
        let store = Arc::new(MemoryCatalogStore::new());
        let author = Author::new(CreateAuthor {
            first_name: "Octavia".to_string(),
            last_name: "Butler".to_string(),
            birth_date: None,
            biography: None,
        });
        let book = Book::new(CreateBook {
            title: "Kindred".to_string(),
            isbn: "9780807083697".to_string(),
            publication_year: 1979,
            available_copies: 3,
            total_copies: 3,
            author_id: author.id,
        });
        let loan = |due_in_days: i64| {
            Loan::open(CreateLoan {
                book_id: book.id,
                member_name: "Dana".to_string(),
                member_email: "dana@example.com".to_string(),
                loan_date: Utc::now() - Duration::days(30),
                due_date: Utc::now() + Duration::days(due_in_days),
            })
        };
        let mut returned = loan(-10);
        returned.mark_as_returned();

        let mut changes = ChangeSet::new();
        changes
            .add(author.clone())
            .add(book.clone())
            .add(loan(-2))
            .add(loan(5))
            .add(returned);
        store.commit(changes).await.unwrap();

        let stats = StatsService::new(store).get_stats().await.unwrap();
        assert_eq!(stats.total_books, 1);
        assert_eq!(stats.total_authors, 1);
        assert_eq!(stats.active_loans, 2);
        assert_eq!(stats.overdue_loans, 1);
    }
}
