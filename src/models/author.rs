//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Author model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub biography: Option<String>,
}

impl Author {
    pub fn new(data: CreateAuthor) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: data.first_name,
            last_name: data.last_name,
            birth_date: data.birth_date,
            biography: data.biography,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Apply the fields present in an update request
    pub fn apply(&mut self, data: UpdateAuthor) {
        if let Some(first_name) = data.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = data.last_name {
            self.last_name = last_name;
        }
        if data.birth_date.is_some() {
            self.birth_date = data.birth_date;
        }
        if data.biography.is_some() {
            self.biography = data.biography;
        }
    }
}

/// Author with display fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorDetails {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub biography: Option<String>,
    /// Number of books written by this author
    pub books_count: usize,
}

impl AuthorDetails {
    pub fn new(author: Author, books_count: usize) -> Self {
        Self {
            full_name: author.full_name(),
            id: author.id,
            first_name: author.first_name,
            last_name: author.last_name,
            birth_date: author.birth_date,
            biography: author.biography,
            books_count,
        }
    }
}

/// Create author request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 2000, message = "Biography cannot exceed 2000 characters"))]
    pub biography: Option<String>,
}

/// Update author request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 2000, message = "Biography cannot exceed 2000 characters"))]
    pub biography: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tolkien() -> Author {
        Author::new(CreateAuthor {
            first_name: "J.R.R.".to_string(),
            last_name: "Tolkien".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1892, 1, 3),
            biography: None,
        })
    }

    #[test]
    fn test_full_name() {
        assert_eq!(tolkien().full_name(), "J.R.R. Tolkien");
    }

    #[test]
    fn test_apply_keeps_missing_fields() {
        let mut author = tolkien();
        author.apply(UpdateAuthor {
            biography: Some("Philologist".to_string()),
            ..Default::default()
        });
        assert_eq!(author.first_name, "J.R.R.");
        assert_eq!(author.biography.as_deref(), Some("Philologist"));
    }

    #[test]
    fn test_validation_rejects_empty_names() {
        let data = CreateAuthor {
            first_name: String::new(),
            last_name: "Tolkien".to_string(),
            birth_date: None,
            biography: None,
        };
        assert!(data.validate().is_err());
    }
}
