//! Book model, copy inventory and ISBN validation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static ISBN_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s-]").unwrap());
static ISBN10: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{9}[\dX]$").unwrap());
static ISBN13: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{13}$").unwrap());

/// Refusal of a copy-count mutation. The counters are left untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyError {
    #[error("no copies available")]
    NoCopiesAvailable,
    #[error("would exceed total copies")]
    ExceedsTotalCopies,
}

/// Book model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    /// Copies currently on the shelf
    pub available_copies: i32,
    /// Copies owned by the library
    pub total_copies: i32,
    pub author_id: Uuid,
    /// Row version, bumped by every stored update
    #[serde(skip)]
    pub version: i32,
}

impl Book {
    pub fn new(data: CreateBook) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: data.title,
            isbn: data.isbn,
            publication_year: data.publication_year,
            available_copies: data.available_copies,
            total_copies: data.total_copies,
            author_id: data.author_id,
            version: 0,
        }
    }

    /// Take one copy off the shelf.
    #[must_use = "a refused borrow leaves the book unchanged"]
    pub fn borrow_copy(&mut self) -> Result<(), CopyError> {
        if self.available_copies <= 0 {
            return Err(CopyError::NoCopiesAvailable);
        }
        self.available_copies -= 1;
        Ok(())
    }

    /// Put one copy back on the shelf.
    #[must_use = "a refused return leaves the book unchanged"]
    pub fn return_copy(&mut self) -> Result<(), CopyError> {
        if self.available_copies >= self.total_copies {
            return Err(CopyError::ExceedsTotalCopies);
        }
        self.available_copies += 1;
        Ok(())
    }

    pub fn has_consistent_copies(&self) -> bool {
        self.available_copies >= 0 && self.available_copies <= self.total_copies
    }

    /// Apply the fields present in an update request.
    ///
    /// Counter consistency is not checked here; callers verify
    /// `has_consistent_copies` afterwards.
    pub fn apply(&mut self, data: UpdateBook) {
        if let Some(title) = data.title {
            self.title = title;
        }
        if let Some(isbn) = data.isbn {
            self.isbn = isbn;
        }
        if let Some(year) = data.publication_year {
            self.publication_year = year;
        }
        if let Some(available) = data.available_copies {
            self.available_copies = available;
        }
        if let Some(total) = data.total_copies {
            self.total_copies = total;
        }
        if let Some(author_id) = data.author_id {
            self.author_id = author_id;
        }
    }
}

/// Check an ISBN-10 or ISBN-13, ignoring hyphens and whitespace
pub fn validate_isbn(isbn: &str) -> bool {
    let clean = ISBN_SEPARATORS.replace_all(isbn.trim(), "");
    match clean.len() {
        10 => validate_isbn10(&clean),
        13 => validate_isbn13(&clean),
        _ => false,
    }
}

fn validate_isbn10(isbn: &str) -> bool {
    if !ISBN10.is_match(isbn) {
        return false;
    }

    let sum: u32 = isbn
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let value = if b == b'X' { 10 } else { u32::from(b - b'0') };
            value * (10 - i as u32)
        })
        .sum();

    sum % 11 == 0
}

fn validate_isbn13(isbn: &str) -> bool {
    if !ISBN13.is_match(isbn) {
        return false;
    }

    let digits: Vec<u32> = isbn.bytes().map(|b| u32::from(b - b'0')).collect();
    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();

    (10 - sum % 10) % 10 == digits[12]
}

fn validate_isbn_field(isbn: &str) -> Result<(), ValidationError> {
    if validate_isbn(isbn) {
        Ok(())
    } else {
        Err(ValidationError::new("isbn").with_message("Invalid ISBN checksum".into()))
    }
}

fn validate_copy_counts(data: &CreateBook) -> Result<(), ValidationError> {
    if data.available_copies > data.total_copies {
        return Err(ValidationError::new("copies")
            .with_message("Available copies cannot exceed total copies".into()));
    }
    Ok(())
}

/// Book with display fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    pub id: Uuid,
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub available_copies: i32,
    pub total_copies: i32,
    pub author_id: Uuid,
    pub author_name: Option<String>,
}

impl BookDetails {
    pub fn new(book: Book, author_name: Option<String>) -> Self {
        Self {
            id: book.id,
            title: book.title,
            isbn: book.isbn,
            publication_year: book.publication_year,
            available_copies: book.available_copies,
            total_copies: book.total_copies,
            author_id: book.author_id,
            author_name,
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_copy_counts"))]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(
        length(min = 1, max = 20, message = "ISBN must be 1-20 characters"),
        custom(function = "validate_isbn_field")
    )]
    pub isbn: String,
    #[validate(range(min = 1000, max = 9999, message = "Publication year must be between 1000 and 9999"))]
    pub publication_year: i32,
    #[validate(range(min = 0, message = "Available copies cannot be negative"))]
    pub available_copies: i32,
    #[validate(range(min = 0, message = "Total copies cannot be negative"))]
    pub total_copies: i32,
    pub author_id: Uuid,
}

/// Update book request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(
        length(min = 1, max = 20, message = "ISBN must be 1-20 characters"),
        custom(function = "validate_isbn_field")
    )]
    pub isbn: Option<String>,
    #[validate(range(min = 1000, max = 9999, message = "Publication year must be between 1000 and 9999"))]
    pub publication_year: Option<i32>,
    #[validate(range(min = 0, message = "Available copies cannot be negative"))]
    pub available_copies: Option<i32>,
    #[validate(range(min = 0, message = "Total copies cannot be negative"))]
    pub total_copies: Option<i32>,
    pub author_id: Option<Uuid>,
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, utoipa::IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive title fragment
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(available: i32, total: i32) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: "The Hobbit".to_string(),
            isbn: "978-0-261-10221-7".to_string(),
            publication_year: 1937,
            available_copies: available,
            total_copies: total,
            author_id: Uuid::new_v4(),
            version: 0,
        }
    }

    #[test]
    fn test_borrow_decrements() {
        let mut b = book(2, 3);
        assert_eq!(b.borrow_copy(), Ok(()));
        assert_eq!(b.available_copies, 1);
    }

    #[test]
    fn test_borrow_without_copies_is_refused() {
        let mut b = book(0, 3);
        assert_eq!(b.borrow_copy(), Err(CopyError::NoCopiesAvailable));
        assert_eq!(b.available_copies, 0);
    }

    #[test]
    fn test_return_increments() {
        let mut b = book(1, 3);
        assert_eq!(b.return_copy(), Ok(()));
        assert_eq!(b.available_copies, 2);
    }

    #[test]
    fn test_return_on_full_shelf_is_refused() {
        let mut b = book(3, 3);
        assert_eq!(b.return_copy(), Err(CopyError::ExceedsTotalCopies));
        assert_eq!(b.available_copies, 3);
    }

    #[test]
    fn test_counters_stay_in_bounds() {
        let mut b = book(1, 2);
        // borrow, borrow (refused), return, return, return (refused), borrow
        let ops = [true, true, false, false, false, true];
        for borrow in ops {
            let _ = if borrow { b.borrow_copy() } else { b.return_copy() };
            assert!(b.has_consistent_copies(), "{} / {}", b.available_copies, b.total_copies);
        }
        assert_eq!(b.available_copies, 1);
    }

    #[test]
    fn test_zero_copy_book() {
        let mut b = book(0, 0);
        assert!(b.borrow_copy().is_err());
        assert!(b.return_copy().is_err());
        assert!(b.has_consistent_copies());
    }

    #[test]
    fn test_isbn13() {
        assert!(validate_isbn("9780261102217"));
        assert!(validate_isbn("978-0-261-10221-7"));
        assert!(validate_isbn("978 0 261 10221 7"));
        assert!(!validate_isbn("9780261102218"));
    }

    #[test]
    fn test_isbn10() {
        assert!(validate_isbn("0-306-40615-2"));
        assert!(validate_isbn("080442957X"));
        assert!(!validate_isbn("0306406153"));
        // X only allowed as check digit
        assert!(!validate_isbn("X306406152"));
    }

    #[test]
    fn test_isbn_wrong_length_or_empty() {
        assert!(!validate_isbn(""));
        assert!(!validate_isbn("   "));
        assert!(!validate_isbn("12345"));
        assert!(!validate_isbn("97802611022171"));
    }

    #[test]
    fn test_create_book_validation() {
        let valid = CreateBook {
            title: "The Hobbit".to_string(),
            isbn: "9780261102217".to_string(),
            publication_year: 1937,
            available_copies: 2,
            total_copies: 3,
            author_id: Uuid::new_v4(),
        };
        assert!(valid.validate().is_ok());

        let bad_isbn = CreateBook {
            isbn: "9780261102218".to_string(),
            ..valid.clone()
        };
        assert!(bad_isbn.validate().is_err());

        let too_many = CreateBook {
            available_copies: 4,
            ..valid.clone()
        };
        assert!(too_many.validate().is_err());

        let old = CreateBook {
            publication_year: 999,
            ..valid
        };
        assert!(old.validate().is_err());
    }

    #[test]
    fn test_apply_update() {
        let mut b = book(1, 3);
        b.apply(UpdateBook {
            total_copies: Some(5),
            available_copies: Some(4),
            ..Default::default()
        });
        assert_eq!((b.available_copies, b.total_copies), (4, 5));
        assert_eq!(b.title, "The Hobbit");

        b.apply(UpdateBook {
            total_copies: Some(2),
            ..Default::default()
        });
        assert!(!b.has_consistent_copies());
    }
}
