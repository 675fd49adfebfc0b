//! Data models for the library catalog

pub mod author;
pub mod book;
pub mod loan;

// Re-export commonly used types
pub use author::{Author, AuthorDetails};
pub use book::{Book, BookDetails, CopyError};
pub use loan::{Loan, LoanDetails, LoanStatus};
