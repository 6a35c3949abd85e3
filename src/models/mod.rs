//! Data models for the library server

pub mod book;
pub mod borrow;
pub mod id;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use borrow::{Borrow, BorrowHistory, BorrowStat, OverdueReportItem};
pub use id::{parse_id, ObjectId};
pub use user::{Role, User};
