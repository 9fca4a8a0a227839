//! Domain types shared by the stores, the sync layer and the HTTP surface.

pub mod account;
pub mod book;
pub mod catalog;

pub use account::{AccountView, AmountForm, BalanceOutcome, LoginForm, RemoteUser, SignupForm};
pub use book::{BookDraft, BookEntry, BookPage, CoverImage, RemoteBook, RemoteEntry};
pub use catalog::ReadingStatus;
