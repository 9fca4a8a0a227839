pub mod accounts;
pub mod library;
pub mod merge;
pub mod shelf_actor;
pub mod validation;

pub use accounts::AccountService;
pub use library::LibraryService;
pub use merge::merge_by_key;
pub use shelf_actor::{ShelfHandle, ShelfSlot};
