pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod remote;
pub mod router;
pub mod service;
pub mod session;
pub mod types;

pub use error::ShelfError;
pub use router::{ShelfState, shelf_router};
