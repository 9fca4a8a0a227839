pub mod auth;

pub use auth::RequireSession;
