use crate::db::LocalStore;
use crate::handlers::{accounts, books};
use crate::remote::{SharedBlobs, SharedRemote};
use crate::service::accounts::AccountService;
use crate::service::library::LibraryService;
use crate::service::shelf_actor::ShelfSlot;
use crate::session::SessionStore;
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

/// Shared state behind every route.
#[derive(Clone)]
pub struct ShelfState {
    pub accounts: AccountService,
    pub library: LibraryService,
    pub sessions: SessionStore,
    pub shelf: ShelfSlot,
    pub page_size: usize,
}

impl ShelfState {
    pub fn new(
        local: LocalStore,
        remote: SharedRemote,
        blobs: SharedBlobs,
        sessions: SessionStore,
        page_size: usize,
    ) -> Self {
        Self {
            accounts: AccountService::new(local.clone(), remote.clone(), sessions.clone()),
            library: LibraryService::new(local, remote, blobs),
            sessions,
            shelf: ShelfSlot::new(),
            page_size: page_size.max(1),
        }
    }
}

pub fn shelf_router(state: ShelfState) -> Router {
    Router::new()
        .route("/login", get(accounts::login_page).post(accounts::login))
        .route("/signup", post(accounts::signup))
        .route("/logout", post(accounts::logout))
        .route("/account", get(accounts::account))
        .route("/deposit", post(accounts::deposit))
        .route("/withdraw", post(accounts::withdraw))
        .route("/books", get(books::list).post(books::add))
        .route("/books/page", get(books::page))
        .route("/books/search", get(books::search))
        .route("/books/{key}", delete(books::remove))
        .route("/books/{key}/status", patch(books::update_status))
        .route("/books/{key}/cover", put(books::update_cover))
        .with_state(state)
}
