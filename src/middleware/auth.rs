use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::router::ShelfState;
use crate::session::Session;

/// Guard for routes that need a signed-in user.
///
/// Without a session the request is redirected to `/login` before the
/// handler runs, so nothing protected is fetched.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl FromRequestParts<ShelfState> for RequireSession {
    type Rejection = Response;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ShelfState,
    ) -> Result<Self, Self::Rejection> {
        // NotAuthenticated renders as the redirect
        state
            .sessions
            .require()
            .await
            .map(Self)
            .map_err(IntoResponse::into_response)
    }
}
