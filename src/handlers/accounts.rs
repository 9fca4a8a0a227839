use crate::error::ShelfError;
use crate::middleware::RequireSession;
use crate::router::ShelfState;
use crate::types::{AccountView, AmountForm, BalanceOutcome, LoginForm, SignupForm};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tracing::info;

/// GET /login -> who is signed in, or an empty login prompt.
pub async fn login_page(State(state): State<ShelfState>) -> Result<Response, ShelfError> {
    match state.sessions.require().await {
        Ok(_) => Ok(Redirect::to("/books").into_response()),
        Err(ShelfError::NotAuthenticated) => {
            Ok(Json(json!({ "signedIn": false, "fields": ["email", "password"] })).into_response())
        }
        Err(e) => Err(e),
    }
}

/// POST /signup -> creates the account with the starting balance.
pub async fn signup(
    State(state): State<ShelfState>,
    Json(form): Json<SignupForm>,
) -> Result<impl IntoResponse, ShelfError> {
    let id = state.accounts.signup(form).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// POST /login -> persists a session on success.
pub async fn login(
    State(state): State<ShelfState>,
    Json(form): Json<LoginForm>,
) -> Result<impl IntoResponse, ShelfError> {
    let session = state.accounts.login(&form.email, &form.password).await?;
    // a different user may have been signed in before
    state.shelf.close().await;
    Ok(Json(session))
}

/// POST /logout -> closes the shelf listener and forgets the session.
pub async fn logout(State(state): State<ShelfState>) -> Result<StatusCode, ShelfError> {
    state.shelf.close().await;
    state.accounts.logout().await?;
    info!("signed out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn account(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
) -> Result<Json<AccountView>, ShelfError> {
    Ok(Json(state.accounts.account(&session).await?))
}

pub async fn deposit(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
    Json(form): Json<AmountForm>,
) -> Result<Json<BalanceOutcome>, ShelfError> {
    Ok(Json(state.accounts.deposit(&session, &form.amount).await?))
}

pub async fn withdraw(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
    Json(form): Json<AmountForm>,
) -> Result<Json<BalanceOutcome>, ShelfError> {
    Ok(Json(state.accounts.withdraw(&session, &form.amount).await?))
}
