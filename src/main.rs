use mimalloc::MiMalloc;
use shelfbank::db::LocalStore;
use shelfbank::session::SessionStore;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &shelfbank::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        session_path = %cfg.basic.session_path.display(),
        remote_backend = ?cfg.remote.backend,
        page_size = cfg.shelf.page_size,
        loglevel = %cfg.basic.loglevel,
    );

    let local = LocalStore::connect(&cfg.basic.database_url).await?;
    let (remote, blobs) = shelfbank::remote::build(&cfg.remote)?;
    let sessions = SessionStore::new(cfg.basic.session_path.clone());

    match sessions.load().await {
        Ok(Some(session)) if session.logged_in => {
            info!(user_id = session.user_id, "resuming saved session");
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "saved session unreadable; sign-in required"),
    }

    let state = shelfbank::ShelfState::new(local, remote, blobs, sessions, cfg.shelf.page_size);
    let shelf = state.shelf.clone();
    let app = shelfbank::shelf_router(state);

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    shelf.close().await;
    Ok(())
}
