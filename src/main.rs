use axum::{
    routing::{delete, get, post, put},
    Router,
};
use jobportal_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::auth,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let public_api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/users", post(routes::user::register_user));

    let portal_api = Router::new()
        .route("/api/users/:id", get(routes::user::get_user))
        .route("/api/jobs", get(routes::job::list_jobs))
        .route("/api/jobs/:id", get(routes::job::get_job))
        .route(
            "/api/provider/jobs",
            get(routes::job::list_provider_jobs).post(routes::job::create_job),
        )
        .route("/api/provider/jobs/:id", delete(routes::job::delete_job))
        .route("/api/jobs/:id/apply", post(routes::application::apply))
        .route(
            "/api/jobs/:id/applicants",
            get(routes::application::job_applicants),
        )
        .route(
            "/api/applications/mine",
            get(routes::application::my_applications),
        )
        .route(
            "/api/applications/:id/seeker-accept",
            put(routes::application::seeker_accept),
        )
        .route(
            "/api/applications/:id/provider-accept",
            put(routes::application::provider_accept),
        )
        .route(
            "/api/applications/:id/reject",
            put(routes::application::provider_reject),
        )
        .route("/api/applications/:id", delete(routes::application::withdraw))
        .route(
            "/api/applications/:id/hide/seeker",
            put(routes::application::hide_for_seeker),
        )
        .route(
            "/api/applications/:id/hide/provider",
            put(routes::application::hide_for_provider),
        )
        .route(
            "/api/applications/:id/channel",
            post(routes::application::ensure_channel),
        )
        .route(
            "/api/chat/:channel_id/messages",
            get(routes::chat::get_messages).post(routes::chat::send_message),
        )
        .route(
            "/api/chat/:channel_id/unread",
            get(routes::chat::get_unread_count),
        )
        .route("/api/chat/:channel_id/read", put(routes::chat::mark_read))
        .route(
            "/api/chat/:channel_id/partner",
            get(routes::chat::get_partner),
        )
        .layer(axum::middleware::from_fn(auth::require_bearer_auth));

    let admin_api = Router::new()
        .route(
            "/api/admin/applications",
            get(routes::admin::list_application_records),
        )
        .layer(axum::middleware::from_fn(auth::require_admin));

    let app = public_api
        .merge(portal_api)
        .merge(admin_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
