use course_exam_backend::{
    build_router,
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    run_migrations(&pool).await?;

    let app_state = AppState::new(pool)?;
    info!(
        model = %config.gemini_model,
        min_questions = config.exam_min_questions,
        max_questions = config.exam_max_questions,
        generation_rpm = config.generation_rpm,
        "Exam services ready"
    );

    let app = build_router(app_state, config.generation_rpm)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
