use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use turnstile_server::config::Config;
use turnstile_server::routes::create_routes;
use turnstile_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    tokio::fs::create_dir_all(&config.artifact_dir)
        .await
        .expect("Failed to create artifact directory");

    let state = AppState::new(pool, &config).expect("Failed to build application state");
    let app: Router = create_routes(state);

    let addr = config.bind_addr();
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
