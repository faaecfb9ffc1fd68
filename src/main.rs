mod chat;
mod database;
mod error;
mod handlers;
mod models;

use std::env;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use dotenvy::dotenv;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use chat::ChatService;
use database::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub chat: Arc<ChatService>,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    log::info!("Database connection successful");

    // Chat backend is resolved once from configuration: live provider when
    // a deployment is configured, deterministic offline replies otherwise.
    let chat = Arc::new(ChatService::from_env());

    let app = create_router(AppState { db, chat });

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Expensely server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn create_router(state: AppState) -> Router {
    Router::new()
        // Expense lifecycle
        .route(
            "/api/expenses",
            get(handlers::expenses::list_expenses).post(handlers::expenses::create_expense),
        )
        .route(
            "/api/expenses/:id",
            get(handlers::expenses::get_expense)
                .put(handlers::expenses::update_expense)
                .delete(handlers::expenses::delete_expense),
        )
        .route("/api/expenses/:id/submit", post(handlers::expenses::submit_expense))
        .route("/api/expenses/:id/approve", post(handlers::expenses::approve_expense))
        .route("/api/expenses/:id/reject", post(handlers::expenses::reject_expense))
        // Users
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/:id",
            get(handlers::users::get_user).put(handlers::users::update_user),
        )
        // Reference data
        .route("/api/lookups/categories", get(handlers::lookups::get_categories))
        .route("/api/lookups/statuses", get(handlers::lookups::get_statuses))
        .route("/api/lookups/roles", get(handlers::lookups::get_roles))
        // Chat assistant
        .route("/api/chat", post(handlers::chat::send_message))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
