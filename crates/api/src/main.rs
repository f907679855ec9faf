use std::sync::Arc;

use taskforge_engine::jobs::{InMemoryJobStore, JobStore, PostgresJobStore};

#[tokio::main]
async fn main() {
    taskforge_observability::init();

    let store: Arc<dyn JobStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(8)
                .connect(&url)
                .await
                .expect("failed to connect to DATABASE_URL");
            let store = PostgresJobStore::new(pool);
            store
                .ensure_schema()
                .await
                .expect("failed to ensure jobs schema");
            tracing::info!("using postgres job store");
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, jobs are lost on restart");
            Arc::new(InMemoryJobStore::new())
        }
    };

    let app = taskforge_api::app::build_app(store);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind listen address");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
