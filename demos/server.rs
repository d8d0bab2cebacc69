//! Demo server: a `Person` model served over the generic CRUD routes.
//!
//! Run from repo root: `cargo run --example server`
//! With `DATABASE_URL` set, records live in Postgres (table `<schema>.people`),
//! otherwise in memory.

use model_rest::{
    common_routes, ApiConfig, ApiState, Driver, Format, MemoryDriver, Model, ModelController,
    PgDriver, Rule,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Person {
    #[serde(default)]
    id: Option<i64>,
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    age: Option<i32>,
}

impl Model for Person {
    const NAME: &'static str = "Person";
    const TABLE: &'static str = "people";
    const PROPERTIES: &'static [&'static str] = &["id", "name", "email", "age"];
    const MUTABLE: &'static [&'static str] = &["name", "email", "age"];

    fn rules() -> Vec<(&'static str, Rule)> {
        vec![
            ("name", Rule::new().required().length(1, 100)),
            ("email", Rule::new().format(Format::Email)),
            ("age", Rule::new().range(0.0, 150.0)),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("model_rest=debug,server=info")),
        )
        .init();

    let config = ApiConfig::from_env()?;
    let driver: Arc<dyn Driver> = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            tracing::info!(schema = %config.schema, "using postgres driver");
            Arc::new(PgDriver::new(pool, config.schema.clone()))
        }
        None => {
            let memory = MemoryDriver::new();
            let seed = json!({ "id": 1, "name": "Ada Lovelace", "email": "ada@example.com", "age": 36 });
            if let serde_json::Value::Object(record) = seed {
                memory.seed(Person::TABLE, [record])?;
            }
            tracing::info!("DATABASE_URL not set, using in-memory driver");
            Arc::new(memory)
        }
    };

    let bind = config.bind;
    let state = ApiState::new(driver, config);
    let app = ModelController::<Person>::routes("people", state).merge(common_routes());

    let listener = TcpListener::bind(bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
