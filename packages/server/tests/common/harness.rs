//! Test harness with testcontainers for Postgres integration testing.
//!
//! A single pgvector container is shared across all tests in a binary.
//! It is started and migrated once on first use, then reused.

use std::sync::Arc;

use anyhow::{Context, Result};
use feedback_pipeline::stores::{LocalFileStore, PgVectorStore, PostgresStore};
use feedback_pipeline::testing::{MockEmbedder, MockLanguageModel};
use feedback_pipeline::PipelineDeps;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Matches the `vector(1536)` column in the migrations.
pub const EMBEDDING_DIMENSIONS: usize = 1536;

struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_name("pgvector/pgvector")
            .with_tag("pg16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Postgres-backed dependencies with mock model and embedder.
pub struct TestHarness {
    pub db_pool: PgPool,
    pub deps: PipelineDeps,
    _storage_dir: tempfile::TempDir,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_model(MockLanguageModel::new()).await
    }

    pub async fn with_model(model: MockLanguageModel) -> Result<Self> {
        let infra = SharedTestInfra::get().await;
        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;
        let storage_dir = tempfile::tempdir().context("Failed to create storage dir")?;

        let store = Arc::new(PostgresStore::new(db_pool.clone()));
        let embedder = Arc::new(MockEmbedder::new().with_dimensions(EMBEDDING_DIMENSIONS));
        let deps = PipelineDeps::new(
            store.clone(),
            store,
            Arc::new(LocalFileStore::new(storage_dir.path())),
            Arc::new(PgVectorStore::new(db_pool.clone(), embedder)),
            Arc::new(model),
        );

        Ok(Self {
            db_pool,
            deps,
            _storage_dir: storage_dir,
        })
    }
}
