//! # Database Operations
//!
//! Persistence for the promotion core.
//!
//! ## Key Components
//!
//! - [`gateway`] - The `PromotionGateway` / `GatewayTransaction` seam
//! - [`pg_gateway`] - Postgres implementation over SQLx
//! - [`in_memory`] - Mutex-guarded tables with the same constraints, for tests
//!   and embedding
//! - [`errors`] - Tagged persistence errors mapped from SQLSTATE codes
//! - [`connection`] / [`migrations`] - Pool setup and schema management
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use promotion_core::config::PromotionConfig;
//! use promotion_core::database::{DatabaseConnection, DatabaseMigrations, PgPromotionGateway};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PromotionConfig::from_env()?;
//! let db = DatabaseConnection::new(&config).await?;
//! DatabaseMigrations::run_all(db.pool()).await?;
//! let gateway = PgPromotionGateway::new(db.pool().clone());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod errors;
pub mod gateway;
pub mod in_memory;
pub mod migrations;
pub mod pg_gateway;

pub use connection::DatabaseConnection;
pub use errors::{GatewayError, GatewayResult};
pub use gateway::{GatewayTransaction, PromotionGateway};
pub use in_memory::InMemoryGateway;
pub use migrations::DatabaseMigrations;
pub use pg_gateway::PgPromotionGateway;
