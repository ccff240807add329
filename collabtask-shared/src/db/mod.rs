/// Database layer for collabtask
///
/// PostgreSQL connection pooling and schema migrations used by
/// [`crate::store::PgStore`].
///
/// # Example
///
/// ```no_run
/// use collabtask_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
