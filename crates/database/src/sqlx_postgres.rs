use sqlx::{postgres::PgQueryResult, Executor, Postgres};

/// Trait to define the schema of a table for PostgreSQL.
///
/// Implemented by the row types of each store so that table creation is
/// declared next to the type that reads and writes it.
pub trait SqlxSchema {
    const TABLE_NAME: &'static str;
    const INDEXES_SQL: &'static [&'static str];

    fn table_name() -> &'static str { Self::TABLE_NAME }
    fn indexes_sql() -> &'static [&'static str] { Self::INDEXES_SQL }

    /// Example: "CREATE TABLE IF NOT EXISTS banners (id TEXT PRIMARY KEY, ...)"
    fn create_table_sql() -> String;

    fn drop_table_sql() -> String {
        format!("DROP TABLE IF EXISTS \"{}\" CASCADE;", Self::TABLE_NAME)
    }
}

/// SQLSTATE codes Postgres uses for transactions that lost a race and may be
/// retried from scratch.
pub const SERIALIZATION_FAILURE: &str = "40001";
pub const DEADLOCK_DETECTED: &str = "40P01";
/// Raised when `statement_timeout` cancels a statement.
pub const QUERY_CANCELED: &str = "57014";
/// A `CHECK` constraint rejected the row.
pub const CHECK_VIOLATION: &str = "23514";

pub fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

pub fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        sqlstate(err).as_deref(),
        Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
    )
}

/// Runs the create table statement and every index statement of `T`.
pub async fn create_schema<'e, T, E>(executor: E) -> Result<(), sqlx::Error>
where
    T: SqlxSchema,
    E: Executor<'e, Database = Postgres> + Copy,
{
    sqlx::query(&T::create_table_sql()).execute(executor).await?;
    for index_sql in T::INDEXES_SQL {
        sqlx::query(index_sql).execute(executor).await?;
    }
    Ok(())
}

pub async fn drop_schema<'e, T, E>(executor: E) -> Result<PgQueryResult, sqlx::Error>
where
    T: SqlxSchema,
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(&T::drop_table_sql()).execute(executor).await
}

/// Initializes the database connection pool for the application.
///
/// Generates `async fn connect(drop_tables: bool, create_tables: bool) -> &'static PgPool`,
/// connecting once to `DATABASE_URL` and creating the tables of every listed type.
///
/// # Example
/// ```rust,ignore
/// init_databases!(
///     default: [BannerRow, PlayerAccountRow]
/// );
///
/// #[tokio::main]
/// async fn main() {
///     let pool = connect(false, true).await;
/// }
/// ```
#[macro_export]
macro_rules! init_databases {
    (
        default: [$($default_type:ty),* $(,)?]
    ) => {
        static POOL: $crate::tokio::sync::OnceCell<$crate::sqlx::PgPool> =
            $crate::tokio::sync::OnceCell::const_new();

        async fn connect(drop_tables: bool, create_tables: bool) -> &'static $crate::sqlx::PgPool {
            POOL.get_or_init(|| async {
                let env = $crate::PostgresEnv::from_env();
                if env.database_url.is_empty() {
                    panic!("DATABASE_URL environment variable not set");
                }

                let pool = $crate::sqlx::postgres::PgPoolOptions::new()
                    .max_connections(env.max_connections)
                    .connect(&env.database_url)
                    .await
                    .expect("Failed to connect to default database");

                if drop_tables {
                    $(
                        if let Err(e) = $crate::drop_schema::<$default_type, _>(&pool).await {
                            $crate::tracing::warn!(
                                "Failed to drop table for '{}'. Error: {:?}",
                                stringify!($default_type),
                                e
                            );
                        }
                    )*
                }

                if create_tables {
                    $(
                        $crate::create_schema::<$default_type, _>(&pool).await
                            .unwrap_or_else(|e| {
                                panic!(
                                    "Failed to create table for '{}'. Error: {:?}",
                                    stringify!($default_type),
                                    e
                                )
                            });
                    )*
                }

                pool
            }).await
        }
    };
}
