mod env;

#[cfg(feature = "postgres")]
mod sqlx_postgres;

pub use env::*;

#[cfg(feature = "postgres")]
pub use sqlx_postgres::*;

// paths used by `init_databases!` in downstream crates
#[doc(hidden)]
pub use tokio;
#[doc(hidden)]
pub use tracing;
#[cfg(feature = "postgres")]
#[doc(hidden)]
pub use sqlx;
