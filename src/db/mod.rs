pub mod models;
pub mod repo;

pub use repo::Repo;

/// Embedded migrations, shared by the binary and by DB-backed tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
