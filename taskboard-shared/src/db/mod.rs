/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: Embedded migration runner for the `tasks` table and its
///   change-notification trigger
///
/// Task queries live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
