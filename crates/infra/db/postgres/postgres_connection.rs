use std::time::Duration;

use anyhow::{Context, Result, ensure};
use diesel::{
    PgConnection,
    connection::SimpleConnection,
    r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
};

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// Server-side cap on every statement run through a pooled connection.
    pub statement_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            statement_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct StatementTimeout {
    millis: u128,
}

impl CustomizeConnection<PgConnection, R2d2Error> for StatementTimeout {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.batch_execute(&format!("SET statement_timeout = {}", self.millis))
            .map_err(R2d2Error::QueryError)
    }
}

pub fn establish_connection(database_url: &str, settings: &PoolSettings) -> Result<PgPoolSquad> {
    // r2d2 panics on a zero-sized pool.
    ensure!(settings.max_connections > 0, "postgres pool needs at least one connection");

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(settings.max_connections)
        .connection_customizer(Box::new(StatementTimeout {
            millis: settings.statement_timeout.as_millis(),
        }))
        .build(manager)
        .context("failed to build postgres connection pool")?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_pool_is_an_error() {
        let settings = PoolSettings {
            max_connections: 0,
            ..PoolSettings::default()
        };

        let err =
            establish_connection("postgres://unused@localhost/unused", &settings).unwrap_err();
        assert_eq!(err.to_string(), "postgres pool needs at least one connection");
    }
}
