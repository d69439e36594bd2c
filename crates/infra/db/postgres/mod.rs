pub mod cancellable;
pub mod postgres_connection;
pub mod schema;
