pub mod connection_pool;
pub mod sqlite_gateway;

pub use connection_pool::ConnectionPool;
pub use sqlite_gateway::SqliteGateway;
