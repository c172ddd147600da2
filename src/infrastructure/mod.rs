pub mod auth;
pub mod cache;
pub mod database;
pub mod realtime;
pub mod storage;

pub use auth::LocalAuthGateway;
pub use cache::LruQueryCache;
pub use database::{ConnectionPool, SqliteGateway};
pub use realtime::BroadcastRealtime;
pub use storage::FileBlobStorage;
