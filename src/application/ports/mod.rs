pub mod auth_gateway;
pub mod blob_storage;
pub mod query_cache;
pub mod realtime;
pub mod repositories;

pub use auth_gateway::AuthGateway;
pub use blob_storage::{BlobStorage, ImageUpload};
pub use query_cache::{
    CacheGeneration, CachedValue, Invalidation, QueryCache, QueryKey, QueryScope,
};
pub use realtime::RealtimeChannel;
pub use repositories::{
    CommentRepository, ConversationRepository, EventQuery, EventRepository,
    ProfileRepository, RelationRepository, ReportRepository,
};
