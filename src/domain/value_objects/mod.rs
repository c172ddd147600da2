pub mod event_filters;
pub mod event_kind;
pub mod identifiers;
pub mod relation;

pub use event_filters::{DateRange, EventFilters, PriceRange};
pub use event_kind::{EventType, Visibility};
pub use identifiers::{CommentId, ConversationId, EventId, MessageId, ReportId, UserId};
pub use relation::{RelationCount, RelationKey};
