pub mod comment_service;
pub mod conversation_service;
pub mod event_search_service;
pub mod event_service;
pub mod follow_service;
pub mod profile_service;
pub mod relation_toggle;
pub mod saved_event_service;
pub mod session_context;

pub use comment_service::CommentService;
pub use conversation_service::{ConversationService, RealtimeWatch, normalize_conversation};
pub use event_search_service::{EventSearchService, SearchResults};
pub use event_service::{EventService, EventServiceSettings};
pub use follow_service::FollowService;
pub use profile_service::ProfileService;
pub use relation_toggle::{PendingToggle, RelationToggleController};
pub use saved_event_service::SavedEventService;
pub use session_context::SessionContext;
