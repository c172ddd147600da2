pub mod comment;
pub mod conversation;
pub mod event;
pub mod event_report;
pub mod message;
pub mod profile;
pub mod session;

pub use comment::{Comment, CommentWithAuthor, NewComment};
pub use conversation::{ConversationRecord, ConversationView, Participant, ParticipantPair};
pub use event::{Address, Event, EventDraft, NewEvent};
pub use event_report::{EventReport, NewEventReport, ReportListing, ReportPage};
pub use message::{Message, MessageWithSender, NewMessage};
pub use profile::{Profile, ProfileDraft, ProfileSummary};
pub use session::{AuthEvent, Credentials, Session, SessionState, SignUpOutcome};
