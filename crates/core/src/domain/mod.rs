// Domain Layer - Pure business logic and entities

pub mod error;
pub mod event;
pub mod intent;
pub mod occurrence;
pub mod roster;
pub mod subject;

// Re-exports
pub use error::DomainError;
pub use event::{NotificationOpened, OutboundEvent, QueueSnapshot};
pub use intent::{Intent, IntentKind, IntentReply};
pub use occurrence::{next_occurrence, Occurrence, WeeklySlot};
pub use roster::{Roster, UserMapping};
pub use subject::{parse_weekday, Subject, SubjectCatalog};
