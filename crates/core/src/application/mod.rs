// Application Layer - Use Cases and Business Logic

pub mod notification;
pub mod queue_service;
pub mod queue_store;
pub mod reconcile;
pub mod shutdown;

// Re-exports
pub use notification::{NotificationScheduler, NotifyOutcome, SchedulerConfig};
pub use queue_service::QueueService;
pub use queue_store::{JoinAdmission, QueueInfo, QueueStore};
pub use reconcile::Reconciler;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
