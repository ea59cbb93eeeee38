// 駆動される側アダプター（リポジトリ実装、通知、ログなど）

mod in_memory_store;
mod log_notifier;
mod mysql_booking_repository;
mod mysql_class_repository;
mod system_clock;
mod tracing_logger;

pub use in_memory_store::InMemoryStore;
pub use log_notifier::LogNotifier;
pub use mysql_booking_repository::MySqlBookingRepository;
pub use mysql_class_repository::MySqlClassRepository;
pub use system_clock::SystemClock;
pub use tracing_logger::TracingLogger;
