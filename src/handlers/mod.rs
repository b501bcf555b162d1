pub mod export_handler;
pub mod health;
pub mod login_handler;
pub mod metrics;
pub mod student_handler;
pub mod teacher_handler;

pub use health::health_check;
pub use metrics::{metrics_handler, setup_metrics_recorder, MetricsState};

/// The school day check-ins are filed under.
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
