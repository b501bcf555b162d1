//! Minimal Google Sheets v4 client: service-account auth plus the handful of
//! value-range calls the spreadsheet store and the export need.

pub mod client;
pub mod credentials;

pub use client::SheetsClient;
pub use credentials::{load_service_account, ServiceAccountKey};
