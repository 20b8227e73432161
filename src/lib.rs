//! Notification pipeline for the UMKM Predict commodity dashboard.
//!
//! Mirrors a user's notification feed out of local storage, generates price,
//! stock, and category alerts from commodity predictions, and routes fresh
//! arrivals to toasts, desktop notifications, and the unread badge.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod generator;
pub mod notify;
pub mod store;
pub mod trend;
pub mod worker;
