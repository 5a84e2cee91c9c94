pub mod base;
pub mod dashboard;
pub mod filtering;
pub mod settings;

pub use base::{View, ViewContext};
pub use dashboard::DashboardView;
pub use filtering::FilteringView;
pub use settings::SettingsView;
