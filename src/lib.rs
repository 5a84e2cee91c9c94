pub mod api;
pub mod app;
pub mod charts;
pub mod config;
pub mod dropdown;
pub mod error;
pub mod helpers;
pub mod messages;
pub mod pagination;
pub mod query_state;
pub mod render;
pub mod tab_manager;
pub mod table;
pub mod tabs;
pub mod tui_manager;
