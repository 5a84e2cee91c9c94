use crate::api::ProfilerApi;
use crate::config::Config;
use crate::messages::EndpointSender;
use crate::tui_manager::Banner;
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};
use std::sync::Arc;

/// Everything a view needs from the application when it is (re)initialised.
#[derive(Clone)]
pub struct ViewContext {
    pub api: Arc<dyn ProfilerApi>,
    pub config: Config,
    /// Dashboard → filtering view.
    pub endpoint_tx: EndpointSender,
}

/// A top-level screen driven by the tab manager.
pub trait View: Send + 'static {
    /// Called on every activation. Starts the view's loads.
    fn init(&mut self, ctx: &ViewContext);

    /// Called before another view is initialised. Releases charts, tables and
    /// timers created by `init`.
    fn cleanup(&mut self);

    fn draw(&mut self, frame: &mut Frame, area: Rect);

    /// Returns whether the key was consumed.
    fn handle_input(&mut self, key: KeyEvent) -> bool;

    /// Applies finished background work. Returned banners are shown by the app.
    fn tick(&mut self) -> Vec<Banner> {
        Vec::new()
    }

    /// While true, global shortcuts (tab switching, quit) are not applied.
    fn captures_input(&self) -> bool {
        false
    }

    /// Key hints for the status line.
    fn help(&self) -> &'static str {
        ""
    }

    /// Get mutable reference as Any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
