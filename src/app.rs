use crate::api::ProfilerApi;
use crate::config::Config;
use crate::messages::{endpoint_channel, EndpointFilter, EndpointReceiver};
use crate::tab_manager::TabManager;
use crate::tabs::{DashboardView, FilteringView, SettingsView, View, ViewContext};
use crate::tui_manager::{Banner, TuiManager};
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{info, warn};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;
use std::sync::Arc;
use std::time::Instant;

pub const DASHBOARD_TAB: usize = 0;
pub const FILTERING_TAB: usize = 1;
pub const SETTINGS_TAB: usize = 2;

pub struct App {
    should_quit: bool,
    tab_manager: TabManager,
    ctx: ViewContext,
    endpoint_rx: EndpointReceiver,
    banner: Option<Banner>,
    tui_manager: TuiManager,
}

impl App {
    pub fn new(api: Arc<dyn ProfilerApi>, config: Config) -> Self {
        let (endpoint_tx, endpoint_rx) = endpoint_channel();

        let mut tab_manager = TabManager::new();
        tab_manager.register("Dashboard", || Box::new(DashboardView::new()) as Box<dyn View>);
        tab_manager.register("Filtering", || Box::new(FilteringView::new()) as Box<dyn View>);
        tab_manager.register("Settings", || Box::new(SettingsView::new()) as Box<dyn View>);

        Self {
            should_quit: false,
            tab_manager,
            ctx: ViewContext {
                api,
                config,
                endpoint_tx,
            },
            endpoint_rx,
            banner: None,
            tui_manager: TuiManager::new(),
        }
    }

    /// Activates the first tab. Needs a tokio runtime.
    pub fn start(&mut self) {
        self.switch_tab(DASHBOARD_TAB);
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn tab_manager(&mut self) -> &mut TabManager {
        &mut self.tab_manager
    }

    pub fn current_tab(&self) -> Option<usize> {
        self.tab_manager.current_tab()
    }

    pub fn switch_tab(&mut self, index: usize) -> bool {
        self.tab_manager.switch_tab(index, &self.ctx)
    }

    pub fn handle_input(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return;
        }

        let captured = self
            .tab_manager
            .current_view()
            .map_or(false, |view| view.captures_input());

        if !captured {
            match key.code {
                KeyCode::Tab => {
                    self.tab_manager.next_tab(&self.ctx);
                    return;
                }
                KeyCode::BackTab => {
                    self.tab_manager.previous_tab(&self.ctx);
                    return;
                }
                KeyCode::Char('q') => {
                    self.quit();
                    return;
                }
                KeyCode::Esc if self.banner.is_some() => {
                    self.banner = None;
                    return;
                }
                _ => {}
            }
        }

        if let Some(view) = self.tab_manager.current_view_mut() {
            view.handle_input(key);
        }
        self.route_messages();
    }

    /// Applies finished background work and cross-view messages.
    pub fn tick(&mut self) {
        if let Some(view) = self.tab_manager.current_view_mut() {
            if let Some(banner) = view.tick().pop() {
                self.banner = Some(banner);
            }
        }
        self.route_messages();

        if self
            .banner
            .as_ref()
            .map_or(false, |banner| banner.is_expired(Instant::now()))
        {
            self.banner = None;
        }
    }

    pub fn show_banner(&mut self, banner: Banner) {
        self.banner = Some(banner);
    }

    fn route_messages(&mut self) {
        while let Ok(filter) = self.endpoint_rx.try_recv() {
            self.deliver_endpoint_filter(filter);
        }
    }

    fn deliver_endpoint_filter(&mut self, filter: EndpointFilter) {
        info!("routing endpoint filter {:?} to the filtering view", filter);
        self.switch_tab(FILTERING_TAB);
        match self.tab_manager.view_as::<FilteringView>(FILTERING_TAB) {
            Some(view) => {
                view.apply_endpoint_filter(filter);
            }
            None => warn!("filtering view is not available"),
        }
    }

    fn summary_text(&self) -> String {
        format!(
            "Profiler: {} | Rows: {} | Update: {}",
            self.ctx.config.base_url,
            self.ctx.config.page_size,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        let banner_height = if self.banner.is_some() { 3 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Length(banner_height),
                    Constraint::Min(0),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(frame.area());

        let header_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
            .split(chunks[0]);

        let selected = self.tab_manager.current_tab().unwrap_or(0);
        frame.render_widget(
            self.tui_manager
                .draw_tabs(self.tab_manager.tab_names().to_vec(), selected, "Tabs"),
            header_chunks[0],
        );
        let summary = self.summary_text();
        frame.render_widget(self.tui_manager.draw_summary(&summary), header_chunks[1]);

        if let Some(banner) = &self.banner {
            frame.render_widget(self.tui_manager.draw_banner(banner), chunks[1]);
        }

        let help = self
            .tab_manager
            .current_view()
            .map(|view| view.help())
            .unwrap_or("");
        let help = format!("Tab/Shift+Tab: switch view | q: quit | {}", help);

        if let Some(view) = self.tab_manager.current_view_mut() {
            view.draw(frame, chunks[2]);
        }
        frame.render_widget(self.tui_manager.draw_help(&help), chunks[3]);
    }

    pub fn quit(&mut self) {
        self.tab_manager.shutdown();
        self.should_quit = true;
    }
}
