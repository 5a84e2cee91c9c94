use super::base::{View, ViewContext};
use crate::api::ProfilerApi;
use crate::config::Config;
use crate::error::LoadError;
use crate::tui_manager::{Banner, TuiManager, HEADER_STYLE, MUTED_STYLE, TEXT_FG_COLOR};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use log::{error, info};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// `profiler-dump-<timestamp>.json`.
pub fn dump_file_name(now: DateTime<Local>) -> String {
    format!("profiler-dump-{}.json", now.format("%Y%m%d-%H%M%S"))
}

/// Writes `dump` as pretty JSON into `dir`; returns the written path.
pub async fn write_dump(dir: &Path, dump: &Value, now: DateTime<Local>) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("cannot create {}", dir.display()))?;
    let path = dir.join(dump_file_name(now));
    let body = serde_json::to_vec_pretty(dump).context("cannot serialise dump")?;
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

enum SettingsEvent {
    Dumped(Result<PathBuf, String>),
    Cleared(Result<bool, LoadError>),
}

/// Client configuration plus database export / clear actions.
pub struct SettingsView {
    api: Option<Arc<dyn ProfilerApi>>,
    config: Config,
    confirming: bool,
    busy: bool,
    tx: UnboundedSender<SettingsEvent>,
    rx: UnboundedReceiver<SettingsEvent>,
    tui_manager: TuiManager,
}

impl Default for SettingsView {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsView {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api: None,
            config: Config::default(),
            confirming: false,
            busy: false,
            tx,
            rx,
            tui_manager: TuiManager::new(),
        }
    }

    pub fn is_confirming(&self) -> bool {
        self.confirming
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Fetches the database dump and writes it into the dump directory.
    pub fn dump_database(&mut self) -> bool {
        let Some(api) = self.api.clone() else {
            return false;
        };
        if self.busy {
            return false;
        }
        self.busy = true;
        let dir = self.config.dump_dir.clone();
        let timeout = self.config.timeout;
        let tx = self.tx.clone();
        info!("dumping database to {}", dir.display());

        tokio::spawn(async move {
            let dump = match tokio::time::timeout(timeout, api.dump_database()).await {
                Ok(result) => result,
                Err(_) => Err(LoadError::Timeout(timeout)),
            };
            let outcome = match dump {
                Ok(value) => write_dump(&dir, &value, Local::now())
                    .await
                    .map_err(|e| format!("{:#}", e)),
                Err(err) => Err(err.to_string()),
            };
            let _ = tx.send(SettingsEvent::Dumped(outcome));
        });
        true
    }

    /// Asks for confirmation before clearing.
    pub fn request_clear(&mut self) {
        if self.api.is_some() && !self.busy {
            self.confirming = true;
        }
    }

    pub fn cancel_clear(&mut self) {
        self.confirming = false;
    }

    pub fn confirm_clear(&mut self) -> bool {
        if !self.confirming {
            return false;
        }
        self.confirming = false;
        let Some(api) = self.api.clone() else {
            return false;
        };
        self.busy = true;
        let timeout = self.config.timeout;
        let tx = self.tx.clone();
        info!("clearing profiler database");

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, api.delete_database()).await {
                Ok(result) => result,
                Err(_) => Err(LoadError::Timeout(timeout)),
            };
            let _ = tx.send(SettingsEvent::Cleared(result));
        });
        true
    }

    fn apply(&mut self, event: SettingsEvent) -> Banner {
        self.busy = false;
        match event {
            SettingsEvent::Dumped(Ok(path)) => {
                info!("database dumped to {}", path.display());
                Banner::success(format!("Database exported to {}", path.display()))
            }
            SettingsEvent::Dumped(Err(err)) => {
                error!("database dump failed: {}", err);
                Banner::error(format!("Export failed: {}", err))
            }
            SettingsEvent::Cleared(Ok(true)) => Banner::success("Database cleared"),
            SettingsEvent::Cleared(Ok(false)) => Banner::error("The profiler refused to clear the database"),
            SettingsEvent::Cleared(Err(err)) => {
                error!("database clear failed: {}", err);
                Banner::error(format!("Clear failed: {}", err))
            }
        }
    }

    /// Waits for the running action, if any.
    pub async fn settle(&mut self) -> Vec<Banner> {
        let mut banners = Vec::new();
        while self.busy {
            match self.rx.recv().await {
                Some(event) => banners.push(self.apply(event)),
                None => break,
            }
        }
        banners
    }
}

impl View for SettingsView {
    fn init(&mut self, ctx: &ViewContext) {
        self.api = Some(Arc::clone(&ctx.api));
        self.config = ctx.config.clone();
        self.confirming = false;
    }

    fn cleanup(&mut self) {
        self.confirming = false;
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(0)].as_ref())
            .split(area);

        let lines: Vec<Line> = self
            .config
            .summary()
            .into_iter()
            .map(|(name, value)| {
                Line::from(vec![
                    Span::styled(format!("{:<16}", name), HEADER_STYLE),
                    Span::styled(value, Style::new().fg(TEXT_FG_COLOR)),
                ])
            })
            .collect();
        frame.render_widget(
            Paragraph::new(lines).block(self.tui_manager.panel("Configuration")),
            chunks[0],
        );

        let mut actions = vec![
            Line::from(vec![
                Span::styled("d  ", HEADER_STYLE),
                Span::raw("Export the profiler database to a JSON file"),
            ]),
            Line::from(vec![
                Span::styled("x  ", HEADER_STYLE),
                Span::raw("Clear every stored measurement"),
            ]),
        ];
        if self.busy {
            actions.push(Line::from(""));
            actions.push(Line::from(Span::styled("⟳ Working…", MUTED_STYLE)));
        }
        frame.render_widget(
            Paragraph::new(actions).block(self.tui_manager.panel("Database")),
            chunks[1],
        );

        if self.confirming {
            self.tui_manager.draw_confirm(
                frame,
                "Clear database",
                "Delete all profiler measurements? This cannot be undone.",
            );
        }
    }

    fn handle_input(&mut self, key: KeyEvent) -> bool {
        if self.confirming {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirm_clear();
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.cancel_clear(),
                _ => {}
            }
            return true;
        }
        match key.code {
            KeyCode::Char('d') => self.dump_database(),
            KeyCode::Char('x') => {
                self.request_clear();
                true
            }
            _ => false,
        }
    }

    fn tick(&mut self) -> Vec<Banner> {
        let mut banners = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            banners.push(self.apply(event));
        }
        banners
    }

    fn captures_input(&self) -> bool {
        self.confirming
    }

    fn help(&self) -> &'static str {
        if self.confirming {
            "y: confirm | n/Esc: cancel"
        } else {
            "d: export database | x: clear database"
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
