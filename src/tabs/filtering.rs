use super::base::{View, ViewContext};
use crate::api::{page_source, ProfilerApi, Row, MEASUREMENTS_ENDPOINT};
use crate::dropdown::{Dropdown, DropdownEvent};
use crate::error::LoadError;
use crate::helpers::{format_elapsed, format_timestamp, highlight_json, method_badge};
use crate::messages::EndpointFilter;
use crate::query_state::{FilterValue, Filters};
use crate::render::{ColumnSpec, RenderResult};
use crate::table::{Applied, ServerSideTable, TableOptions, DEFAULT_TIMEOUT};
use crate::tui_manager::{Banner, TuiManager, SELECTED_ITEM_STYLE, TEXT_FG_COLOR};
use arboard::Clipboard;
use chrono::{Local, NaiveDateTime, TimeZone};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info, warn};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::Paragraph,
    Frame,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_WINDOW_SECONDS: i64 = 7 * 24 * 3600;
pub const METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Method,
    Name,
    Elapsed,
    StartedAt,
    EndedAt,
}

impl FormField {
    const ORDER: [FormField; 5] = [
        FormField::Method,
        FormField::Name,
        FormField::Elapsed,
        FormField::StartedAt,
        FormField::EndedAt,
    ];

    fn title(&self) -> &'static str {
        match self {
            FormField::Method => "Method",
            FormField::Name => "Endpoint",
            FormField::Elapsed => "Min elapsed (s)",
            FormField::StartedAt => "From",
            FormField::EndedAt => "To",
        }
    }

    fn next(self) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(index + 1) % Self::ORDER.len()]
    }

    fn previous(self) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(index + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Table,
    Form(FormField),
}

/// Text inputs of the filter form. The method lives in the dropdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterForm {
    pub name: String,
    pub elapsed: String,
    pub started_at: String,
    pub ended_at: String,
}

impl FilterForm {
    /// Empty inputs with the date range set to the default window before `now`.
    pub fn with_default_range(now: i64) -> Self {
        Self {
            started_at: format_datetime(now - DEFAULT_WINDOW_SECONDS),
            ended_at: format_datetime(now),
            ..Self::default()
        }
    }

    fn input_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Method => None,
            FormField::Name => Some(&mut self.name),
            FormField::Elapsed => Some(&mut self.elapsed),
            FormField::StartedAt => Some(&mut self.started_at),
            FormField::EndedAt => Some(&mut self.ended_at),
        }
    }

    fn input(&self, field: FormField) -> &str {
        match field {
            FormField::Method => "",
            FormField::Name => &self.name,
            FormField::Elapsed => &self.elapsed,
            FormField::StartedAt => &self.started_at,
            FormField::EndedAt => &self.ended_at,
        }
    }

    /// Filter update for the table. Empty inputs clear their key; inputs
    /// that do not parse are left out so the previous constraint stays.
    pub fn to_filters(&self, method: &str) -> Filters {
        let mut filters = Filters::new();
        filters.set("method", text_value(method));
        filters.set("name", text_value(&self.name));

        match self.elapsed.trim() {
            "" => filters.set("elapsed", None),
            raw => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => filters.set("elapsed", Some(FilterValue::Float(value))),
                _ => debug!("ignoring elapsed input `{}`", raw),
            },
        }

        for (key, raw) in [("startedAt", &self.started_at), ("endedAt", &self.ended_at)] {
            match raw.trim() {
                "" => filters.set(key, None),
                raw => match parse_datetime(raw) {
                    Some(ts) => filters.set(key, Some(FilterValue::Int(ts))),
                    None => debug!("ignoring {} input `{}`", key, raw),
                },
            }
        }
        filters
    }
}

fn text_value(raw: &str) -> Option<FilterValue> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| FilterValue::Text(trimmed.to_string()))
}

pub fn format_datetime(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format(DATETIME_FORMAT).to_string(),
        None => String::new(),
    }
}

/// Local `%Y-%m-%d %H:%M:%S` to unix seconds.
pub fn parse_datetime(raw: &str) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), DATETIME_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

fn method_options() -> Vec<(String, String)> {
    std::iter::once((String::new(), "All methods".to_string()))
        .chain(METHODS.iter().map(|m| (m.to_string(), m.to_string())))
        .collect()
}

/// Measurement detail shown over the table.
pub struct DetailModal {
    pub id: String,
    pub value: Value,
    lines: Vec<Line<'static>>,
    scroll: u16,
}

impl DetailModal {
    fn new(id: String, value: Value) -> Self {
        let lines = highlight_json(&value);
        Self {
            id,
            value,
            lines,
            scroll: 0,
        }
    }

    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.value).unwrap_or_else(|_| self.value.to_string())
    }
}

struct DetailLoad {
    id: String,
    result: Result<Value, LoadError>,
}

/// Searchable list of individual measurements.
pub struct FilteringView {
    api: Option<Arc<dyn ProfilerApi>>,
    page_size: usize,
    timeout: Duration,
    table: Option<ServerSideTable>,
    form: FilterForm,
    method: Dropdown,
    focus: Focus,
    detail: Option<DetailModal>,
    detail_pending: Option<String>,
    open_tx: UnboundedSender<String>,
    open_rx: UnboundedReceiver<String>,
    detail_tx: UnboundedSender<DetailLoad>,
    detail_rx: UnboundedReceiver<DetailLoad>,
    banners: Vec<Banner>,
    tui_manager: TuiManager,
}

impl Default for FilteringView {
    fn default() -> Self {
        Self::new()
    }
}

impl FilteringView {
    pub fn new() -> Self {
        let (open_tx, open_rx) = mpsc::unbounded_channel();
        let (detail_tx, detail_rx) = mpsc::unbounded_channel();
        Self {
            api: None,
            page_size: 25,
            timeout: DEFAULT_TIMEOUT,
            table: None,
            form: FilterForm::default(),
            method: Dropdown::new(method_options()),
            focus: Focus::Table,
            detail: None,
            detail_pending: None,
            open_tx,
            open_rx,
            detail_tx,
            detail_rx,
            banners: Vec::new(),
            tui_manager: TuiManager::new(),
        }
    }

    pub fn table(&self) -> Option<&ServerSideTable> {
        self.table.as_ref()
    }

    pub fn table_mut(&mut self) -> Option<&mut ServerSideTable> {
        self.table.as_mut()
    }

    pub fn form(&self) -> &FilterForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FilterForm {
        &mut self.form
    }

    pub fn method(&self) -> &Dropdown {
        &self.method
    }

    pub fn detail(&self) -> Option<&DetailModal> {
        self.detail.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.focus, Focus::Form(_))
    }

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("method", "Method")
                .with_render(|value, _| RenderResult::Node(method_badge(value))),
            ColumnSpec::new("name", "Endpoint"),
            ColumnSpec::new("elapsed", "Duration")
                .with_render(|value, _| RenderResult::text(format_elapsed(value))),
            ColumnSpec::new("startedAt", "Started At")
                .with_render(|value, _| RenderResult::text(format_timestamp(value))),
            ColumnSpec::new("id", "Actions")
                .unsortable()
                .with_render(|_, _| RenderResult::text("View JSON ⏎")),
        ]
    }

    fn build_table(&self, api: Arc<dyn ProfilerApi>, now: i64) -> ServerSideTable {
        let open_tx = self.open_tx.clone();
        let on_row_click = move |row: &Row| {
            let id = match row.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => return,
            };
            let _ = open_tx.send(id);
        };

        let form = FilterForm::with_default_range(now);
        let options = TableOptions {
            page_size: self.page_size,
            default_sort: "endedAt,desc".to_string(),
            initial_filters: form.to_filters(""),
            columns: Self::columns(),
            on_row_click: Some(Box::new(on_row_click)),
            ..TableOptions::default()
        };
        ServerSideTable::new(MEASUREMENTS_ENDPOINT, options, page_source(api), self.timeout)
    }

    /// Pushes every form field into the table; pagination restarts.
    pub fn apply_filters(&mut self) -> bool {
        let filters = self.form.to_filters(self.method.value());
        match self.table.as_mut() {
            Some(table) => table.filter(filters),
            None => false,
        }
    }

    /// Clears the form, restores the default date range and reloads.
    pub fn reset_filters(&mut self) -> bool {
        self.method.sync("");
        self.method.close();
        self.form = FilterForm::with_default_range(Local::now().timestamp());
        let filters = self.form.to_filters("");
        info!("filters reset");
        match self.table.as_mut() {
            Some(table) => table.filter(filters),
            None => false,
        }
    }

    /// Narrows the table to one endpoint, as requested from the dashboard.
    pub fn apply_endpoint_filter(&mut self, filter: EndpointFilter) -> bool {
        self.form.name = filter.name;
        self.method.sync(&filter.method.to_ascii_uppercase());
        self.apply_filters()
    }

    /// Starts loading the detail of measurement `id`.
    pub fn open_detail(&mut self, id: String) {
        let Some(api) = self.api.clone() else {
            return;
        };
        self.detail_pending = Some(id.clone());
        let tx = self.detail_tx.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, api.measurement(&id)).await {
                Ok(result) => result,
                Err(_) => Err(LoadError::Timeout(timeout)),
            };
            let _ = tx.send(DetailLoad { id, result });
        });
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    fn apply_detail(&mut self, load: DetailLoad) -> Option<Banner> {
        if self.detail_pending.as_deref() != Some(load.id.as_str()) {
            return None;
        }
        self.detail_pending = None;
        match load.result {
            Ok(value) => {
                self.detail = Some(DetailModal::new(load.id, value));
                None
            }
            Err(err) => {
                warn!("measurement {} failed: {}", load.id, err);
                Some(Banner::error("Failed to load measurement details"))
            }
        }
    }

    fn drain_open_requests(&mut self) {
        while let Ok(id) = self.open_rx.try_recv() {
            self.open_detail(id);
        }
    }

    /// Waits for the table load and any pending detail request.
    pub async fn settle(&mut self) -> Vec<Banner> {
        let mut banners = std::mem::take(&mut self.banners);
        if let Some(table) = self.table.as_mut() {
            if let Applied::Failed(err) = table.settle().await {
                banners.push(Banner::error(format!("Failed to load measurements: {}", err)));
            }
        }
        self.drain_open_requests();
        while self.detail_pending.is_some() {
            match self.detail_rx.recv().await {
                Some(load) => banners.extend(self.apply_detail(load)),
                None => break,
            }
        }
        banners
    }

    fn copy_detail(&mut self) {
        let Some(detail) = self.detail.as_ref() else {
            return;
        };
        let text = detail.pretty();
        let copied = Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text));
        match copied {
            Ok(()) => self.banners.push(Banner::success("Copied to clipboard")),
            Err(err) => {
                warn!("clipboard unavailable: {}", err);
                self.banners.push(Banner::error("Failed to copy to clipboard"));
            }
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> bool {
        let Some(detail) = self.detail.as_mut() else {
            return false;
        };
        match key.code {
            KeyCode::Esc => self.detail = None,
            KeyCode::Up => detail.scroll = detail.scroll.saturating_sub(1),
            KeyCode::Down => {
                let max = detail.lines.len().saturating_sub(1) as u16;
                detail.scroll = (detail.scroll + 1).min(max);
            }
            KeyCode::PageUp => detail.scroll = detail.scroll.saturating_sub(10),
            KeyCode::PageDown => {
                let max = detail.lines.len().saturating_sub(1) as u16;
                detail.scroll = detail.scroll.saturating_add(10).min(max);
            }
            KeyCode::Char('c') => self.copy_detail(),
            _ => {}
        }
        true
    }

    fn handle_form_key(&mut self, field: FormField, key: KeyEvent) -> bool {
        if self.method.is_open() {
            match self.method.handle_key(key) {
                DropdownEvent::Changed(value) => {
                    debug!("method -> `{}`", value);
                    self.apply_filters();
                }
                DropdownEvent::Closed | DropdownEvent::None => {}
            }
            return true;
        }

        if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.reset_filters();
            return true;
        }

        match key.code {
            KeyCode::Esc => self.focus = Focus::Table,
            KeyCode::Tab | KeyCode::Down => self.focus = Focus::Form(field.next()),
            KeyCode::BackTab | KeyCode::Up => self.focus = Focus::Form(field.previous()),
            KeyCode::Enter if field == FormField::Method => self.method.open(),
            KeyCode::Enter => {
                self.apply_filters();
            }
            KeyCode::Backspace => {
                if let Some(input) = self.form.input_mut(field) {
                    input.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(input) = self.form.input_mut(field) {
                    input.push(c);
                }
            }
            _ => {}
        }
        true
    }

    fn draw_form(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                [
                    Constraint::Length(18),
                    Constraint::Percentage(30),
                    Constraint::Length(18),
                    Constraint::Length(23),
                    Constraint::Length(23),
                ]
                .as_ref(),
            )
            .split(area);

        for (index, field) in FormField::ORDER.iter().enumerate() {
            let focused = self.focus == Focus::Form(*field);
            if *field == FormField::Method {
                continue;
            }
            let style = if focused {
                SELECTED_ITEM_STYLE
            } else {
                Style::new().fg(TEXT_FG_COLOR)
            };
            let mut text = self.form.input(*field).to_string();
            if focused {
                text.push('▏');
            }
            frame.render_widget(
                Paragraph::new(text)
                    .style(style)
                    .block(self.tui_manager.panel(field.title())),
                chunks[index],
            );
        }

        // Drawn last so the open option list sits above the other inputs.
        let focused = self.focus == Focus::Form(FormField::Method);
        self.method
            .draw(frame, chunks[0], FormField::Method.title(), focused, &self.tui_manager);
    }
}

impl View for FilteringView {
    fn init(&mut self, ctx: &ViewContext) {
        self.api = Some(Arc::clone(&ctx.api));
        self.page_size = ctx.config.page_size;
        self.timeout = ctx.config.timeout;

        let now = Local::now().timestamp();
        self.form = FilterForm::with_default_range(now);
        self.method = Dropdown::new(method_options());
        self.focus = Focus::Table;
        self.detail = None;
        self.detail_pending = None;
        self.table = Some(self.build_table(Arc::clone(&ctx.api), now));
    }

    fn cleanup(&mut self) {
        self.method.destroy();
        self.table = None;
        self.detail = None;
        self.detail_pending = None;
        self.focus = Focus::Table;
        while self.open_rx.try_recv().is_ok() {}
        while self.detail_rx.try_recv().is_ok() {}
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
            .split(area);

        if let Some(table) = self.table.as_mut() {
            table.draw(frame, chunks[1], "Measurements");
        }
        self.draw_form(frame, chunks[0]);

        if let Some(detail) = &self.detail {
            self.tui_manager.draw_modal(
                frame,
                &format!("Measurement {}", detail.id),
                detail.lines.clone(),
                detail.scroll,
                "↑↓: scroll | c: copy | Esc: close",
            );
        } else if let Some(id) = &self.detail_pending {
            let area = self.tui_manager.popup_area(frame.area(), 40, 15);
            frame.render_widget(ratatui::widgets::Clear, area);
            frame.render_widget(
                Paragraph::new(format!("Loading measurement {}…", id))
                    .style(Style::new().add_modifier(Modifier::BOLD))
                    .block(self.tui_manager.panel("Details")),
                area,
            );
        }
    }

    fn handle_input(&mut self, key: KeyEvent) -> bool {
        if self.detail.is_some() {
            return self.handle_detail_key(key);
        }
        if let Focus::Form(field) = self.focus {
            return self.handle_form_key(field, key);
        }

        match key.code {
            KeyCode::Char('/') | KeyCode::Char('f') => {
                self.focus = Focus::Form(FormField::Name);
                true
            }
            KeyCode::Char('m') => {
                self.focus = Focus::Form(FormField::Method);
                self.method.open();
                true
            }
            KeyCode::Char('R') => self.reset_filters(),
            _ => {
                let handled = match self.table.as_mut() {
                    Some(table) => table.handle_key(key),
                    None => false,
                };
                self.drain_open_requests();
                handled
            }
        }
    }

    fn tick(&mut self) -> Vec<Banner> {
        let mut banners = std::mem::take(&mut self.banners);
        if let Some(table) = self.table.as_mut() {
            for applied in table.poll() {
                if let Applied::Failed(err) = applied {
                    banners.push(Banner::error(format!("Failed to load measurements: {}", err)));
                }
            }
        }
        self.drain_open_requests();
        while let Ok(load) = self.detail_rx.try_recv() {
            banners.extend(self.apply_detail(load));
        }
        banners
    }

    fn captures_input(&self) -> bool {
        self.is_editing() || self.detail.is_some()
    }

    fn help(&self) -> &'static str {
        match (self.detail.is_some(), self.focus) {
            (true, _) => "↑↓: scroll | c: copy JSON | Esc: close",
            (false, Focus::Form(_)) => "Tab/↑↓: field | Enter: apply (method: choose) | Ctrl+R: reset | Esc: back to table",
            (false, Focus::Table) => "/: edit filters | m: method | R: reset | ↑↓: select | ←→: page | </>: column | s: sort | +/-: rows | Enter: view JSON",
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
