//! Server-backed data table.
//!
//! The table owns its [`QueryState`] and the last rendered [`Page`]. Every
//! sort, filter, page-size or page change spawns a load on the tokio runtime;
//! finished loads come back through the table's own channel and are applied by
//! [`ServerSideTable::poll`] (or awaited with [`ServerSideTable::settle`]).
//! Each load is tagged with a generation number and only the most recently
//! issued one is ever applied.

use crate::api::{fetch_page, Page, PageSource, Row};
use crate::error::LoadError;
use crate::helpers::sanitize_text;
use crate::pagination::PageInfo;
use crate::query_state::{Filters, QueryState, SortSpec, DEFAULT_SORT};
use crate::render::{self, ColumnSpec, RenderResult};
use crate::tui_manager::{TuiManager, HEADER_STYLE, MUTED_STYLE, SELECTED_ITEM_STYLE, TEXT_FG_COLOR};
use crossterm::event::{KeyCode, KeyEvent};
use log::{debug, warn};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Paragraph, Row as TableRow, Table, TableState},
    Frame,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_COLUMN_WIDTH: usize = 60;

pub type RowClick = Box<dyn FnMut(&Row) + Send>;

/// Construction options.
pub struct TableOptions {
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    /// `"field,dir"`.
    pub default_sort: String,
    pub initial_filters: Filters,
    pub columns: Vec<ColumnSpec>,
    pub on_row_click: Option<RowClick>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            default_sort: DEFAULT_SORT.to_string(),
            initial_filters: Filters::new(),
            columns: Vec::new(),
            on_row_click: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Idle,
    Loading,
    Rendered,
}

/// Result of applying one finished load.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Rendered,
    /// Previous rows and pagination were left in place.
    Failed(LoadError),
    /// A newer load was issued since; the result was dropped.
    Stale,
}

struct LoadOutcome {
    generation: u64,
    state: QueryState,
    result: Result<Page, LoadError>,
}

/// The page on screen together with the query that produced it.
struct Rendered {
    page: Page,
    state: QueryState,
}

pub struct ServerSideTable {
    endpoint: String,
    columns: Vec<ColumnSpec>,
    page_size_options: Vec<usize>,
    on_row_click: Option<RowClick>,
    state: QueryState,
    status: TableStatus,
    rendered: Option<Rendered>,
    last_error: Option<LoadError>,
    generation: u64,
    source: Arc<dyn PageSource>,
    timeout: Duration,
    tx: UnboundedSender<LoadOutcome>,
    rx: UnboundedReceiver<LoadOutcome>,
    table_state: TableState,
    focused_column: usize,
    tui_manager: TuiManager,
}

impl ServerSideTable {
    /// Builds the table and starts the first load. Must be called inside a
    /// tokio runtime.
    pub fn new(
        endpoint: impl Into<String>,
        options: TableOptions,
        source: Arc<dyn PageSource>,
        timeout: Duration,
    ) -> Self {
        let sort = SortSpec::parse(&options.default_sort).unwrap_or_default();
        let mut state = QueryState::new(options.page_size, sort);
        state.set_filters(options.initial_filters);

        let mut page_size_options = if options.page_size_options.is_empty() {
            DEFAULT_PAGE_SIZE_OPTIONS.to_vec()
        } else {
            options.page_size_options
        };
        page_size_options.retain(|size| *size > 0);
        page_size_options.push(state.limit());
        page_size_options.sort_unstable();
        page_size_options.dedup();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut table = Self {
            endpoint: endpoint.into(),
            columns: options.columns,
            page_size_options,
            on_row_click: options.on_row_click,
            state,
            status: TableStatus::Idle,
            rendered: None,
            last_error: None,
            generation: 0,
            source,
            timeout,
            tx,
            rx,
            table_state: TableState::default(),
            focused_column: 0,
            tui_manager: TuiManager::new(),
        };
        table.load();
        table
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// The query the next (or in-flight) load uses.
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn status(&self) -> TableStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == TableStatus::Loading
    }

    /// Number of loads issued so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        self.last_error.as_ref()
    }

    pub fn page_size(&self) -> usize {
        self.state.limit()
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.page_size_options
    }

    pub fn page(&self) -> Option<&Page> {
        self.rendered.as_ref().map(|r| &r.page)
    }

    pub fn rows(&self) -> &[Row] {
        self.page().map(|p| p.rows.as_slice()).unwrap_or(&[])
    }

    /// Pagination metadata for what is on screen.
    pub fn page_info(&self) -> PageInfo {
        match &self.rendered {
            Some(rendered) => PageInfo::derive(&rendered.page, &rendered.state),
            None => PageInfo {
                page_size: self.state.limit(),
                ..PageInfo::default()
            },
        }
    }

    pub fn rendered_rows(&self) -> Vec<Vec<RenderResult>> {
        self.rows()
            .iter()
            .map(|row| render::render_row(&self.columns, row))
            .collect()
    }

    pub fn header_labels(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| render::header_label(column, self.state.sort()))
            .collect()
    }

    /// Sorts by `field`; ignored unless it names a sortable column.
    pub fn sort(&mut self, field: &str) -> bool {
        let sortable = self
            .columns
            .iter()
            .any(|column| column.sortable && column.field == field);
        if !sortable {
            debug!("{}: ignoring sort on `{}`", self.endpoint, field);
            return false;
        }
        self.state.set_sort(field);
        self.load();
        true
    }

    /// Merges `partial` into the filters and reloads from the first page.
    pub fn filter(&mut self, partial: Filters) -> bool {
        self.state.set_filters(partial);
        self.load();
        true
    }

    pub fn change_page_size(&mut self, size: usize) -> bool {
        if size == self.state.limit() || !self.state.set_page_size(size) {
            return false;
        }
        self.load();
        true
    }

    /// Page size typed or picked as text; anything non-numeric is ignored.
    pub fn change_page_size_input(&mut self, input: &str) -> bool {
        match input.trim().parse::<usize>() {
            Ok(size) => self.change_page_size(size),
            Err(_) => false,
        }
    }

    /// Steps to the next larger (or smaller) entry of the page-size options.
    pub fn cycle_page_size(&mut self, larger: bool) -> bool {
        let current = self.state.limit();
        let next = if larger {
            self.page_size_options.iter().copied().find(|s| *s > current)
        } else {
            self.page_size_options.iter().rev().copied().find(|s| *s < current)
        };
        next.map(|size| self.change_page_size(size)).unwrap_or(false)
    }

    /// Jumps to `page`; filters and sort are kept.
    pub fn paginate(&mut self, page: usize) -> bool {
        if !self.state.set_page(page) {
            debug!("{}: ignoring out-of-range page {}", self.endpoint, page);
            return false;
        }
        self.load();
        true
    }

    pub fn next_page(&mut self) -> bool {
        match self.page_info().next_page() {
            Some(page) if !self.is_loading() => self.paginate(page),
            _ => false,
        }
    }

    pub fn previous_page(&mut self) -> bool {
        match self.page_info().previous_page() {
            Some(page) if !self.is_loading() => self.paginate(page),
            _ => false,
        }
    }

    /// Re-issues the current query, e.g. after a failed load.
    pub fn reload(&mut self) {
        self.load();
    }

    fn load(&mut self) {
        self.generation += 1;
        self.status = TableStatus::Loading;

        let generation = self.generation;
        let state = self.state.clone();
        let endpoint = self.endpoint.clone();
        let source = Arc::clone(&self.source);
        let timeout = self.timeout;
        let tx = self.tx.clone();
        debug!(
            "{}: load #{} {:?}",
            endpoint,
            generation,
            state.query_pairs(state.limit() + 1)
        );

        tokio::spawn(async move {
            let result =
                match tokio::time::timeout(timeout, fetch_page(source.as_ref(), &endpoint, &state)).await {
                    Ok(result) => result,
                    Err(_) => Err(LoadError::Timeout(timeout)),
                };
            // The receiver is gone once the table is dropped; nothing to do then.
            let _ = tx.send(LoadOutcome {
                generation,
                state,
                result,
            });
        });
    }

    fn apply(&mut self, outcome: LoadOutcome) -> Applied {
        if outcome.generation != self.generation {
            debug!(
                "{}: dropping stale load #{} (latest #{})",
                self.endpoint, outcome.generation, self.generation
            );
            return Applied::Stale;
        }

        match outcome.result {
            Ok(page) => {
                let len = page.rows.len();
                self.rendered = Some(Rendered {
                    page,
                    state: outcome.state,
                });
                self.status = TableStatus::Rendered;
                self.last_error = None;
                self.table_state
                    .select(if len == 0 { None } else { Some(0) });
                Applied::Rendered
            }
            Err(err) => {
                warn!("{}: load #{} failed: {}", self.endpoint, outcome.generation, err);
                // The query always describes the rows on screen.
                self.status = match &self.rendered {
                    Some(rendered) => {
                        self.state = rendered.state.clone();
                        TableStatus::Rendered
                    }
                    None => TableStatus::Idle,
                };
                self.last_error = Some(err.clone());
                Applied::Failed(err)
            }
        }
    }

    /// Applies every finished load without blocking.
    pub fn poll(&mut self) -> Vec<Applied> {
        let mut applied = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            applied.push(self.apply(outcome));
        }
        applied
    }

    /// Waits until the latest issued load has been applied.
    pub async fn settle(&mut self) -> Applied {
        let mut last = Applied::Stale;
        while self.status == TableStatus::Loading {
            match self.rx.recv().await {
                Some(outcome) => last = self.apply(outcome),
                None => break,
            }
        }
        last
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.table_state.selected()
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.table_state.selected().and_then(|i| self.rows().get(i))
    }

    pub fn select_next(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let next = self.table_state.selected().map_or(0, |i| (i + 1).min(len - 1));
        self.table_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        if self.rows().is_empty() {
            return;
        }
        let previous = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.table_state.select(Some(previous));
    }

    /// Invokes the row-click callback for the selected row.
    pub fn click_selected_row(&mut self) -> bool {
        let Some(row) = self.selected_row().cloned() else {
            return false;
        };
        match self.on_row_click.as_mut() {
            Some(callback) => {
                callback(&row);
                true
            }
            None => false,
        }
    }

    pub fn focused_column(&self) -> usize {
        self.focused_column
    }

    pub fn focus_next_column(&mut self) {
        if !self.columns.is_empty() {
            self.focused_column = (self.focused_column + 1) % self.columns.len();
        }
    }

    pub fn focus_previous_column(&mut self) {
        if !self.columns.is_empty() {
            self.focused_column = (self.focused_column + self.columns.len() - 1) % self.columns.len();
        }
    }

    /// Keyboard equivalent of clicking the focused header cell.
    pub fn sort_focused_column(&mut self) -> bool {
        match self.columns.get(self.focused_column) {
            Some(column) => {
                let field = column.field.clone();
                self.sort(&field)
            }
            None => false,
        }
    }

    /// Handles the table's own keys; returns whether the key was consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up => self.select_previous(),
            KeyCode::Down => self.select_next(),
            KeyCode::Left => {
                self.previous_page();
            }
            KeyCode::Right => {
                self.next_page();
            }
            KeyCode::Char('<') => self.focus_previous_column(),
            KeyCode::Char('>') => self.focus_next_column(),
            KeyCode::Char('s') => {
                self.sort_focused_column();
            }
            KeyCode::Char('+') => {
                self.cycle_page_size(true);
            }
            KeyCode::Char('-') => {
                self.cycle_page_size(false);
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Enter => return self.click_selected_row(),
            _ => return false,
        }
        true
    }

    fn column_widths(&self, rows: &[Vec<RenderResult>]) -> Vec<Constraint> {
        let count = self.columns.len();
        self.header_labels()
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let content = rows
                    .iter()
                    .filter_map(|cells| cells.get(index))
                    .map(|cell| sanitize_text(&cell.plain()).chars().count())
                    .max()
                    .unwrap_or(0);
                let width = content.max(label.chars().count()).min(MAX_COLUMN_WIDTH) as u16;
                if index + 1 == count {
                    Constraint::Min(width)
                } else {
                    Constraint::Length(width)
                }
            })
            .collect()
    }

    /// Draws controls, rows and pagination into `area`.
    pub fn draw(&mut self, frame: &mut Frame, area: Rect, title: &str) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)].as_ref())
            .split(area);

        let info = self.page_info();

        let mut controls = format!("Rows per page: {} (+/-)", self.page_size());
        let range = info.range_label();
        if !range.is_empty() {
            controls.push_str(&format!("  │  {}", range));
        }
        if self.is_loading() {
            controls.push_str("  │  ⟳ Loading…");
        }
        frame.render_widget(
            Paragraph::new(controls)
                .style(Style::new().fg(TEXT_FG_COLOR))
                .block(self.tui_manager.panel(title.to_string())),
            chunks[0],
        );

        let rendered = self.rendered_rows();
        let widths = self.column_widths(&rendered);
        let header = render::header_row(
            &self.columns,
            self.state.sort(),
            Some(self.focused_column),
            HEADER_STYLE,
        );
        let row_count = rendered.len();
        let body: Vec<TableRow> = rendered
            .into_iter()
            .map(|cells| TableRow::new(cells.into_iter().map(RenderResult::into_cell)))
            .collect();

        let block = self.tui_manager.panel("");
        let inner = block.inner(chunks[1]);
        frame.render_stateful_widget(
            Table::new(body, widths)
                .header(header)
                .block(block)
                .column_spacing(2)
                .row_highlight_style(SELECTED_ITEM_STYLE),
            chunks[1],
            &mut self.table_state,
        );

        let placeholder = match (&self.rendered, self.status) {
            (None, TableStatus::Loading) => Some("Loading…"),
            (None, _) => Some("No data loaded"),
            (Some(_), _) if info.is_empty_state() => Some("No data available"),
            _ => None,
        };
        if let Some(text) = placeholder {
            let message_area = Rect {
                y: inner.y.saturating_add(2).min(inner.bottom()),
                height: inner.height.saturating_sub(2),
                ..inner
            };
            frame.render_widget(
                Paragraph::new(text)
                    .style(MUTED_STYLE)
                    .alignment(Alignment::Center),
                message_area,
            );
        } else {
            self.tui_manager.draw_scrollbar(
                row_count,
                self.table_state.selected().unwrap_or(0),
                frame,
                chunks[1],
            );
        }

        let pagination = info.controls_label().unwrap_or_default();
        frame.render_widget(
            Paragraph::new(pagination)
                .style(Style::new().fg(TEXT_FG_COLOR))
                .alignment(Alignment::Center)
                .block(self.tui_manager.panel("Pages")),
            chunks[2],
        );
    }
}
