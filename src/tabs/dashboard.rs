use super::base::{View, ViewContext};
use crate::api::{page_source, Interval, ProfilerApi, Row, TimeRange, GROUPED_ENDPOINT};
use crate::charts::{MethodChart, TimeSeriesChart};
use crate::error::LoadError;
use crate::helpers::{format_elapsed, method_badge, relative_time};
use crate::messages::{EndpointFilter, EndpointSender};
use crate::query_state::Filters;
use crate::render::{ColumnSpec, RenderResult};
use crate::table::{Applied, ServerSideTable, TableOptions, DEFAULT_TIMEOUT};
use crate::tui_manager::{Banner, TuiManager, MUTED_STYLE, SELECTED_ITEM_STYLE, TEXT_FG_COLOR};
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use log::{info, warn};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How often the "last refreshed" label is recomputed.
pub const RELATIVE_TIME_REFRESH: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardRange {
    Day,
    Week,
    Month,
}

impl DashboardRange {
    pub const ALL: [DashboardRange; 3] = [DashboardRange::Day, DashboardRange::Week, DashboardRange::Month];

    pub fn label(&self) -> &'static str {
        match self {
            DashboardRange::Day => "24h",
            DashboardRange::Week => "7d",
            DashboardRange::Month => "30d",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            DashboardRange::Day => 24 * 3600,
            DashboardRange::Week => 7 * 24 * 3600,
            DashboardRange::Month => 30 * 24 * 3600,
        }
    }

    /// Hourly buckets up to a week, daily beyond.
    pub fn interval(&self) -> Interval {
        match self {
            DashboardRange::Month => Interval::Daily,
            _ => Interval::Hourly,
        }
    }

    pub fn from_key(key: char) -> Option<Self> {
        match key {
            '1' => Some(DashboardRange::Day),
            '2' => Some(DashboardRange::Week),
            '3' => Some(DashboardRange::Month),
            _ => None,
        }
    }

    pub fn time_range(&self, now: i64) -> TimeRange {
        TimeRange::last(self.seconds(), now)
    }

    pub fn filters(&self, now: i64) -> Filters {
        let range = self.time_range(now);
        Filters::new()
            .with("startedAt", range.started_at)
            .with("endedAt", range.ended_at)
    }
}

type ChartData = (BTreeMap<String, u64>, BTreeMap<String, u64>);

struct ChartLoad {
    generation: u64,
    result: Result<ChartData, LoadError>,
}

/// Grouped per-endpoint summary with request charts.
pub struct DashboardView {
    api: Option<Arc<dyn ProfilerApi>>,
    endpoint_tx: Option<EndpointSender>,
    page_size: usize,
    timeout: Duration,
    range: DashboardRange,
    table: Option<ServerSideTable>,
    timeseries_chart: Option<TimeSeriesChart>,
    method_chart: Option<MethodChart>,
    charts_pending: bool,
    chart_generation: u64,
    chart_tx: UnboundedSender<ChartLoad>,
    chart_rx: UnboundedReceiver<ChartLoad>,
    last_refreshed: Option<i64>,
    refreshed_label: String,
    label_updated_at: Option<Instant>,
    tui_manager: TuiManager,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardView {
    pub fn new() -> Self {
        let (chart_tx, chart_rx) = mpsc::unbounded_channel();
        Self {
            api: None,
            endpoint_tx: None,
            page_size: 25,
            timeout: DEFAULT_TIMEOUT,
            range: DashboardRange::Day,
            table: None,
            timeseries_chart: None,
            method_chart: None,
            charts_pending: false,
            chart_generation: 0,
            chart_tx,
            chart_rx,
            last_refreshed: None,
            refreshed_label: String::new(),
            label_updated_at: None,
            tui_manager: TuiManager::new(),
        }
    }

    pub fn range(&self) -> DashboardRange {
        self.range
    }

    pub fn table(&self) -> Option<&ServerSideTable> {
        self.table.as_ref()
    }

    pub fn table_mut(&mut self) -> Option<&mut ServerSideTable> {
        self.table.as_mut()
    }

    pub fn timeseries_chart(&self) -> Option<&TimeSeriesChart> {
        self.timeseries_chart.as_ref()
    }

    pub fn method_chart(&self) -> Option<&MethodChart> {
        self.method_chart.as_ref()
    }

    pub fn refreshed_label(&self) -> &str {
        &self.refreshed_label
    }

    fn columns() -> Vec<ColumnSpec> {
        let duration = |value: &serde_json::Value, _: &Row| RenderResult::text(format_elapsed(value));
        vec![
            ColumnSpec::new("method", "Method")
                .with_render(|value, _| RenderResult::Node(method_badge(value))),
            ColumnSpec::new("name", "Endpoint"),
            ColumnSpec::new("count", "Count"),
            ColumnSpec::new("avgElapsed", "Avg Duration").with_render(duration),
            ColumnSpec::new("maxElapsed", "Max Duration").with_render(duration),
            ColumnSpec::new("minElapsed", "Min Duration").with_render(duration),
        ]
    }

    fn build_table(&self, api: Arc<dyn ProfilerApi>, now: i64) -> ServerSideTable {
        let tx = self.endpoint_tx.clone();
        let on_row_click = move |row: &Row| {
            let Some(tx) = tx.as_ref() else {
                return;
            };
            let filter = EndpointFilter::new(
                row.get_str("method").unwrap_or_default(),
                row.get_str("name").unwrap_or_default(),
            );
            info!("filtering measurements by {} {}", filter.method, filter.name);
            if tx.send(filter).is_err() {
                warn!("endpoint filter receiver is gone");
            }
        };

        let options = TableOptions {
            page_size: self.page_size,
            default_sort: "count,desc".to_string(),
            initial_filters: self.range.filters(now),
            columns: Self::columns(),
            on_row_click: Some(Box::new(on_row_click)),
            ..TableOptions::default()
        };
        ServerSideTable::new(GROUPED_ENDPOINT, options, page_source(api), self.timeout)
    }

    /// Switches the time window; re-selecting the current one does nothing.
    pub fn select_range(&mut self, range: DashboardRange) -> bool {
        if range == self.range {
            return false;
        }
        info!("dashboard range -> {}", range.label());
        self.range = range;
        let now = Local::now().timestamp();
        if let Some(table) = self.table.as_mut() {
            table.filter(range.filters(now));
        }
        self.load_charts(now);
        true
    }

    fn load_charts(&mut self, now: i64) {
        let Some(api) = self.api.clone() else {
            return;
        };
        self.chart_generation += 1;
        self.charts_pending = true;
        let generation = self.chart_generation;
        let range = self.range.time_range(now);
        let interval = self.range.interval();
        let timeout = self.timeout;
        let tx = self.chart_tx.clone();

        tokio::spawn(async move {
            let load = async {
                tokio::try_join!(api.timeseries(range, interval), api.method_distribution(range))
            };
            let result = match tokio::time::timeout(timeout, load).await {
                Ok(result) => result,
                Err(_) => Err(LoadError::Timeout(timeout)),
            };
            let _ = tx.send(ChartLoad { generation, result });
        });
    }

    fn destroy_charts(&mut self) {
        if let Some(mut chart) = self.timeseries_chart.take() {
            chart.destroy();
        }
        if let Some(mut chart) = self.method_chart.take() {
            chart.destroy();
        }
    }

    fn apply_charts(&mut self, load: ChartLoad) -> Option<Banner> {
        if load.generation != self.chart_generation {
            return None;
        }
        self.charts_pending = false;
        match load.result {
            Ok((series, distribution)) => {
                self.destroy_charts();
                self.timeseries_chart = Some(TimeSeriesChart::new("Requests", &series));
                self.method_chart = MethodChart::new(&distribution);
                self.mark_refreshed();
                None
            }
            Err(err) => {
                warn!("dashboard chart data failed: {}", err);
                Some(Banner::error("Failed to load dashboard data"))
            }
        }
    }

    fn apply_table(&mut self, applied: Vec<Applied>) -> Vec<Banner> {
        let mut banners = Vec::new();
        for outcome in applied {
            match outcome {
                Applied::Rendered => self.mark_refreshed(),
                Applied::Failed(err) => banners.push(Banner::error(format!("Failed to load summary: {}", err))),
                Applied::Stale => {}
            }
        }
        banners
    }

    fn mark_refreshed(&mut self) {
        self.last_refreshed = Some(Local::now().timestamp());
        self.update_refreshed_label();
    }

    fn update_refreshed_label(&mut self) {
        self.refreshed_label = match self.last_refreshed {
            Some(ts) => relative_time(ts, Local::now().timestamp()),
            None => String::new(),
        };
        self.label_updated_at = Some(Instant::now());
    }

    /// Waits for the table and the chart data of the latest load.
    pub async fn settle(&mut self) -> Vec<Banner> {
        let mut banners = Vec::new();
        if let Some(table) = self.table.as_mut() {
            let applied = table.settle().await;
            banners.extend(self.apply_table(vec![applied]));
        }
        while self.charts_pending {
            match self.chart_rx.recv().await {
                Some(load) => banners.extend(self.apply_charts(load)),
                None => break,
            }
        }
        banners
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
            .split(area);

        let mut spans = vec![Span::styled("Range: ", Style::new().fg(TEXT_FG_COLOR))];
        for (index, range) in DashboardRange::ALL.iter().enumerate() {
            let style = if *range == self.range {
                SELECTED_ITEM_STYLE
            } else {
                MUTED_STYLE
            };
            spans.push(Span::styled(format!(" {} {} ", index + 1, range.label()), style));
            spans.push(Span::raw(" "));
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans)).block(self.tui_manager.panel("Time range")),
            chunks[0],
        );

        let refreshed = if self.refreshed_label.is_empty() {
            "Loading…".to_string()
        } else {
            format!("Last refreshed {}", self.refreshed_label)
        };
        frame.render_widget(
            Paragraph::new(refreshed)
                .style(Style::new().fg(TEXT_FG_COLOR))
                .block(self.tui_manager.panel("Updated")),
            chunks[1],
        );
    }

    fn draw_charts(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
            .split(area);

        match &self.timeseries_chart {
            Some(chart) => chart.draw(frame, chunks[0], &self.tui_manager),
            None => TimeSeriesChart::new("Requests", &BTreeMap::new()).draw(frame, chunks[0], &self.tui_manager),
        }
        match &self.method_chart {
            Some(chart) => chart.draw(frame, chunks[1], &self.tui_manager),
            None => MethodChart::draw_empty(frame, chunks[1], &self.tui_manager),
        }
    }
}

impl View for DashboardView {
    fn init(&mut self, ctx: &ViewContext) {
        self.api = Some(Arc::clone(&ctx.api));
        self.endpoint_tx = Some(ctx.endpoint_tx.clone());
        self.page_size = ctx.config.page_size;
        self.timeout = ctx.config.timeout;

        let now = Local::now().timestamp();
        self.table = Some(self.build_table(Arc::clone(&ctx.api), now));
        self.load_charts(now);
        self.update_refreshed_label();
    }

    fn cleanup(&mut self) {
        self.destroy_charts();
        self.table = None;
        self.label_updated_at = None;
        // Results of loads issued before cleanup are ignored.
        self.chart_generation += 1;
        self.charts_pending = false;
        while self.chart_rx.try_recv().is_ok() {}
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(12), Constraint::Min(0)].as_ref())
            .split(area);

        self.draw_header(frame, chunks[0]);
        self.draw_charts(frame, chunks[1]);
        if let Some(table) = self.table.as_mut() {
            table.draw(frame, chunks[2], "Endpoints");
        }
    }

    fn handle_input(&mut self, key: KeyEvent) -> bool {
        if let KeyCode::Char(c) = key.code {
            if let Some(range) = DashboardRange::from_key(c) {
                self.select_range(range);
                return true;
            }
        }
        match self.table.as_mut() {
            Some(table) => table.handle_key(key),
            None => false,
        }
    }

    fn tick(&mut self) -> Vec<Banner> {
        let applied = match self.table.as_mut() {
            Some(table) => table.poll(),
            None => Vec::new(),
        };
        let mut banners = self.apply_table(applied);

        while let Ok(load) = self.chart_rx.try_recv() {
            banners.extend(self.apply_charts(load));
        }

        if let Some(updated_at) = self.label_updated_at {
            if updated_at.elapsed() >= RELATIVE_TIME_REFRESH {
                self.update_refreshed_label();
            }
        }
        banners
    }

    fn help(&self) -> &'static str {
        "1/2/3: range | ↑↓: select | ←→: page | </>: column | s: sort | +/-: rows | Enter: filter endpoint"
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
