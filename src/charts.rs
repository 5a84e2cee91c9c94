use crate::helpers::method_color;
use crate::tui_manager::{HEADER_STYLE, TuiManager};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Paragraph, RenderDirection, Sparkline},
    Frame,
};
use std::collections::BTreeMap;

/// Requests over time, one bucket per label, oldest first.
pub struct TimeSeriesChart {
    title: String,
    labels: Vec<String>,
    values: Vec<u64>,
}

impl TimeSeriesChart {
    pub fn new(title: impl Into<String>, series: &BTreeMap<String, u64>) -> Self {
        Self {
            title: title.into(),
            labels: series.keys().cloned().collect(),
            values: series.values().copied().collect(),
        }
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Releases the series; the chart draws as empty afterwards.
    pub fn destroy(&mut self) {
        self.labels.clear();
        self.values.clear();
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, tui_manager: &TuiManager) {
        if self.values.is_empty() {
            frame.render_widget(
                Paragraph::new("No data available")
                    .style(HEADER_STYLE)
                    .alignment(Alignment::Center)
                    .block(tui_manager.panel(format!("📈 {}", self.title))),
                area,
            );
            return;
        }

        // Newest buckets win when the series is wider than the panel.
        let width = area.width.saturating_sub(2) as usize;
        let data: Vec<u64> = self.values.iter().rev().take(width.max(1)).copied().collect();

        let total: u64 = data.iter().sum();
        let avg = total / data.len() as u64;
        let max = data.iter().copied().max().unwrap_or(0);
        let span = match (self.labels.first(), self.labels.last()) {
            (Some(first), Some(last)) if data.len() == self.labels.len() => {
                format!(", {} → {}", first, last)
            }
            _ => String::new(),
        };

        let title = format!(
            "📈 {} (Total: {}, Avg: {}, Max: {}{})",
            self.title, total, avg, max, span
        );

        let sparkline = Sparkline::default()
            .block(tui_manager.panel(title).title_alignment(Alignment::Center))
            .data(&data[..])
            .direction(RenderDirection::RightToLeft)
            .style(Style::new().fg(Color::Rgb(0, 191, 255)).bg(Color::Rgb(28, 28, 28)))
            .bar_set(symbols::bar::NINE_LEVELS)
            .max(max.max(1));
        frame.render_widget(sparkline, area);
    }
}

/// Request count per HTTP method.
pub struct MethodChart {
    distribution: Vec<(String, u64)>,
}

impl MethodChart {
    /// `None` for an empty distribution; callers show a placeholder instead.
    pub fn new(distribution: &BTreeMap<String, u64>) -> Option<Self> {
        if distribution.is_empty() {
            return None;
        }
        let mut distribution: Vec<(String, u64)> = distribution
            .iter()
            .map(|(method, count)| (method.to_ascii_uppercase(), *count))
            .collect();
        distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Some(Self { distribution })
    }

    pub fn distribution(&self) -> &[(String, u64)] {
        &self.distribution
    }

    pub fn destroy(&mut self) {
        self.distribution.clear();
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, tui_manager: &TuiManager) {
        let bars: Vec<Bar> = self
            .distribution
            .iter()
            .map(|(method, count)| {
                let color = method_color(method);
                Bar::default()
                    .value(*count)
                    .label(Line::from(method.clone()))
                    .style(Style::new().fg(color))
                    .value_style(Style::new().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD))
            })
            .collect();

        let chart = BarChart::default()
            .block(tui_manager.panel("📊 Methods"))
            .data(BarGroup::default().bars(&bars))
            .bar_width(7)
            .bar_gap(2);
        frame.render_widget(chart, area);
    }

    /// Placeholder drawn in place of an empty chart.
    pub fn draw_empty(frame: &mut Frame, area: Rect, tui_manager: &TuiManager) {
        frame.render_widget(
            Paragraph::new("No data available")
                .style(HEADER_STYLE)
                .alignment(Alignment::Center)
                .block(tui_manager.panel("📊 Methods")),
            area,
        );
    }
}
