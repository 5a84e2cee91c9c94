use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{
        Block, BorderType, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Tabs, Wrap,
    },
    Frame,
};
use std::time::{Duration, Instant};

// UI element styles
pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(144, 238, 144)) // Light green (softer)
    .add_modifier(Modifier::BOLD);

pub const SELECTED_ITEM_STYLE: Style = Style::new()
    .fg(Color::White)
    .bg(Color::Rgb(0, 95, 135)) // Dark blue background
    .add_modifier(Modifier::BOLD);

pub const PANEL_TITLE_STYLE: Style = Style::new()
    .fg(Color::Rgb(144, 238, 144))
    .add_modifier(Modifier::BOLD);

pub const BORDER_COLOR: Color = Color::Rgb(144, 238, 144);
pub const TEXT_FG_COLOR: Color = Color::Rgb(158, 158, 158);
pub const MUTED_STYLE: Style = Style::new().fg(Color::Rgb(108, 117, 125));

/// How long a banner stays on screen.
pub const BANNER_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
    Info,
}

/// Transient message shown above the active view.
#[derive(Debug, Clone)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    shown_at: Instant,
}

impl Banner {
    pub fn new(kind: BannerKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            shown_at: Instant::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(BannerKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(BannerKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(BannerKind::Info, message)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= BANNER_TTL
    }
}

/// Shared widget builders so every view looks the same.
pub struct TuiManager;

impl Default for TuiManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiManager {
    pub fn new() -> Self {
        TuiManager
    }

    /// Rounded, green-bordered panel used by every view.
    pub fn panel<'a>(&self, title: impl Into<Line<'a>>) -> Block<'a> {
        let title: Line<'a> = title.into();
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::new().fg(BORDER_COLOR))
            .title(title)
            .title_style(PANEL_TITLE_STYLE)
    }

    pub fn draw_tabs<'a>(&self, tabs: Vec<String>, selected: usize, title: &'a str) -> Tabs<'a> {
        Tabs::new(tabs)
            .select(selected)
            .block(self.panel(title))
            .highlight_style(Style::default().fg(Color::Yellow))
            .divider("|")
    }

    pub fn draw_summary<'a>(&self, summary: &'a str) -> Paragraph<'a> {
        Paragraph::new(summary)
            .style(Style::new().fg(TEXT_FG_COLOR))
            .block(self.panel("Status"))
    }

    pub fn draw_banner<'a>(&self, banner: &'a Banner) -> Paragraph<'a> {
        let (icon, color) = match banner.kind {
            BannerKind::Success => ("✓", Color::Rgb(144, 238, 144)),
            BannerKind::Error => ("✗", Color::Rgb(220, 53, 69)),
            BannerKind::Info => ("ℹ", Color::Rgb(0, 191, 255)),
        };
        Paragraph::new(format!("{} {}", icon, banner.message))
            .style(Style::new().fg(color).add_modifier(Modifier::BOLD))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::new().fg(color)),
            )
            .wrap(Wrap { trim: true })
    }

    pub fn draw_help<'a>(&self, help: &'a str) -> Paragraph<'a> {
        Paragraph::new(help)
            .style(Style::new().fg(Color::White))
            .block(self.panel("Help"))
    }

    /// Renders a centred modal with scrollable content.
    pub fn draw_modal(
        &self,
        frame: &mut Frame,
        title: &str,
        lines: Vec<Line<'static>>,
        scroll: u16,
        footer: &str,
    ) {
        let popup_area = self.popup_area(frame.area(), 80, 80);

        // Clear the area under the popup
        frame.render_widget(Clear, popup_area);

        let block = self
            .panel(title.to_string())
            .style(Style::default().bg(Color::Rgb(28, 28, 28)).fg(Color::White));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let chunks = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).split(inner);
        let total = lines.len();
        frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), chunks[0]);
        frame.render_widget(
            Paragraph::new(footer)
                .style(MUTED_STYLE)
                .alignment(Alignment::Center),
            chunks[1],
        );
        self.draw_scrollbar(total, scroll as usize, frame, chunks[0]);
    }

    /// Small centred yes/no prompt.
    pub fn draw_confirm(&self, frame: &mut Frame, title: &str, question: &str) {
        let popup_area = self.popup_area(frame.area(), 50, 20);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .style(Style::default().bg(Color::Rgb(28, 28, 28)).fg(Color::White));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);
        frame.render_widget(
            Paragraph::new(question)
                .style(Style::new().fg(Color::Rgb(255, 193, 7)).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            chunks[1],
        );
        frame.render_widget(
            Paragraph::new("y: confirm | n/Esc: cancel")
                .style(MUTED_STYLE)
                .alignment(Alignment::Center),
            chunks[2],
        );
    }

    /// Helper function to create a centered rectangle
    pub fn popup_area(&self, area: Rect, percent_x: u16, percent_y: u16) -> Rect {
        let popup_width = (area.width as f32 * (percent_x as f32 / 100.0)) as u16;
        let popup_height = (area.height as f32 * (percent_y as f32 / 100.0)) as u16;

        let x = area.x + (area.width.saturating_sub(popup_width)) / 2;
        let y = area.y + (area.height.saturating_sub(popup_height)) / 2;

        Rect::new(x, y, popup_width, popup_height)
    }

    pub fn draw_scrollbar(&self, count: usize, selected_index: usize, frame: &mut Frame, rect: Rect) {
        let mut scrollbar_state = ScrollbarState::default()
            .content_length(count)
            .position(selected_index);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓")),
            rect,
            &mut scrollbar_state,
        );
    }
}
