use crate::tui_manager::{TuiManager, SELECTED_ITEM_STYLE, TEXT_FG_COLOR};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropdownEvent {
    None,
    Changed(String),
    Closed,
}

/// Single-choice select with a pop-out option list.
///
/// Options are `(value, label)` pairs; the empty value is allowed and usually
/// means "any".
#[derive(Debug, Clone)]
pub struct Dropdown {
    options: Vec<(String, String)>,
    selected: usize,
    open: bool,
    list_state: ListState,
    destroyed: bool,
}

impl Dropdown {
    pub fn new(options: Vec<(String, String)>) -> Self {
        Self {
            options,
            selected: 0,
            open: false,
            list_state: ListState::default(),
            destroyed: false,
        }
    }

    pub fn value(&self) -> &str {
        self.options
            .get(self.selected)
            .map(|(value, _)| value.as_str())
            .unwrap_or("")
    }

    pub fn label(&self) -> &str {
        self.options
            .get(self.selected)
            .map(|(_, label)| label.as_str())
            .unwrap_or("")
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Selects the option whose value matches (case-insensitively). Unknown
    /// values leave the selection alone.
    pub fn sync(&mut self, value: &str) -> bool {
        match self
            .options
            .iter()
            .position(|(v, _)| v.eq_ignore_ascii_case(value))
        {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    pub fn open(&mut self) {
        if self.destroyed || self.options.is_empty() {
            return;
        }
        self.open = true;
        self.list_state.select(Some(self.selected));
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn destroy(&mut self) {
        self.open = false;
        self.destroyed = true;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DropdownEvent {
        if !self.open {
            return DropdownEvent::None;
        }
        match key.code {
            KeyCode::Up => {
                self.list_state.select_previous();
                DropdownEvent::None
            }
            KeyCode::Down => {
                let last = self.options.len().saturating_sub(1);
                let next = self.list_state.selected().map_or(0, |i| (i + 1).min(last));
                self.list_state.select(Some(next));
                DropdownEvent::None
            }
            KeyCode::Enter => {
                self.open = false;
                match self.list_state.selected() {
                    Some(index) if index < self.options.len() && index != self.selected => {
                        self.selected = index;
                        DropdownEvent::Changed(self.value().to_string())
                    }
                    _ => DropdownEvent::Closed,
                }
            }
            KeyCode::Esc => {
                self.open = false;
                DropdownEvent::Closed
            }
            _ => DropdownEvent::None,
        }
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, title: &str, focused: bool, tui_manager: &TuiManager) {
        let marker = if self.open { "▴" } else { "▾" };
        let style = if focused {
            SELECTED_ITEM_STYLE
        } else {
            Style::new().fg(TEXT_FG_COLOR)
        };
        frame.render_widget(
            Paragraph::new(format!("{} {}", self.label(), marker))
                .style(style)
                .block(tui_manager.panel(title.to_string())),
            area,
        );

        if !self.open {
            return;
        }

        let frame_area = frame.area();
        let height = (self.options.len() as u16 + 2).min(frame_area.height.saturating_sub(area.bottom()));
        let popup = Rect::new(area.x, area.bottom(), area.width, height);
        let items: Vec<ListItem> = self
            .options
            .iter()
            .map(|(_, label)| ListItem::new(label.clone()))
            .collect();

        frame.render_widget(Clear, popup);
        frame.render_stateful_widget(
            List::new(items)
                .block(tui_manager.panel(""))
                .highlight_style(SELECTED_ITEM_STYLE)
                .highlight_symbol("> "),
            popup,
            &mut self.list_state,
        );
    }
}
