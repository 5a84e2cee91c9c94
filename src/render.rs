use crate::api::Row;
use crate::helpers::sanitize_text;
use crate::query_state::{SortDirection, SortSpec};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Row as TableRow};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What a column renderer hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderResult {
    /// Inserted as inert text after sanitising.
    Text(String),
    /// Pre-styled element, attached unchanged.
    Node(Line<'static>),
}

impl RenderResult {
    pub fn text(value: impl Into<String>) -> Self {
        RenderResult::Text(value.into())
    }

    /// Plain-text view, used for width calculation and tests.
    pub fn plain(&self) -> String {
        match self {
            RenderResult::Text(text) => text.clone(),
            RenderResult::Node(line) => line.spans.iter().map(|s| s.content.as_ref()).collect(),
        }
    }

    pub fn into_cell(self) -> Cell<'static> {
        match self {
            RenderResult::Text(text) => Cell::from(sanitize_text(&text)),
            RenderResult::Node(line) => Cell::from(line),
        }
    }
}

pub type Renderer = Arc<dyn Fn(&Value, &Row) -> RenderResult + Send + Sync>;

#[derive(Clone)]
pub struct ColumnSpec {
    pub field: String,
    pub label: String,
    pub sortable: bool,
    pub render: Option<Renderer>,
}

impl ColumnSpec {
    /// Sortable, rendered as plain text.
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            sortable: true,
            render: None,
        }
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn with_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&Value, &Row) -> RenderResult + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(render));
        self
    }
}

impl fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("field", &self.field)
            .field("label", &self.label)
            .field("sortable", &self.sortable)
            .field("render", &self.render.is_some())
            .finish()
    }
}

/// Stringifies a raw value; null and missing become empty.
pub fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn render_cell(column: &ColumnSpec, row: &Row) -> RenderResult {
    match &column.render {
        Some(render) => render(row.get(&column.field).unwrap_or(&Value::Null), row),
        None => RenderResult::Text(stringify(row.get(&column.field))),
    }
}

pub fn render_row(columns: &[ColumnSpec], row: &Row) -> Vec<RenderResult> {
    columns.iter().map(|column| render_cell(column, row)).collect()
}

pub fn sort_indicator(column: &ColumnSpec, sort: &SortSpec) -> Option<&'static str> {
    if !column.sortable || column.field != sort.field {
        return None;
    }
    Some(match sort.direction {
        SortDirection::Asc => "▲",
        SortDirection::Desc => "▼",
    })
}

/// Header label with the active sort marker, if any.
pub fn header_label(column: &ColumnSpec, sort: &SortSpec) -> String {
    match sort_indicator(column, sort) {
        Some(marker) => format!("{} {}", column.label, marker),
        None => column.label.clone(),
    }
}

/// Header row. `focused` is the column the keyboard cursor is on.
pub fn header_row(
    columns: &[ColumnSpec],
    sort: &SortSpec,
    focused: Option<usize>,
    style: Style,
) -> TableRow<'static> {
    let cells = columns.iter().enumerate().map(|(index, column)| {
        let mut cell_style = style;
        if sort_indicator(column, sort).is_some() {
            cell_style = cell_style.add_modifier(Modifier::UNDERLINED);
        }
        if focused == Some(index) {
            cell_style = cell_style.add_modifier(Modifier::REVERSED);
        }
        Cell::from(Span::styled(header_label(column, sort), cell_style))
    });
    TableRow::new(cells)
}
