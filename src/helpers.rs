use chrono::{Local, TimeZone};
use once_cell::sync::Lazy;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex_lite::Regex;
use serde_json::Value;

// CSI / OSC escape sequences. Stored text must never reach the terminal raw.
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b(?:\[[0-9;?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-Z\\-_])")
        .expect("escape sequence pattern compiles")
});

/// Strips escape sequences and replaces remaining control characters so the
/// result is inert plain text.
pub fn sanitize_text(input: &str) -> String {
    let stripped = ANSI_ESCAPE.replace_all(input, "");
    stripped
        .chars()
        .map(|c| match c {
            '\t' => ' ',
            c if c.is_control() => '�',
            c => c,
        })
        .collect()
}

/// Seconds with 7 decimals, `—` for anything that is not a finite number.
pub fn format_elapsed(value: &Value) -> String {
    match value_as_f64(value) {
        Some(seconds) if seconds.is_finite() => format!("{:.7}s", seconds),
        _ => "—".to_string(),
    }
}

pub fn format_timestamp(value: &Value) -> String {
    let Some(seconds) = value_as_f64(value) else {
        return String::new();
    };
    let millis = (seconds * 1000.0).round() as i64;
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => String::new(),
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Human "time ago" between two unix timestamps.
pub fn relative_time(timestamp: i64, now: i64) -> String {
    let seconds = (now - timestamp).max(0);
    let minutes = (seconds as f64 / 60.0).round() as i64;
    let hours = (seconds as f64 / 3600.0).round() as i64;
    let days = (seconds as f64 / 86400.0).round() as i64;

    match seconds {
        0..=44 => "a few seconds ago".to_string(),
        45..=89 => "a minute ago".to_string(),
        90..=2699 => format!("{} minutes ago", minutes),
        2700..=5399 => "an hour ago".to_string(),
        5400..=77399 => format!("{} hours ago", hours),
        77400..=129599 => "a day ago".to_string(),
        _ => format!("{} days ago", days),
    }
}

pub fn method_color(method: &str) -> Color {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Color::Rgb(40, 167, 69),
        "POST" => Color::Rgb(0, 123, 255),
        "PUT" => Color::Rgb(255, 193, 7),
        "DELETE" => Color::Rgb(220, 53, 69),
        "PATCH" => Color::Rgb(23, 162, 184),
        "HEAD" => Color::Rgb(102, 16, 242),
        "OPTIONS" => Color::Rgb(232, 62, 140),
        _ => Color::Rgb(108, 117, 125),
    }
}

/// Coloured method label, `UNKNOWN` when the value is missing.
pub fn method_badge(value: &Value) -> Line<'static> {
    let label = match value.as_str() {
        Some(m) if !m.is_empty() => sanitize_text(m).to_ascii_uppercase(),
        _ => "UNKNOWN".to_string(),
    };
    let color = method_color(&label);
    Line::from(Span::styled(
        format!(" {} ", label),
        Style::new()
            .fg(Color::Black)
            .bg(color)
            .add_modifier(Modifier::BOLD),
    ))
}

const JSON_KEY: Style = Style::new().fg(Color::Rgb(0, 191, 255));
const JSON_STRING: Style = Style::new().fg(Color::Rgb(144, 238, 144));
const JSON_NUMBER: Style = Style::new().fg(Color::Rgb(255, 193, 7));
const JSON_LITERAL: Style = Style::new().fg(Color::Rgb(232, 62, 140));
const JSON_PUNCT: Style = Style::new().fg(Color::Rgb(158, 158, 158));

/// Pretty-prints `value` as coloured lines, two-space indented.
pub fn highlight_json(value: &Value) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    push_json(&mut lines, Vec::new(), value, 0, false);
    lines
}

fn push_json(
    lines: &mut Vec<Line<'static>>,
    mut prefix: Vec<Span<'static>>,
    value: &Value,
    depth: usize,
    trailing_comma: bool,
) {
    let indent = "  ".repeat(depth);
    let comma = if trailing_comma { "," } else { "" };

    let (open, close, children): (&str, &str, Vec<(Option<&String>, &Value)>) = match value {
        Value::Object(map) if !map.is_empty() => ("{", "}", map.iter().map(|(k, v)| (Some(k), v)).collect()),
        Value::Array(items) if !items.is_empty() => ("[", "]", items.iter().map(|v| (None, v)).collect()),
        scalar => {
            prefix.push(scalar_span(scalar));
            prefix.push(Span::styled(comma.to_string(), JSON_PUNCT));
            lines.push(Line::from(prefix));
            return;
        }
    };

    prefix.push(Span::styled(open.to_string(), JSON_PUNCT));
    lines.push(Line::from(prefix));

    let count = children.len();
    for (index, (key, child)) in children.into_iter().enumerate() {
        let mut child_prefix = vec![Span::raw(format!("{}  ", indent))];
        if let Some(key) = key {
            child_prefix.push(Span::styled(
                format!("\"{}\"", sanitize_text(key)),
                JSON_KEY,
            ));
            child_prefix.push(Span::styled(": ".to_string(), JSON_PUNCT));
        }
        push_json(lines, child_prefix, child, depth + 1, index + 1 < count);
    }

    lines.push(Line::from(vec![
        Span::raw(indent),
        Span::styled(format!("{}{}", close, comma), JSON_PUNCT),
    ]));
}

fn scalar_span(value: &Value) -> Span<'static> {
    match value {
        Value::String(s) => Span::styled(format!("\"{}\"", sanitize_text(s)), JSON_STRING),
        Value::Number(n) => Span::styled(n.to_string(), JSON_NUMBER),
        Value::Bool(b) => Span::styled(b.to_string(), JSON_LITERAL),
        Value::Null => Span::styled("null".to_string(), JSON_LITERAL),
        Value::Object(_) => Span::styled("{}".to_string(), JSON_PUNCT),
        Value::Array(_) => Span::styled("[]".to_string(), JSON_PUNCT),
    }
}
