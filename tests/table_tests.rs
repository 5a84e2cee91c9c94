mod common;

use async_trait::async_trait;
use common::{param, FakeSource};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use profview::api::{PageSource, Row};
use profview::error::LoadError;
use profview::query_state::{Filters, SortDirection};
use profview::render::ColumnSpec;
use profview::table::{Applied, ServerSideTable, TableOptions, TableStatus};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ENDPOINT: &str = "api/measurements/";

fn columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("method", "Method"),
        ColumnSpec::new("name", "Endpoint"),
        ColumnSpec::new("elapsed", "Duration"),
        ColumnSpec::new("id", "Actions").unsortable(),
    ]
}

fn table_with(source: &Arc<FakeSource>, options: TableOptions) -> ServerSideTable {
    let source: Arc<dyn PageSource> = source.clone();
    ServerSideTable::new(ENDPOINT, options, source, Duration::from_secs(5))
}

fn table(source: &Arc<FakeSource>) -> ServerSideTable {
    table_with(
        source,
        TableOptions {
            columns: columns(),
            ..TableOptions::default()
        },
    )
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn first_id(table: &ServerSideTable) -> Option<u64> {
    table.rows().first().and_then(|row| row.get("id")).and_then(|v| v.as_u64())
}

#[tokio::test]
async fn test_overfetch_shows_page_size_rows_and_next() {
    let source = Arc::new(FakeSource::with_rows(26));
    let mut table = table(&source);

    assert_eq!(table.status(), TableStatus::Loading);
    assert_eq!(table.settle().await, Applied::Rendered);

    assert_eq!(table.rows().len(), 25);
    let info = table.page_info();
    assert!(info.has_next);
    assert!(!info.has_previous());
    assert_eq!((info.start_record, info.end_record), (1, 25));

    let controls = info.controls_label().unwrap();
    assert!(controls.contains("Next ▶"));
    assert!(!controls.contains("Previous"));

    let params = source.last_params();
    assert_eq!(param(&params, "skip"), Some("0"));
    assert_eq!(param(&params, "limit"), Some("26"));
    assert_eq!(param(&params, "sort"), Some("endedAt,desc"));
}

#[tokio::test]
async fn test_exact_page_has_no_next() {
    let source = Arc::new(FakeSource::with_rows(25));
    let mut table = table(&source);
    table.settle().await;

    assert_eq!(table.rows().len(), 25);
    assert!(!table.page_info().has_next);
    assert!(table.page_info().controls_label().is_none());
}

#[tokio::test]
async fn test_paginate_requests_next_skip() {
    let source = Arc::new(FakeSource::with_rows(26));
    let mut table = table(&source);
    table.settle().await;

    assert!(table.paginate(1));
    assert_eq!(table.settle().await, Applied::Rendered);

    assert_eq!(param(&source.last_params(), "skip"), Some("25"));
    assert_eq!(table.rows().len(), 1);
    assert_eq!(first_id(&table), Some(25));

    let info = table.page_info();
    assert_eq!(info.current_page, 1);
    assert_eq!((info.start_record, info.end_record), (26, 26));
    assert!(info.has_previous());
    assert!(!info.has_next);
}

#[tokio::test]
async fn test_filter_keeps_sort_and_resets_skip() {
    let source = Arc::new(FakeSource::with_rows(100));
    let mut table = table(&source);
    table.settle().await;

    table.sort("elapsed");
    table.sort("elapsed");
    table.paginate(2);
    table.settle().await;
    assert_eq!(param(&source.last_params(), "sort"), Some("elapsed,desc"));

    table.filter(Filters::new().with("method", "GET"));
    table.settle().await;

    let params = source.last_params();
    assert_eq!(param(&params, "sort"), Some("elapsed,desc"));
    assert_eq!(param(&params, "method"), Some("GET"));
    assert_eq!(param(&params, "skip"), Some("0"));
}

#[tokio::test]
async fn test_null_filters_are_not_sent() {
    let source = Arc::new(FakeSource::with_rows(3));
    let mut table = table_with(
        &source,
        TableOptions {
            columns: columns(),
            initial_filters: Filters::new().with("name", "/a"),
            ..TableOptions::default()
        },
    );
    table.settle().await;
    assert_eq!(param(&source.last_params(), "name"), Some("/a"));

    table.filter(Filters::new().without("name"));
    table.settle().await;

    let params = source.last_params();
    assert_eq!(param(&params, "name"), None);
    assert_eq!(param(&params, "method"), None);
    assert_eq!(param(&params, "startedAt"), None);
}

#[tokio::test]
async fn test_change_page_size_twice_reloads_once() {
    let source = Arc::new(FakeSource::with_rows(120));
    let mut table = table(&source);
    table.settle().await;
    assert_eq!(source.call_count(), 1);

    assert!(table.change_page_size(50));
    assert!(!table.change_page_size(50));
    table.settle().await;

    assert_eq!(source.call_count(), 2);
    assert_eq!(table.rows().len(), 50);
    assert_eq!(param(&source.last_params(), "limit"), Some("51"));
}

#[tokio::test]
async fn test_invalid_page_size_input_is_ignored() {
    let source = Arc::new(FakeSource::with_rows(10));
    let mut table = table(&source);
    table.settle().await;
    let generation = table.generation();

    assert!(!table.change_page_size_input("lots"));
    assert!(!table.change_page_size_input(""));
    assert!(!table.change_page_size(0));
    assert_eq!(table.generation(), generation);
    assert_eq!(table.page_size(), 25);

    assert!(table.change_page_size_input(" 10 "));
    assert_eq!(table.page_size(), 10);
}

#[tokio::test]
async fn test_page_size_options_contain_configured_size() {
    let source = Arc::new(FakeSource::with_rows(0));
    let table = table_with(
        &source,
        TableOptions {
            page_size: 30,
            page_size_options: vec![100, 10, 25, 10, 50],
            ..TableOptions::default()
        },
    );
    assert_eq!(table.page_size_options(), &[10, 25, 30, 50, 100]);
}

#[tokio::test]
async fn test_cycle_page_size_walks_options() {
    let source = Arc::new(FakeSource::with_rows(0));
    let mut table = table(&source);
    table.settle().await;

    assert!(table.cycle_page_size(true));
    assert_eq!(table.page_size(), 50);
    assert!(table.cycle_page_size(true));
    assert_eq!(table.page_size(), 100);
    assert!(!table.cycle_page_size(true));
    assert!(table.cycle_page_size(false));
    assert_eq!(table.page_size(), 50);
}

#[tokio::test]
async fn test_empty_first_page_is_empty_state() {
    let source = Arc::new(FakeSource::with_rows(0));
    let mut table = table(&source);
    table.settle().await;

    let info = table.page_info();
    assert!(info.is_empty_state());
    assert!(info.controls_label().is_none());
    assert_eq!(table.status(), TableStatus::Rendered);
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let source = Arc::new(FakeSource::with_rows(60));
    source.delay_skip(0, Duration::from_millis(200));
    let mut table = table(&source);

    // The first load is still sleeping when page 1 is requested.
    table.paginate(1);
    assert_eq!(table.settle().await, Applied::Rendered);
    assert_eq!(first_id(&table), Some(25));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(table.poll(), vec![Applied::Stale]);
    assert_eq!(first_id(&table), Some(25));
    assert_eq!(table.page_info().current_page, 1);
}

#[tokio::test]
async fn test_failed_load_keeps_previous_rows() {
    let source = Arc::new(FakeSource::with_rows(30));
    let mut table = table(&source);
    table.settle().await;

    source.fail_next(LoadError::http(500, "Internal Server Error"));
    table.paginate(1);
    let applied = table.settle().await;

    assert_eq!(applied, Applied::Failed(LoadError::http(500, "Internal Server Error")));
    assert_eq!(table.status(), TableStatus::Rendered);
    assert_eq!(table.rows().len(), 25);
    assert_eq!(first_id(&table), Some(0));
    assert_eq!(table.page_info().current_page, 0);
    assert!(table.last_error().is_some());

    // The query is back on the rendered page, so retrying means asking again.
    assert_eq!(table.state().skip(), 0);
    assert!(table.paginate(1));
    assert_eq!(table.settle().await, Applied::Rendered);
    assert!(table.last_error().is_none());
    assert_eq!(first_id(&table), Some(25));
}

#[tokio::test]
async fn test_failed_sort_keeps_rendered_query() {
    let source = Arc::new(FakeSource::with_rows(60));
    let mut table = table(&source);
    table.settle().await;

    source.fail_next(LoadError::http(502, "Bad Gateway"));
    table.sort("name");
    assert!(matches!(table.settle().await, Applied::Failed(_)));

    assert_eq!(table.state().sort().field, "endedAt");
    assert_eq!(table.state().sort().direction, SortDirection::Desc);
    assert_eq!(table.header_labels()[1], "Endpoint");
    assert_eq!(first_id(&table), Some(0));

    assert!(table.next_page());
    assert_eq!(table.settle().await, Applied::Rendered);
    let params = source.last_params();
    assert_eq!(param(&params, "sort"), Some("endedAt,desc"));
    assert_eq!(param(&params, "skip"), Some("25"));
    assert_eq!(first_id(&table), Some(25));
}

#[tokio::test]
async fn test_out_of_range_page_is_ignored() {
    let source = Arc::new(FakeSource::with_rows(30));
    let mut table = table(&source);
    table.settle().await;
    let generation = table.generation();

    assert!(!table.paginate(usize::MAX));
    assert_eq!(table.generation(), generation);
    assert_eq!(table.state().skip(), 0);
    assert_eq!(table.status(), TableStatus::Rendered);
}

#[tokio::test]
async fn test_failed_first_load_returns_to_idle() {
    let source = Arc::new(FakeSource::with_rows(30));
    source.fail_next(LoadError::malformed("row is a string, expected object"));
    let mut table = table(&source);

    assert!(matches!(table.settle().await, Applied::Failed(LoadError::Malformed(_))));
    assert_eq!(table.status(), TableStatus::Idle);
    assert!(table.rows().is_empty());
}

#[tokio::test]
async fn test_slow_load_times_out() {
    let source = Arc::new(FakeSource::with_rows(5));
    source.delay_skip(0, Duration::from_millis(500));
    let source_dyn: Arc<dyn PageSource> = source.clone();
    let mut table = ServerSideTable::new(
        ENDPOINT,
        TableOptions::default(),
        source_dyn,
        Duration::from_millis(50),
    );

    assert_eq!(
        table.settle().await,
        Applied::Failed(LoadError::Timeout(Duration::from_millis(50)))
    );
    assert_eq!(table.status(), TableStatus::Idle);
}

#[tokio::test]
async fn test_sort_toggles_direction() {
    let source = Arc::new(FakeSource::with_rows(5));
    let mut table = table(&source);

    assert!(table.sort("name"));
    assert_eq!(table.state().sort().direction, SortDirection::Asc);
    assert!(table.sort("name"));
    assert_eq!(table.state().sort().direction, SortDirection::Desc);
    assert!(table.sort("name"));
    assert_eq!(table.state().sort().direction, SortDirection::Asc);

    assert!(table.sort("elapsed"));
    assert_eq!(table.state().sort().field, "elapsed");
    assert_eq!(table.state().sort().direction, SortDirection::Asc);

    table.settle().await;
    assert_eq!(param(&source.last_params(), "sort"), Some("elapsed,asc"));
    assert_eq!(table.header_labels()[2], "Duration ▲");
}

#[tokio::test]
async fn test_unsortable_column_is_ignored() {
    let source = Arc::new(FakeSource::with_rows(5));
    let mut table = table(&source);
    let generation = table.generation();

    assert!(!table.sort("id"));
    assert!(!table.sort("unknown"));
    assert_eq!(table.generation(), generation);
    assert_eq!(table.state().sort().field, "endedAt");
}

#[tokio::test]
async fn test_skip_stays_a_multiple_of_page_size() {
    let source = Arc::new(FakeSource::with_rows(500));
    let mut table = table(&source);

    table.paginate(3);
    table.change_page_size(10);
    table.paginate(7);
    table.sort("name");
    table.paginate(2);
    table.filter(Filters::new().with("method", "POST"));
    table.paginate(4);
    table.change_page_size(100);
    table.paginate(1);
    table.settle().await;

    let state = table.state();
    assert_eq!(state.skip() % state.limit(), 0);
    assert_eq!(state.skip(), 100);
    assert_eq!(param(&source.last_params(), "skip"), Some("100"));
}

#[tokio::test]
async fn test_row_click_receives_selected_row() {
    let source = Arc::new(FakeSource::with_rows(3));
    let clicked: Arc<Mutex<Vec<Row>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = clicked.clone();
    let mut table = table_with(
        &source,
        TableOptions {
            columns: columns(),
            on_row_click: Some(Box::new(move |row: &Row| sink.lock().unwrap().push(row.clone()))),
            ..TableOptions::default()
        },
    );
    table.settle().await;

    assert_eq!(table.selected_index(), Some(0));
    assert!(table.handle_key(key(KeyCode::Down)));
    assert!(table.handle_key(key(KeyCode::Enter)));

    let clicked = clicked.lock().unwrap();
    assert_eq!(clicked.len(), 1);
    assert_eq!(clicked[0].get_str("name"), Some("/api/items/1"));
}

#[tokio::test]
async fn test_arrow_keys_page_through_results() {
    let source = Arc::new(FakeSource::with_rows(40));
    let mut table = table(&source);
    table.settle().await;

    // No previous page yet.
    table.handle_key(key(KeyCode::Left));
    assert_eq!(table.status(), TableStatus::Rendered);

    table.handle_key(key(KeyCode::Right));
    table.settle().await;
    assert_eq!(table.page_info().current_page, 1);
    assert_eq!(table.rows().len(), 15);

    table.handle_key(key(KeyCode::Left));
    table.settle().await;
    assert_eq!(table.page_info().current_page, 0);
}

#[tokio::test]
async fn test_keyboard_sort_uses_focused_column() {
    let source = Arc::new(FakeSource::with_rows(5));
    let mut table = table(&source);
    table.settle().await;

    table.handle_key(key(KeyCode::Char('>')));
    assert_eq!(table.focused_column(), 1);
    table.handle_key(key(KeyCode::Char('s')));
    assert_eq!(table.state().sort().field, "name");

    table.handle_key(key(KeyCode::Char('<')));
    table.handle_key(key(KeyCode::Char('<')));
    assert_eq!(table.focused_column(), 3);
    table.handle_key(key(KeyCode::Char('s')));
    assert_eq!(table.state().sort().field, "name");
}

/// Serves a single row whose endpoint name carries terminal escapes.
struct EscapeSource;

#[async_trait]
impl PageSource for EscapeSource {
    async fn fetch_rows(&self, _endpoint: &str, _params: &[(String, String)]) -> Result<Vec<Row>, LoadError> {
        Ok(vec![Row::from(json!({
            "id": 1,
            "method": "GET",
            "name": "\u{1b}[31m/evil/path/x\u{1b}[0m",
            "elapsed": 0.25,
        }))])
    }
}

#[tokio::test]
async fn test_draw_strips_escapes_from_cells() {
    let source: Arc<dyn PageSource> = Arc::new(EscapeSource);
    let options = TableOptions {
        columns: columns(),
        ..TableOptions::default()
    };
    let mut table = ServerSideTable::new(ENDPOINT, options, source, Duration::from_secs(5));
    assert_eq!(table.settle().await, Applied::Rendered);

    let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
    terminal.draw(|frame| table.draw(frame, frame.area(), "Requests")).unwrap();
    let buffer = terminal.backend().buffer().clone();
    let width = buffer.area.width as usize;
    let lines: Vec<String> = buffer
        .content
        .chunks(width)
        .map(|cells| cells.iter().map(|cell| cell.symbol()).collect())
        .collect();
    let screen = lines.concat();

    assert!(!screen.contains('\u{1b}'));
    assert!(screen.contains("/evil/path/x"));
    assert!(!screen.contains("[31m"));

    // The Endpoint column is sized by the visible text, not the raw escapes.
    let header = lines
        .iter()
        .find(|line| line.contains("Method") && line.contains("Endpoint"))
        .unwrap();
    let endpoint = header.find("Endpoint").unwrap();
    let duration = header.find("Duration").unwrap();
    assert_eq!(duration - endpoint, "/evil/path/x".len() + 2);
}
