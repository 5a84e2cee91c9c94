use crossterm::event::{KeyCode, KeyEvent};
use profview::dropdown::{Dropdown, DropdownEvent};

fn methods() -> Dropdown {
    Dropdown::new(vec![
        (String::new(), "All methods".to_string()),
        ("GET".to_string(), "GET".to_string()),
        ("POST".to_string(), "POST".to_string()),
    ])
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::from(code)
}

#[test]
fn test_initial_selection() {
    let dropdown = methods();
    assert_eq!(dropdown.value(), "");
    assert_eq!(dropdown.label(), "All methods");
    assert!(!dropdown.is_open());
}

#[test]
fn test_sync_is_case_insensitive() {
    let mut dropdown = methods();
    assert!(dropdown.sync("post"));
    assert_eq!(dropdown.value(), "POST");

    assert!(!dropdown.sync("TRACE"));
    assert_eq!(dropdown.value(), "POST");

    assert!(dropdown.sync(""));
    assert_eq!(dropdown.label(), "All methods");
}

#[test]
fn test_keys_ignored_while_closed() {
    let mut dropdown = methods();
    assert_eq!(dropdown.handle_key(key(KeyCode::Down)), DropdownEvent::None);
    assert_eq!(dropdown.handle_key(key(KeyCode::Enter)), DropdownEvent::None);
    assert_eq!(dropdown.value(), "");
}

#[test]
fn test_choose_option() {
    let mut dropdown = methods();
    dropdown.open();
    assert!(dropdown.is_open());

    dropdown.handle_key(key(KeyCode::Down));
    dropdown.handle_key(key(KeyCode::Down));
    assert_eq!(
        dropdown.handle_key(key(KeyCode::Enter)),
        DropdownEvent::Changed("POST".to_string())
    );
    assert!(!dropdown.is_open());
    assert_eq!(dropdown.value(), "POST");
}

#[test]
fn test_down_stops_at_last_option() {
    let mut dropdown = methods();
    dropdown.open();
    for _ in 0..10 {
        dropdown.handle_key(key(KeyCode::Down));
    }
    dropdown.handle_key(key(KeyCode::Up));
    assert_eq!(
        dropdown.handle_key(key(KeyCode::Enter)),
        DropdownEvent::Changed("GET".to_string())
    );
}

#[test]
fn test_reselecting_current_value_only_closes() {
    let mut dropdown = methods();
    dropdown.sync("GET");
    dropdown.open();
    assert_eq!(dropdown.handle_key(key(KeyCode::Enter)), DropdownEvent::Closed);
    assert_eq!(dropdown.value(), "GET");
}

#[test]
fn test_escape_discards_cursor() {
    let mut dropdown = methods();
    dropdown.open();
    dropdown.handle_key(key(KeyCode::Down));
    assert_eq!(dropdown.handle_key(key(KeyCode::Esc)), DropdownEvent::Closed);
    assert!(!dropdown.is_open());
    assert_eq!(dropdown.value(), "");
}

#[test]
fn test_close_and_destroy() {
    let mut dropdown = methods();
    dropdown.open();
    dropdown.close();
    assert!(!dropdown.is_open());

    dropdown.destroy();
    assert!(dropdown.is_destroyed());
    dropdown.open();
    assert!(!dropdown.is_open());
}

#[test]
fn test_empty_dropdown_never_opens() {
    let mut dropdown = Dropdown::new(Vec::new());
    dropdown.open();
    assert!(!dropdown.is_open());
    assert_eq!(dropdown.value(), "");
}
