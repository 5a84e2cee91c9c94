mod common;

use common::FakeApi;
use crossterm::event::KeyEvent;
use profview::config::Config;
use profview::messages::endpoint_channel;
use profview::tab_manager::TabManager;
use profview::tabs::{View, ViewContext};
use ratatui::{layout::Rect, Frame};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

struct RecordingView {
    name: &'static str,
    log: Log,
    inits: usize,
}

impl View for RecordingView {
    fn init(&mut self, _ctx: &ViewContext) {
        self.inits += 1;
        self.log.lock().unwrap().push(format!("init {}", self.name));
    }

    fn cleanup(&mut self) {
        self.log.lock().unwrap().push(format!("cleanup {}", self.name));
    }

    fn draw(&mut self, _frame: &mut Frame, _area: Rect) {}

    fn handle_input(&mut self, _key: KeyEvent) -> bool {
        false
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

fn context() -> ViewContext {
    let (endpoint_tx, _rx) = endpoint_channel();
    ViewContext {
        api: Arc::new(FakeApi::new(0)),
        config: Config::default(),
        endpoint_tx,
    }
}

fn manager(log: &Log, built: &Arc<Mutex<usize>>) -> TabManager {
    let mut manager = TabManager::new();
    for name in ["one", "two", "three"] {
        let log = log.clone();
        let built = built.clone();
        manager.register(name, move || {
            *built.lock().unwrap() += 1;
            Box::new(RecordingView {
                name,
                log: log.clone(),
                inits: 0,
            }) as Box<dyn View>
        });
    }
    manager
}

#[test]
fn test_register_and_lookup() {
    let log = Log::default();
    let built = Arc::new(Mutex::new(0));
    let manager = manager(&log, &built);

    assert_eq!(manager.tab_names(), ["one", "two", "three"]);
    assert_eq!(manager.index_of("two"), Some(1));
    assert_eq!(manager.index_of("four"), None);
    assert_eq!(manager.current_tab(), None);
    assert!(manager.current_view().is_none());
}

#[test]
fn test_views_are_built_lazily() {
    let log = Log::default();
    let built = Arc::new(Mutex::new(0));
    let mut manager = manager(&log, &built);
    let ctx = context();

    assert_eq!(*built.lock().unwrap(), 0);
    assert!(manager.switch_tab(1, &ctx));
    assert!(manager.is_built(1));
    assert!(!manager.is_built(0));
    assert_eq!(*built.lock().unwrap(), 1);
    assert_eq!(manager.current_tab_name(), Some("two"));
}

#[test]
fn test_cleanup_runs_before_init() {
    let log = Log::default();
    let built = Arc::new(Mutex::new(0));
    let mut manager = manager(&log, &built);
    let ctx = context();

    manager.switch_tab(0, &ctx);
    manager.switch_tab(2, &ctx);
    manager.switch_tab(0, &ctx);

    assert_eq!(
        *log.lock().unwrap(),
        vec!["init one", "cleanup one", "init three", "cleanup three", "init one"]
    );
    // the first view was kept and re-initialised
    assert_eq!(*built.lock().unwrap(), 2);
    assert_eq!(manager.view_as::<RecordingView>(0).unwrap().inits, 2);
}

#[test]
fn test_switch_to_current_or_unknown_tab_is_noop() {
    let log = Log::default();
    let built = Arc::new(Mutex::new(0));
    let mut manager = manager(&log, &built);
    let ctx = context();

    manager.switch_tab(1, &ctx);
    assert!(!manager.switch_tab(1, &ctx));
    assert!(!manager.switch_tab(7, &ctx));
    assert_eq!(*log.lock().unwrap(), vec!["init two"]);
    assert_eq!(manager.current_tab(), Some(1));
}

#[test]
fn test_next_and_previous_wrap() {
    let log = Log::default();
    let built = Arc::new(Mutex::new(0));
    let mut manager = manager(&log, &built);
    let ctx = context();

    manager.next_tab(&ctx);
    assert_eq!(manager.current_tab(), Some(0));
    manager.previous_tab(&ctx);
    assert_eq!(manager.current_tab(), Some(2));
    manager.next_tab(&ctx);
    assert_eq!(manager.current_tab(), Some(0));
}

#[test]
fn test_shutdown_cleans_up_active_view() {
    let log = Log::default();
    let built = Arc::new(Mutex::new(0));
    let mut manager = manager(&log, &built);
    let ctx = context();

    manager.switch_tab(2, &ctx);
    manager.shutdown();

    assert_eq!(manager.current_tab(), None);
    assert_eq!(log.lock().unwrap().last().unwrap(), "cleanup three");
}

#[test]
fn test_view_as_needs_built_view() {
    let log = Log::default();
    let built = Arc::new(Mutex::new(0));
    let mut manager = manager(&log, &built);

    assert!(manager.view_as::<RecordingView>(0).is_none());
    manager.switch_tab(0, &context());
    assert!(manager.view_as::<RecordingView>(0).is_some());
}
