use crate::tabs::base::{View, ViewContext};
use log::info;

pub type ViewFactory = Box<dyn Fn() -> Box<dyn View> + Send>;

/// Tab navigation with lazily constructed views.
///
/// A view is built the first time its tab is activated and kept afterwards;
/// it is re-initialised on every activation. The previously active view is
/// always cleaned up before the next one is initialised.
#[derive(Default)]
pub struct TabManager {
    tab_names: Vec<String>,
    factories: Vec<ViewFactory>,
    views: Vec<Option<Box<dyn View>>>,
    current_tab: Option<usize>,
}

impl TabManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tab; returns its index.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> usize
    where
        F: Fn() -> Box<dyn View> + Send + 'static,
    {
        self.tab_names.push(name.into());
        self.factories.push(Box::new(factory));
        self.views.push(None);
        self.tab_names.len() - 1
    }

    /// Get the current tab index
    pub fn current_tab(&self) -> Option<usize> {
        self.current_tab
    }

    /// Get the current tab name
    pub fn current_tab_name(&self) -> Option<&str> {
        self.current_tab
            .and_then(|index| self.tab_names.get(index))
            .map(|name| name.as_str())
    }

    /// Get all tab names
    pub fn tab_names(&self) -> &[String] {
        &self.tab_names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tab_names.iter().position(|n| n == name)
    }

    /// Whether the view behind `index` has been constructed yet.
    pub fn is_built(&self, index: usize) -> bool {
        self.views.get(index).map_or(false, Option::is_some)
    }

    /// Activates `index`. Selecting the active tab or an unknown index does
    /// nothing and returns `false`.
    pub fn switch_tab(&mut self, index: usize, ctx: &ViewContext) -> bool {
        if self.current_tab == Some(index) || index >= self.tab_names.len() {
            return false;
        }

        if let Some(previous) = self.current_tab {
            if let Some(view) = self.views[previous].as_mut() {
                view.cleanup();
            }
        }

        let factory = &self.factories[index];
        let view = self.views[index].get_or_insert_with(|| factory());
        view.init(ctx);
        self.current_tab = Some(index);
        info!("switched to tab `{}`", self.tab_names[index]);
        true
    }

    /// Switch to the next tab
    pub fn next_tab(&mut self, ctx: &ViewContext) -> bool {
        if self.tab_names.is_empty() {
            return false;
        }
        let next = self.current_tab.map_or(0, |i| (i + 1) % self.tab_names.len());
        self.switch_tab(next, ctx)
    }

    /// Switch to the previous tab
    pub fn previous_tab(&mut self, ctx: &ViewContext) -> bool {
        if self.tab_names.is_empty() {
            return false;
        }
        let len = self.tab_names.len();
        let previous = self.current_tab.map_or(0, |i| (i + len - 1) % len);
        self.switch_tab(previous, ctx)
    }

    pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
        let index = self.current_tab?;
        self.views.get_mut(index)?.as_mut()
    }

    pub fn current_view(&self) -> Option<&dyn View> {
        let index = self.current_tab?;
        self.views.get(index)?.as_deref()
    }

    /// Downcasts a constructed view to its concrete type.
    pub fn view_as<T: View>(&mut self, index: usize) -> Option<&mut T> {
        self.views
            .get_mut(index)?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Cleans up the active view, e.g. on exit.
    pub fn shutdown(&mut self) {
        if let Some(view) = self.current_view_mut() {
            view.cleanup();
        }
        self.current_tab = None;
    }
}
