use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Sent when a dashboard summary row is activated; the filtering view shows
/// measurements of that endpoint from its first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFilter {
    pub method: String,
    pub name: String,
}

impl EndpointFilter {
    pub fn new(method: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            name: name.into(),
        }
    }
}

pub type EndpointSender = UnboundedSender<EndpointFilter>;
pub type EndpointReceiver = UnboundedReceiver<EndpointFilter>;

pub fn endpoint_channel() -> (EndpointSender, EndpointReceiver) {
    mpsc::unbounded_channel()
}
