use crate::broker::InMemoryBroker;

/// Consumer backend shared state
#[derive(Clone)]
pub struct AppState {
    /// Broker every received delivery is published to
    pub broker: InMemoryBroker,
}

impl AppState {
    pub fn new(broker: InMemoryBroker) -> Self {
        Self { broker }
    }
}
