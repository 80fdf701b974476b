//! Operations context for dependency injection

use pkgfetch_events::{EventEmitter, EventSender};
use pkgfetch_net::{ClientFactory, NetClientFactory};
use std::sync::Arc;

/// Collaborators shared by every fetch operation
#[derive(Clone)]
pub struct OpsCtx {
    /// Builds the HTTP clients for the manifest and each part
    pub clients: Arc<dyn ClientFactory>,
    /// Event sender for progress reporting
    pub tx: Option<EventSender>,
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

/// Builder for `OpsCtx`
#[derive(Default)]
pub struct OpsContextBuilder {
    clients: Option<Arc<dyn ClientFactory>>,
    tx: Option<EventSender>,
}

impl OpsContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_client_factory(mut self, clients: Arc<dyn ClientFactory>) -> Self {
        self.clients = Some(clients);
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Build the context, defaulting to a `NetClientFactory` with default settings
    #[must_use]
    pub fn build(self) -> OpsCtx {
        OpsCtx {
            clients: self
                .clients
                .unwrap_or_else(|| Arc::new(NetClientFactory::default())),
            tx: self.tx,
        }
    }
}
