use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::{config::SupervisorConfig, supervisor::Supervisor};
use crate::{
    error::RuntimeError,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a Supervisor with optional subscribers.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    runtime: Option<Handle>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            runtime: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive supervisor events (starts, restarts, exits, timers)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Runtime the subscriber workers run on.
    ///
    /// Defaults to the runtime `build` is called from.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds and returns the Supervisor instance.
    ///
    /// Without subscribers no runtime is needed. With subscribers, fails with
    /// [`RuntimeError::NoAsyncRuntime`] when no runtime handle was given and
    /// `build` is not called from within one.
    pub fn build(self) -> Result<Supervisor, RuntimeError> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        if self.subscribers.is_empty() {
            return Ok(Supervisor::new_internal(self.cfg, bus, None));
        }

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| RuntimeError::NoAsyncRuntime)?,
        };
        let set = SubscriberSet::new(self.subscribers, bus.clone(), &runtime);
        let token = CancellationToken::new();
        subscriber_listener(&runtime, &bus, set, token.clone());

        Ok(Supervisor::new_internal(self.cfg, bus, Some(token)))
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled.
fn subscriber_listener(runtime: &Handle, bus: &Bus, set: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    runtime.spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        // drain what was published before cancellation
        while let Ok(ev) = rx.try_recv() {
            set.emit(&ev);
        }
        set.shutdown().await;
    });
}
