//! Forwarding engine - receive loop, per-message tasks and drain
//!
//! Every message taken from the source is forwarded by its own task. The
//! loop is the only writer of the task registry: spawning, completion
//! handling and draining all happen here, so no lock guards it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use contracts::{ForwarderError, Message, MessageSink, MessageSource, Route};
use routing::MessageRouter;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::observer::{DeliveryContext, ForwardingObserver, TracingObserver};
use crate::{EngineState, ForwardingStats};

type TaskOutcome = Result<Option<Route>, ForwarderError>;

/// How delivery failures are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardingPolicy {
    /// Log sink errors and keep running instead of stopping the engine
    pub ignore_sink_errors: bool,
}

/// Moves messages from a source to a sink according to a router
pub struct ForwardingEngine<S, K> {
    source: S,
    sink: Arc<K>,
    router: Arc<MessageRouter>,
    policy: ForwardingPolicy,
    observer: Arc<dyn ForwardingObserver>,
    state: EngineState,
    tasks: JoinSet<TaskOutcome>,
    pending: HashMap<task::Id, DeliveryContext>,
    stats: ForwardingStats,
}

impl<S, K> ForwardingEngine<S, K>
where
    S: MessageSource,
    K: MessageSink + Sync + 'static,
{
    pub fn new(source: S, sink: K, router: MessageRouter, policy: ForwardingPolicy) -> Self {
        Self {
            source,
            sink: Arc::new(sink),
            router: Arc::new(router),
            policy,
            observer: Arc::new(TracingObserver),
            state: EngineState::Configuring,
            tasks: JoinSet::new(),
            pending: HashMap::new(),
            stats: ForwardingStats::default(),
        }
    }

    /// Replace the default [`TracingObserver`]
    pub fn with_observer(mut self, observer: Arc<dyn ForwardingObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn policy(&self) -> ForwardingPolicy {
        self.policy
    }

    /// Forwarding tasks not yet completed
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Run until the source is exhausted or `shutdown` is cancelled and all
    /// buffered messages were forwarded.
    ///
    /// Whatever ends the receive loop, in-flight deliveries are awaited and
    /// the sink is closed before returning.
    ///
    /// # Errors
    /// Source errors, and sink errors unless `ignore_sink_errors` is set.
    #[instrument(name = "engine_run", skip_all, fields(ignore_sink_errors = self.policy.ignore_sink_errors))]
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<ForwardingStats, ForwarderError> {
        let started = Instant::now();

        if let Err(e) = self.source.open().await {
            warn!(error = %e, "Failed to open message source");
            if let Err(close_error) = self.source.close().await {
                warn!(error = %close_error, "Failed to close message source");
            }
            self.close_sink().await;
            self.set_state(EngineState::Stopped);
            return Err(e);
        }
        self.set_state(EngineState::Listening);

        let outcome = self.receive_loop(&shutdown).await;
        if outcome.is_err() && !self.source.is_closed() {
            if let Err(e) = self.source.close().await {
                warn!(error = %e, "Failed to close message source");
            }
        }

        self.set_state(EngineState::Draining);
        let drained = self.drain().await;
        let closed = self.sink.close().await;
        if let Err(e) = &closed {
            warn!(error = %e, "Failed to close message sink");
        }

        self.stats.duration = started.elapsed();
        self.set_state(EngineState::Stopped);
        info!(
            received = self.stats.received(),
            forwarded = self.stats.forwarded(),
            dropped = self.stats.dropped(),
            duration_secs = self.stats.duration.as_secs_f64(),
            "Forwarding engine stopped"
        );

        outcome.and(drained).and(closed)?;
        Ok(self.stats)
    }

    async fn receive_loop(&mut self, shutdown: &CancellationToken) -> Result<(), ForwarderError> {
        let mut draining = false;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled(), if !draining => {
                    draining = true;
                    self.set_state(EngineState::Draining);
                    info!(
                        pending = self.source.pending_count(),
                        in_flight = self.pending.len(),
                        "Shutdown requested, draining"
                    );
                    self.source.close().await?;
                }

                Some(joined) = self.tasks.join_next_with_id(), if !self.tasks.is_empty() => {
                    self.complete(joined)?;
                }

                received = self.source.get_message() => match received {
                    Ok((source_id, message)) => self.dispatch(source_id, message),
                    Err(e) if e.is_invalid_operation() => {
                        debug!(reason = %e, "Message source exhausted");
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                },
            }
        }
    }

    fn dispatch(&mut self, source_id: String, message: Message) {
        self.observer.on_received(&source_id, &message);
        self.stats.metrics.on_received();

        let delivery = DeliveryContext::new(&source_id, &message);
        let handle = self.tasks.spawn(forward(
            Arc::clone(&self.router),
            Arc::clone(&self.sink),
            source_id,
            message,
        ));
        self.pending.insert(handle.id(), delivery);

        self.stats.peak_in_flight = self.stats.peak_in_flight.max(self.pending.len());
        self.observer.on_in_flight(self.pending.len());
    }

    /// Handle one finished task. Runs exactly once per spawned task.
    fn complete(
        &mut self,
        joined: Result<(task::Id, TaskOutcome), JoinError>,
    ) -> Result<(), ForwarderError> {
        let id = match &joined {
            Ok((id, _)) => *id,
            Err(e) => e.id(),
        };
        let Some(delivery) = self.pending.remove(&id) else {
            warn!(task_id = %id, "Completed task missing from registry");
            return Ok(());
        };
        self.observer.on_in_flight(self.pending.len());

        match joined {
            Ok((_, Ok(Some(route)))) => {
                self.stats
                    .metrics
                    .on_forwarded(&route.destination, delivery.elapsed().as_secs_f64() * 1000.0);
                self.observer.on_forwarded(&delivery, &route);
            }
            Ok((_, Ok(None))) => {
                self.stats.metrics.on_dropped();
                self.observer.on_dropped(&delivery);
            }
            Ok((_, Err(e))) if is_delivery_error(&e) => {
                self.stats.metrics.on_sink_error();
                let ignored = self.policy.ignore_sink_errors;
                self.observer.on_sink_error(&delivery, &e, ignored);
                if !ignored {
                    return Err(e);
                }
            }
            Ok((_, Err(e))) => {
                self.stats.metrics.on_task_failure();
                self.observer.on_task_failure(&delivery, &e.to_string());
            }
            Err(e) => {
                self.stats.metrics.on_task_failure();
                self.observer.on_task_failure(&delivery, &describe_join_error(e));
            }
        }
        Ok(())
    }

    /// Await every remaining task; the first fatal completion is reported
    async fn drain(&mut self) -> Result<(), ForwarderError> {
        if !self.tasks.is_empty() {
            info!(in_flight = self.tasks.len(), "Waiting for in-flight deliveries");
        }

        let mut first_error = None;
        while let Some(joined) = self.tasks.join_next_with_id().await {
            if let Err(e) = self.complete(joined) {
                first_error.get_or_insert(e);
            }
        }
        debug_assert!(self.pending.is_empty());

        first_error.map_or(Ok(()), Err)
    }

    async fn close_sink(&self) {
        if let Err(e) = self.sink.close().await {
            warn!(error = %e, "Failed to close message sink");
        }
    }

    fn set_state(&mut self, state: EngineState) {
        if self.state != state {
            self.state = state;
            self.observer.on_state_change(state);
        }
    }
}

/// Forwarding task body: resolve a route and deliver, `None` means dropped
async fn forward<K: MessageSink>(
    router: Arc<MessageRouter>,
    sink: Arc<K>,
    source_id: String,
    message: Message,
) -> TaskOutcome {
    let Some(route) = router.find_route(&source_id, &message).cloned() else {
        return Ok(None);
    };

    sink.consume_message(
        &message,
        &route.destination,
        &route.exchange,
        &route.routing_key,
        route.properties.as_ref(),
    )
    .await?;

    Ok(Some(route))
}

fn is_delivery_error(error: &ForwarderError) -> bool {
    error.is_sink_error() || matches!(error, ForwarderError::Network { .. })
}

fn describe_join_error(error: JoinError) -> String {
    if error.is_panic() {
        let payload = error.into_panic();
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        format!("task panicked: {detail}")
    } else {
        "task cancelled".to_string()
    }
}
