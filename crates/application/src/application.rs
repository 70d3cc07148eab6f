//! Application - wires configuration into a forwarding run

use std::sync::Arc;
use std::time::Duration;

use contracts::{ForwarderConfig, ForwarderError};
use dispatcher::{create_message_sink, AnySink, MultiMessageSink};
use engine::{
    CancellationToken, EngineState, ForwardingEngine, ForwardingObserver, ForwardingPolicy,
    ForwardingStats,
};
use ingestion::AnyMessageSource;
use routing::MessageRouter;
use tracing::{info, instrument};

use crate::factory::{create_message_source, create_router};

/// Default bound for opening subscriptions
pub const DEFAULT_SOURCE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime switches not stored in the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationOptions {
    /// Keep running when a delivery fails
    pub ignore_sink_errors: bool,
    /// Treat replay marker storage failures as warnings
    pub ignore_replay_storage_errors: bool,
    /// Bound for opening a subscription, `None` waits indefinitely
    pub source_connection_timeout: Option<Duration>,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self {
            ignore_sink_errors: false,
            ignore_replay_storage_errors: false,
            source_connection_timeout: Some(DEFAULT_SOURCE_CONNECTION_TIMEOUT),
        }
    }
}

/// Collaborators built by [`Application::configure`]
struct Components {
    source: AnyMessageSource,
    sink: MultiMessageSink<AnySink>,
    router: MessageRouter,
}

/// A configured forwarder
pub struct Application {
    config: ForwarderConfig,
    options: ApplicationOptions,
    state: EngineState,
    components: Option<Components>,
    observer: Option<Arc<dyn ForwardingObserver>>,
}

impl Application {
    pub fn new(config: ForwarderConfig, options: ApplicationOptions) -> Self {
        Self {
            config,
            options,
            state: EngineState::Unconfigured,
            components: None,
            observer: None,
        }
    }

    /// Report engine events to `observer` instead of the tracing default
    pub fn with_observer(mut self, observer: Arc<dyn ForwardingObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    pub fn options(&self) -> ApplicationOptions {
        self.options
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Whether collaborators are built and waiting for `run`
    pub fn is_configured(&self) -> bool {
        self.components.is_some()
    }

    /// Build router, source and sink. Calling it again is a no-op.
    ///
    /// # Errors
    /// Invalid routing conditions, unusable subscriptions or destinations.
    #[instrument(name = "application_configure", skip(self))]
    pub async fn configure(&mut self) -> Result<(), ForwarderError> {
        if self.components.is_some() {
            return Ok(());
        }
        if self.state == EngineState::Stopped {
            return Err(ForwarderError::invalid_operation("application already ran"));
        }

        self.state = EngineState::Configuring;
        match self.build().await {
            Ok(components) => {
                self.components = Some(components);
                info!("Application configured");
                Ok(())
            }
            Err(e) => {
                self.state = EngineState::Unconfigured;
                Err(e)
            }
        }
    }

    async fn build(&self) -> Result<Components, ForwarderError> {
        let router = create_router(&self.config.router)?;
        let source = create_message_source(&self.config.source, &self.options)?;
        let sink = create_message_sink(&self.config.sink).await?;
        Ok(Components {
            source,
            sink,
            router,
        })
    }

    /// Forward until the sources are exhausted or `shutdown` is cancelled
    ///
    /// Configures first when needed. An application runs once.
    ///
    /// # Errors
    /// Configuration errors and fatal forwarding errors.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<ForwardingStats, ForwarderError> {
        self.configure().await?;
        let Some(Components {
            source,
            sink,
            router,
        }) = self.components.take()
        else {
            return Err(ForwarderError::invalid_operation("application is not configured"));
        };

        let policy = ForwardingPolicy {
            ignore_sink_errors: self.options.ignore_sink_errors,
        };
        let mut engine = ForwardingEngine::new(source, sink, router, policy);
        if let Some(observer) = &self.observer {
            engine = engine.with_observer(Arc::clone(observer));
        }

        self.state = EngineState::Listening;
        let result = engine.run(shutdown).await;
        self.state = EngineState::Stopped;
        result
    }
}
