//! SubscriptionSource - single subscription message source
//!
//! A bounded async-channel buffers events produced by the feed task. Closing
//! the source closes the channel: producers stop, buffered events stay
//! retrievable until drained.

use std::sync::Arc;
use std::time::Duration;

use async_channel::{bounded, Receiver, Sender};
use contracts::{ForwarderError, Message, MessageSource, SubscriptionConfig};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::metrics::SubscriptionMetrics;
use crate::mock::MockFeed;
use crate::recording::RecordingFeed;
use crate::replay::ReplayTracker;

/// Producer of a subscription's events
#[derive(Debug, Clone)]
pub enum Feed {
    /// Events are pushed by the caller through the sender returned by
    /// [`SubscriptionSource::channel`]
    External,
    /// Recorded events, the source is exhausted at end of file
    Recording(RecordingFeed),
    /// Synthetic events
    Mock(MockFeed),
}

impl Feed {
    pub fn from_config(config: &SubscriptionConfig) -> Self {
        match config {
            SubscriptionConfig::File { path, channel } => {
                Self::Recording(RecordingFeed::new(path, channel.clone()))
            }
            SubscriptionConfig::Mock {
                channel,
                interval_ms,
                count,
            } => Self::Mock(MockFeed::new(
                channel,
                Duration::from_millis(*interval_ms),
                *count,
            )),
        }
    }
}

/// Message source of one subscription
pub struct SubscriptionSource {
    name: String,
    feed: Feed,
    tx: Option<Sender<Message>>,
    rx: Receiver<Message>,
    producer: Option<JoinHandle<()>>,
    replay: Option<ReplayTracker>,
    connection_timeout: Option<Duration>,
    /// Received message whose marker bookkeeping has not finished yet
    stashed: Option<Message>,
    closed: bool,
    opened: bool,
    metrics: Arc<SubscriptionMetrics>,
}

impl SubscriptionSource {
    /// Create a source fed by `feed`, buffering up to `capacity` events
    pub fn new(name: impl Into<String>, feed: Feed, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        let tx = match feed {
            Feed::External => None,
            _ => Some(tx),
        };
        Self {
            name: name.into(),
            feed,
            tx,
            rx,
            producer: None,
            replay: None,
            connection_timeout: None,
            stashed: None,
            closed: true,
            opened: false,
            metrics: Arc::new(SubscriptionMetrics::new()),
        }
    }

    /// Create a source fed by the returned sender
    ///
    /// Dropping every sender exhausts the source once its buffer is drained.
    pub fn channel(name: impl Into<String>, capacity: usize) -> (Self, Sender<Message>) {
        let (tx, rx) = bounded(capacity.max(1));
        let source = Self {
            name: name.into(),
            feed: Feed::External,
            tx: None,
            rx,
            producer: None,
            replay: None,
            connection_timeout: None,
            stashed: None,
            closed: true,
            opened: false,
            metrics: Arc::new(SubscriptionMetrics::new()),
        };
        (source, tx)
    }

    /// Track replay markers of received events
    pub fn with_replay(mut self, tracker: ReplayTracker) -> Self {
        self.replay = Some(tracker);
        self
    }

    /// Bound the time `open()` may take (`None` = wait indefinitely)
    pub fn with_connection_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> Arc<SubscriptionMetrics> {
        self.metrics.clone()
    }

    /// Start the feed producer
    async fn connect(&mut self) -> Result<Option<JoinHandle<()>>, ForwarderError> {
        match &self.feed {
            Feed::External => Ok(None),
            Feed::Recording(feed) => {
                let messages = feed.load(&self.name).await?;
                let tx = self.take_sender()?;
                Ok(Some(RecordingFeed::spawn(messages, tx)))
            }
            Feed::Mock(feed) => {
                let feed = feed.clone();
                let after = match &mut self.replay {
                    Some(tracker) => tracker.marker(&feed.channel).await?,
                    None => None,
                };
                let tx = self.take_sender()?;
                Ok(Some(feed.spawn(tx, after)))
            }
        }
    }

    fn take_sender(&mut self) -> Result<Sender<Message>, ForwarderError> {
        self.tx
            .take()
            .ok_or_else(|| ForwarderError::invalid_operation(format!("source '{}' has no feed sender", self.name)))
    }

    async fn receive(&mut self) -> Result<Message, ForwarderError> {
        if self.closed && self.rx.is_empty() {
            return Err(ForwarderError::invalid_operation(format!(
                "source '{}' is closed",
                self.name
            )));
        }

        match self.rx.recv().await {
            Ok(message) => Ok(message),
            Err(_) => {
                // Feed finished and buffer drained
                if !self.closed {
                    info!(source = %self.name, "Subscription feed exhausted");
                }
                self.closed = true;
                Err(ForwarderError::invalid_operation(format!(
                    "source '{}' has no more messages",
                    self.name
                )))
            }
        }
    }

    /// Marker bookkeeping for the stashed message, `false` if it must be skipped
    async fn track_stashed(&mut self) -> Result<bool, ForwarderError> {
        let Some(tracker) = self.replay.as_mut() else {
            return Ok(true);
        };
        let Some(message) = self.stashed.as_ref() else {
            return Ok(true);
        };
        let (Some(channel), Some(replay_id)) = (message.channel(), message.replay_id()) else {
            return Ok(true);
        };
        let channel = channel.to_string();

        tracker.accept(&channel, replay_id).await.map_err(|e| {
            self.metrics.record_marker_error();
            e
        })
    }
}

impl MessageSource for SubscriptionSource {
    fn is_closed(&self) -> bool {
        self.closed
    }

    fn pending_count(&self) -> usize {
        self.rx.len() + usize::from(self.stashed.is_some())
    }

    fn has_pending_messages(&self) -> bool {
        self.pending_count() > 0
    }

    #[instrument(name = "subscription_open", skip(self), fields(source = %self.name))]
    async fn open(&mut self) -> Result<(), ForwarderError> {
        if !self.closed {
            return Err(ForwarderError::invalid_operation(format!(
                "source '{}' is already open",
                self.name
            )));
        }
        if self.opened {
            return Err(ForwarderError::invalid_operation(format!(
                "source '{}' cannot be reopened",
                self.name
            )));
        }

        let producer = match self.connection_timeout {
            Some(timeout) => {
                let name = self.name.clone();
                tokio::time::timeout(timeout, self.connect())
                    .await
                    .map_err(|_| {
                        ForwarderError::source(name, format!("connection timed out after {timeout:?}"))
                    })??
            }
            None => self.connect().await?,
        };

        self.producer = producer;
        self.closed = false;
        self.opened = true;
        info!(source = %self.name, "Subscription opened");
        Ok(())
    }

    #[instrument(name = "subscription_close", skip(self), fields(source = %self.name))]
    async fn close(&mut self) -> Result<(), ForwarderError> {
        if self.closed && self.producer.is_none() {
            return Ok(());
        }

        self.closed = true;
        self.rx.close();
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        debug!(
            source = %self.name,
            pending = self.pending_count(),
            "Subscription closed"
        );
        Ok(())
    }

    async fn get_message(&mut self) -> Result<(String, Message), ForwarderError> {
        loop {
            if self.stashed.is_none() {
                let message = self.receive().await?;
                self.metrics.record_received();
                self.stashed = Some(message);
            }

            let accepted = self.track_stashed().await?;
            let Some(message) = self.stashed.take() else {
                continue;
            };

            if accepted {
                return Ok((self.name.clone(), message));
            }
            self.metrics.record_skipped();
        }
    }
}

impl Drop for SubscriptionSource {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            if !producer.is_finished() {
                warn!(source = %self.name, "Subscription dropped while open");
            }
            producer.abort();
        }
    }
}
