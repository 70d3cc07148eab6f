//! AnyMessageSource - source selected at configuration time

use contracts::{ForwarderError, Message, MessageSource};

use crate::{MultiMessageSource, SubscriptionSource};

/// One subscription, or a fan-in over several
pub enum AnyMessageSource {
    Single(SubscriptionSource),
    Multi(MultiMessageSource<SubscriptionSource>),
}

impl AnyMessageSource {
    /// Names of the underlying subscriptions
    pub fn subscription_names(&self) -> Vec<&str> {
        match self {
            Self::Single(source) => vec![source.name()],
            Self::Multi(multi) => multi.sources().iter().map(SubscriptionSource::name).collect(),
        }
    }
}

impl MessageSource for AnyMessageSource {
    fn is_closed(&self) -> bool {
        match self {
            Self::Single(source) => source.is_closed(),
            Self::Multi(source) => source.is_closed(),
        }
    }

    fn pending_count(&self) -> usize {
        match self {
            Self::Single(source) => source.pending_count(),
            Self::Multi(source) => source.pending_count(),
        }
    }

    fn has_pending_messages(&self) -> bool {
        match self {
            Self::Single(source) => source.has_pending_messages(),
            Self::Multi(source) => source.has_pending_messages(),
        }
    }

    async fn open(&mut self) -> Result<(), ForwarderError> {
        match self {
            Self::Single(source) => source.open().await,
            Self::Multi(source) => source.open().await,
        }
    }

    async fn close(&mut self) -> Result<(), ForwarderError> {
        match self {
            Self::Single(source) => source.close().await,
            Self::Multi(source) => source.close().await,
        }
    }

    async fn get_message(&mut self) -> Result<(String, Message), ForwarderError> {
        match self {
            Self::Single(source) => source.get_message().await,
            Self::Multi(source) => source.get_message().await,
        }
    }
}
