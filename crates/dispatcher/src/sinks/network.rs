//! NetworkSink - UDP datagram per delivery

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use contracts::{ForwarderError, Message, MessageProperties, MessageSink};
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};

use crate::envelope::{DeclaredExchanges, Delivery};

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_datagram_size: usize,
}

impl NetworkSinkConfig {
    /// Parse the target address
    pub fn new(addr: &str, max_datagram_size: usize) -> Result<Self, ForwarderError> {
        let addr = addr
            .parse()
            .map_err(|e| ForwarderError::network(format!("invalid address '{addr}': {e}")))?;
        Ok(Self {
            addr,
            max_datagram_size,
        })
    }
}

/// Sink that sends each delivery as one UDP datagram
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    exchanges: DeclaredExchanges,
    socket: Mutex<Option<Arc<UdpSocket>>>,
}

impl NetworkSink {
    /// Create a new NetworkSink
    #[instrument(name = "network_sink_new", skip(name, exchanges), fields(target = %config.addr))]
    pub async fn new(
        name: impl Into<String>,
        config: NetworkSinkConfig,
        exchanges: DeclaredExchanges,
    ) -> Result<Self, ForwarderError> {
        let name = name.into();
        let bind_addr: SocketAddr = if config.addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| ForwarderError::network(format!("bind failed: {e}")))?;
        socket
            .connect(config.addr)
            .await
            .map_err(|e| ForwarderError::network(format!("connect to {} failed: {e}", config.addr)))?;

        debug!(
            sink = %name,
            target = %config.addr,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            exchanges,
            socket: Mutex::new(Some(Arc::new(socket))),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn socket(&self) -> Result<Arc<UdpSocket>, ForwarderError> {
        self.socket
            .lock()
            .map_err(|_| ForwarderError::network("socket lock poisoned"))?
            .clone()
            .ok_or_else(|| ForwarderError::network(format!("destination '{}' is closed", self.name)))
    }

    fn prepare_payload(&self, delivery: &Delivery<'_>) -> Result<Vec<u8>, ForwarderError> {
        let data = delivery.to_json()?;

        if data.len() > self.config.max_datagram_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_datagram_size,
                "Datagram too large"
            );
            return Err(ForwarderError::network(format!(
                "datagram of {} bytes exceeds limit of {}",
                data.len(),
                self.config.max_datagram_size
            )));
        }

        Ok(data)
    }
}

impl MessageSink for NetworkSink {
    #[instrument(
        name = "network_sink_consume",
        skip(self, message, properties),
        fields(sink = %self.name)
    )]
    async fn consume_message(
        &self,
        message: &Message,
        destination: &str,
        exchange: &str,
        routing_key: &str,
        properties: Option<&MessageProperties>,
    ) -> Result<(), ForwarderError> {
        self.exchanges.check(&self.name, exchange)?;
        let socket = self.socket()?;
        let delivery = Delivery::new(message, destination, exchange, routing_key, properties);
        let data = self.prepare_payload(&delivery)?;

        let sent = socket
            .send(&data)
            .await
            .map_err(|e| ForwarderError::network(format!("UDP send failed: {e}")))?;
        debug!(sink = %self.name, bytes = sent, "Sent");
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&self) -> Result<(), ForwarderError> {
        self.socket
            .lock()
            .map_err(|_| ForwarderError::network("socket lock poisoned"))?
            .take();
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}
