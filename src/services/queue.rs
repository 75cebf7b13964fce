//! RabbitMQ adapter for publishing and consuming JSON messages.

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicGetOptions, BasicPublishOptions,
        BasicQosOptions, ConfirmSelectOptions, ExchangeDeclareOptions, QueueDeclareOptions,
    },
    types::FieldTable,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::{error::ApiError, utils::PiiScrubber};

const PERSISTENT: u8 = 2;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("message broker error: {0}")]
    Broker(#[from] lapin::Error),
    #[error("message broker connection is closed")]
    Disconnected,
    #[error("payload cannot be encoded as JSON: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("broker did not confirm the message")]
    Nacked,
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Broker(_) | QueueError::Disconnected => {
                ApiError::ServiceUnavailable("Message broker unavailable".to_string())
            }
            QueueError::Encode(e) => ApiError::internal(e.to_string()),
            QueueError::Nacked => ApiError::Upstream("message was nacked by the broker".to_string()),
        }
    }
}

/// Publish/consume port over a message broker.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publish `payload` as JSON to a durable topic exchange.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &Value,
    ) -> Result<(), QueueError>;

    /// Fetch and acknowledge at most one message from a durable queue.
    async fn consume_one(&self, queue: &str) -> Result<Option<Value>, QueueError>;

    /// Start a background consumer that logs and acknowledges every message.
    async fn start_consumer(&self, queue: &str) -> Result<(), QueueError>;

    async fn check(&self) -> Result<(), QueueError>;
}

pub struct AmqpBroker {
    connection: Connection,
    prefetch: u16,
    scrubber: PiiScrubber,
}

impl AmqpBroker {
    pub async fn connect(url: &str, prefetch: u16, scrubber: PiiScrubber) -> Result<Self, QueueError> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        Ok(Self {
            connection,
            prefetch,
            scrubber,
        })
    }

    pub async fn close(&self) -> Result<(), QueueError> {
        if self.connection.status().connected() {
            self.connection.close(200, "shutdown").await?;
        }
        Ok(())
    }
}

/// Message bodies are JSON when possible, raw text otherwise.
pub fn decode_payload(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

async fn declare_queue(channel: &Channel, queue: &str) -> Result<(), QueueError> {
    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

async fn close_quietly(channel: &Channel) {
    if let Err(e) = channel.close(200, "done").await {
        debug!(error = %e, "Channel close failed");
    }
}

async fn publish_on(
    channel: &Channel,
    exchange: &str,
    routing_key: &str,
    payload: &Value,
) -> Result<(), QueueError> {
    let body = serde_json::to_vec(payload)?;
    channel
        .confirm_select(ConfirmSelectOptions::default())
        .await?;

    // The default exchange always exists and cannot be redeclared.
    if !exchange.is_empty() {
        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
    }

    let confirmation = channel
        .basic_publish(
            exchange,
            routing_key,
            BasicPublishOptions::default(),
            &body,
            BasicProperties::default()
                .with_content_type("application/json".into())
                .with_delivery_mode(PERSISTENT),
        )
        .await?
        .await?;

    if confirmation.is_nack() {
        return Err(QueueError::Nacked);
    }
    Ok(())
}

async fn get_on(channel: &Channel, queue: &str) -> Result<Option<Value>, QueueError> {
    declare_queue(channel, queue).await?;

    let Some(message) = channel.basic_get(queue, BasicGetOptions::default()).await? else {
        return Ok(None);
    };
    let payload = decode_payload(&message.delivery.data);
    message
        .delivery
        .acker
        .ack(BasicAckOptions::default())
        .await?;
    Ok(Some(payload))
}

async fn drain(channel: Channel, mut consumer: Consumer, queue: String, scrubber: PiiScrubber) {
    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                let payload = scrubber.scrub(&decode_payload(&delivery.data));
                info!(queue = %queue, payload = %payload, "Consumed message");
                if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
                    warn!(queue = %queue, error = %e, "Failed to acknowledge message");
                }
            }
            Err(e) => {
                warn!(queue = %queue, error = %e, "Consumer stream failed");
                break;
            }
        }
    }
    info!(queue = %queue, "Consumer stopped");
    close_quietly(&channel).await;
}

#[async_trait]
impl MessageBroker for AmqpBroker {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &Value,
    ) -> Result<(), QueueError> {
        let channel = self.connection.create_channel().await?;
        let result = publish_on(&channel, exchange, routing_key, payload).await;
        close_quietly(&channel).await;
        result
    }

    async fn consume_one(&self, queue: &str) -> Result<Option<Value>, QueueError> {
        let channel = self.connection.create_channel().await?;
        let result = get_on(&channel, queue).await;
        close_quietly(&channel).await;
        result
    }

    async fn start_consumer(&self, queue: &str) -> Result<(), QueueError> {
        let channel = self.connection.create_channel().await?;
        channel
            .basic_qos(self.prefetch, BasicQosOptions::default())
            .await?;
        declare_queue(&channel, queue).await?;

        let tag = format!("keel-{}", Uuid::new_v4());
        let consumer = channel
            .basic_consume(
                queue,
                &tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(queue = %queue, consumer_tag = %tag, "Consumer started");
        tokio::spawn(
            drain(channel, consumer, queue.to_string(), self.scrubber.clone()).in_current_span(),
        );
        Ok(())
    }

    async fn check(&self) -> Result<(), QueueError> {
        if self.connection.status().connected() {
            Ok(())
        } else {
            Err(QueueError::Disconnected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_payload_prefers_json() {
        assert_eq!(decode_payload(br#"{"id": 7}"#), json!({"id": 7}));
        assert_eq!(decode_payload(b"plain text"), json!("plain text"));
    }

    #[test]
    fn test_broker_errors_map_to_503() {
        let err: ApiError = QueueError::Disconnected.into();
        assert_eq!(err.status().as_u16(), 503);
        assert_eq!(err.public_message(), "Message broker unavailable");
    }
}
