use async_trait::async_trait;
use skyway_core::events::EventPublisher;
use skyway_core::{BookingError, CoreResult};
use skyway_shared::models::events::DomainEvent;
use tracing::info;

/// Writes every event to the log. Used when no broker is configured.
#[derive(Debug, Clone, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &DomainEvent) -> CoreResult<()> {
        let payload = event
            .payload()
            .map_err(|e| BookingError::Storage(format!("event encoding failed: {}", e)))?;
        info!(topic = event.topic(), key = %event.key(), %payload, "Domain event");
        Ok(())
    }
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;

#[cfg(feature = "kafka")]
mod kafka {
    use super::*;
    use rdkafka::config::ClientConfig;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use rdkafka::util::Timeout;
    use std::time::Duration;
    use tracing::error;

    #[derive(Clone)]
    pub struct KafkaPublisher {
        producer: FutureProducer,
    }

    impl KafkaPublisher {
        pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .create()?;

            Ok(Self { producer })
        }
    }

    #[async_trait]
    impl EventPublisher for KafkaPublisher {
        async fn publish(&self, event: &DomainEvent) -> CoreResult<()> {
            let topic = event.topic();
            let key = event.key();
            let payload = event
                .payload()
                .map_err(|e| BookingError::Storage(format!("event encoding failed: {}", e)))?;
            let record = FutureRecord::to(topic).key(key.as_str()).payload(payload.as_str());

            match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
                Ok(delivery) => {
                    info!(
                        "Sent message to {}/{}: partition {} offset {}",
                        topic, key, delivery.partition, delivery.offset
                    );
                    Ok(())
                }
                Err((e, _msg)) => {
                    error!("Failed to send message to {}: {}", topic, e);
                    Err(BookingError::Storage(e.to_string()))
                }
            }
        }
    }
}
