use anyhow::Result;
use eyecare_core::{
    LowStockAlert, STOCK_ALERTS_CHANNEL, STOCK_MOVEMENTS_CHANNEL, StockMovementRecorded,
};
use redis::aio::PubSub;
use redis::{AsyncCommands, Client};
use serde::Serialize;

/// Publishes ledger events; subscribers treat them as notifications only and
/// re-read state from the database.
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn publish_movement(&self, event: &StockMovementRecorded) -> Result<()> {
        self.publish_json(STOCK_MOVEMENTS_CHANNEL, event).await
    }

    pub async fn publish_low_stock(&self, alert: &LowStockAlert) -> Result<()> {
        self.publish_json(STOCK_ALERTS_CHANNEL, alert).await
    }

    pub async fn subscribe(&self, channel: &str) -> Result<PubSub> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        Ok(pubsub)
    }

    async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let _: i64 = connection.publish(channel, serialized).await?;
        Ok(())
    }
}
