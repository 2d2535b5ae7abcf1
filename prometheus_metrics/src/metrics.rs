use anyhow::Result;
use prometheus::{histogram_opts, Histogram, IntCounter, IntGauge, Registry};
use types::phase0::primitives::Slot;

#[derive(Debug)]
pub struct Metrics {
    // Block receiver
    pub processed_blocks: IntCounter,
    pub processed_blocks_no_pubsub: IntCounter,
    pub processed_blocks_no_pubsub_no_fork_choice: IntCounter,
    pub processed_blocks_no_verify: IntCounter,
    pub competing_blocks: IntCounter,
    pub block_processing_times: Histogram,

    // Slots
    beacon_slot: IntGauge,
    beacon_head_slot: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Block receiver
            processed_blocks: IntCounter::new(
                "PROCESSED_BLOCKS",
                "Number of blocks received, broadcast and processed with fork choice",
            )?,

            processed_blocks_no_pubsub: IntCounter::new(
                "PROCESSED_BLOCKS_NO_PUBSUB",
                "Number of blocks processed with fork choice",
            )?,

            processed_blocks_no_pubsub_no_fork_choice: IntCounter::new(
                "PROCESSED_BLOCKS_NO_PUBSUB_NO_FORK_CHOICE",
                "Number of blocks processed without fork choice",
            )?,

            processed_blocks_no_verify: IntCounter::new(
                "PROCESSED_BLOCKS_NO_VERIFY",
                "Number of blocks processed without signature verification",
            )?,

            competing_blocks: IntCounter::new(
                "COMPETING_BLOCKS",
                "Number of times fork choice picked a head other than the processed block",
            )?,

            block_processing_times: Histogram::with_opts(histogram_opts!(
                "BLOCK_PROCESSING_TIMES",
                "Time spent receiving a block",
            ))?,

            // Slots
            beacon_slot: IntGauge::new("BEACON_SLOT", "Slot of the latest processed block")?,
            beacon_head_slot: IntGauge::new("BEACON_HEAD_SLOT", "Slot of the chain head")?,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.processed_blocks.clone()))?;
        registry.register(Box::new(self.processed_blocks_no_pubsub.clone()))?;
        registry.register(Box::new(self.processed_blocks_no_pubsub_no_fork_choice.clone()))?;
        registry.register(Box::new(self.processed_blocks_no_verify.clone()))?;
        registry.register(Box::new(self.competing_blocks.clone()))?;
        registry.register(Box::new(self.block_processing_times.clone()))?;
        registry.register(Box::new(self.beacon_slot.clone()))?;
        registry.register(Box::new(self.beacon_head_slot.clone()))?;

        Ok(())
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        self.register(prometheus::default_registry())
    }

    pub fn set_beacon_slot(&self, slot: Slot) {
        self.beacon_slot.set(slot.try_into().unwrap_or(i64::MAX))
    }

    pub fn set_beacon_head_slot(&self, slot: Slot) {
        self.beacon_head_slot.set(slot.try_into().unwrap_or(i64::MAX))
    }

    #[must_use]
    pub fn beacon_slot(&self) -> i64 {
        self.beacon_slot.get()
    }

    #[must_use]
    pub fn beacon_head_slot(&self) -> i64 {
        self.beacon_head_slot.get()
    }
}
