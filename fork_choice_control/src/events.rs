use anyhow::Result;
use log::warn;
use parse_display::{Display, FromStr};
use serde::Serialize;
use tokio::sync::broadcast::{self, Receiver, Sender};
use types::phase0::primitives::{Slot, H256};

pub const DEFAULT_MAX_EVENTS: usize = 100;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, FromStr)]
#[display(style = "snake_case")]
pub enum Topic {
    BlockProcessed,
    Head,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Event {
    BlockProcessed(BlockProcessedEvent),
    Head(HeadEvent),
}

impl Event {
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::BlockProcessed(_) => Topic::BlockProcessed,
            Self::Head(_) => Topic::Head,
        }
    }
}

/// Subscribers receive events sent after they subscribed. Sending never blocks.
pub struct EventChannels {
    pub blocks_processed: Sender<Event>,
    pub heads: Sender<Event>,
}

impl Default for EventChannels {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS)
    }
}

impl EventChannels {
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            blocks_processed: broadcast::channel(max_events).0,
            heads: broadcast::channel(max_events).0,
        }
    }

    #[must_use]
    pub fn receiver_for(&self, topic: Topic) -> Receiver<Event> {
        match topic {
            Topic::BlockProcessed => &self.blocks_processed,
            Topic::Head => &self.heads,
        }
        .subscribe()
    }

    pub fn send_block_processed_event(&self, slot: Slot, block_root: H256, verified: bool) {
        if let Err(error) = self.send_block_processed_event_internal(slot, block_root, verified) {
            warn!("unable to send block processed event: {error}");
        }
    }

    pub fn send_head_event(&self, slot: Slot, block_root: H256) {
        if let Err(error) = self.send_head_event_internal(slot, block_root) {
            warn!("unable to send head event: {error}");
        }
    }

    fn send_block_processed_event_internal(
        &self,
        slot: Slot,
        block_root: H256,
        verified: bool,
    ) -> Result<()> {
        if self.blocks_processed.receiver_count() > 0 {
            let event = Event::BlockProcessed(BlockProcessedEvent {
                slot,
                block_root,
                verified,
            });

            self.blocks_processed.send(event)?;
        }

        Ok(())
    }

    fn send_head_event_internal(&self, slot: Slot, block_root: H256) -> Result<()> {
        if self.heads.receiver_count() > 0 {
            let event = Event::Head(HeadEvent { slot, block_root });
            self.heads.send(event)?;
        }

        Ok(())
    }
}

/// `verified` is `false` for blocks whose signatures were not checked.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct BlockProcessedEvent {
    pub slot: Slot,
    pub block_root: H256,
    pub verified: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct HeadEvent {
    pub slot: Slot,
    pub block_root: H256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_subscribers_of_their_topic() -> Result<()> {
        let event_channels = EventChannels::default();
        let mut blocks_processed = event_channels.receiver_for(Topic::BlockProcessed);
        let mut heads = event_channels.receiver_for(Topic::Head);

        event_channels.send_block_processed_event(3, H256::repeat_byte(3), false);

        let event = blocks_processed.try_recv()?;

        assert_eq!(event.topic(), Topic::BlockProcessed);
        assert!(matches!(
            event,
            Event::BlockProcessed(BlockProcessedEvent {
                slot: 3,
                verified: false,
                ..
            }),
        ));
        assert!(heads.try_recv().is_err());

        Ok(())
    }

    #[test]
    fn sending_without_subscribers_does_nothing() {
        let event_channels = EventChannels::new(1);

        event_channels.send_head_event(1, H256::zero());
        event_channels.send_head_event(2, H256::zero());

        let mut heads = event_channels.receiver_for(Topic::Head);

        assert!(heads.try_recv().is_err());
    }

    #[test]
    fn topics_are_parsed_in_snake_case() {
        assert_eq!("block_processed".parse::<Topic>().ok(), Some(Topic::BlockProcessed));
        assert_eq!(Topic::Head.to_string(), "head");
    }

    #[test]
    fn block_processed_event_serializes_flatly() -> Result<()> {
        let event = Event::BlockProcessed(BlockProcessedEvent {
            slot: 1,
            block_root: H256::zero(),
            verified: true,
        });

        let json = serde_json::to_value(&event)?;

        assert_eq!(json["slot"], 1);
        assert_eq!(json["verified"], true);

        Ok(())
    }
}
