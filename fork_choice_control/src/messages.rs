use std::sync::Arc;

use log::debug;
use types::phase0::containers::SignedBeaconBlock;

use crate::unbounded_sink::UnboundedSink;

#[derive(Debug)]
pub enum P2pMessage {
    PublishBlock(Arc<SignedBeaconBlock>),
}

impl P2pMessage {
    /// Returns `false` if the receiving end is gone.
    pub(crate) fn send(self, tx: &impl UnboundedSink<Self>) -> bool {
        match tx.unbounded_send(self) {
            Ok(()) => true,
            Err(message) => {
                debug!("send to p2p failed because the receiver was dropped: {message:?}");
                false
            }
        }
    }
}
