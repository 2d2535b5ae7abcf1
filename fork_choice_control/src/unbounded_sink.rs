use futures::{
    channel::mpsc::{TrySendError, UnboundedSender},
    sink::Drain,
};

/// A channel sender that never blocks. Returns the message back if it could not be sent.
pub trait UnboundedSink<T>: Send + Sync + 'static {
    fn unbounded_send(&self, message: T) -> Result<(), T>;
}

impl<T, S: UnboundedSink<T>> UnboundedSink<T> for Option<S> {
    fn unbounded_send(&self, message: T) -> Result<(), T> {
        match self {
            Some(sink) => sink.unbounded_send(message),
            None => Ok(()),
        }
    }
}

impl<T: Send + 'static> UnboundedSink<T> for UnboundedSender<T> {
    fn unbounded_send(&self, message: T) -> Result<(), T> {
        self.unbounded_send(message)
            .map_err(TrySendError::into_inner)
    }
}

impl<T: Send + Sync + 'static> UnboundedSink<T> for Drain<T> {
    fn unbounded_send(&self, _message: T) -> Result<(), T> {
        Ok(())
    }
}
