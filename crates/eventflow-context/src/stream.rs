use std::pin::Pin;
use std::task::{Context, Poll};

use eventflow_event::Event;
use futures::Stream;
use tokio::sync::mpsc;

/// Read end of a run's event stream.
///
/// Yields every event a step wrote with
/// [`SharedContext::write_event_to_stream`](crate::SharedContext::write_event_to_stream),
/// in write order. Ends once the run's context is torn down.
#[derive(Debug)]
pub struct EventStream {
  receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventStream {
  pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Event>) -> Self {
    Self { receiver }
  }

  /// Receive the next streamed event.
  pub async fn recv(&mut self) -> Option<Event> {
    self.receiver.recv().await
  }
}

impl Stream for EventStream {
  type Item = Event;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.receiver.poll_recv(cx)
  }
}
