//! Structs to collect and send the events that happen in the tracker.
//!
//! The core only emits events; counter storage is a collaborator outside of
//! this crate. When statistics are enabled an [`EventSender`] is attached to
//! the tracker and the delivery layer notifies it on every handled
//! connection, announce and scrape, per protocol and per IP family.
use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;

const CHANNEL_BUFFER_SIZE: usize = 65_535;

/// An event that happened in the tracker.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event {
    // IP version 4
    Tcp4Announce,
    Tcp4Scrape,
    Udp4Connect,
    Udp4Announce,
    Udp4Scrape,

    // IP version 6
    Tcp6Announce,
    Tcp6Scrape,
    Udp6Connect,
    Udp6Announce,
    Udp6Scrape,
}

/// A trait to allow sending statistic events.
#[async_trait]
pub trait EventSender: Sync + Send {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>>;
}

/// An [`EventSender`] backed by a bounded channel.
pub struct Sender {
    sender: mpsc::Sender<Event>,
}

#[async_trait]
impl EventSender for Sender {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>> {
        Some(self.sender.send(event).await)
    }
}

/// It sets up the event plumbing when statistics are enabled.
///
/// The returned sender is attached to the tracker; a background task drains
/// the channel. External consumers can replace the drain with their own
/// counter storage.
#[must_use]
pub fn setup(tracker_usage_statistics: bool) -> Option<Box<dyn EventSender>> {
    if !tracker_usage_statistics {
        return None;
    }

    let (sender, mut receiver) = mpsc::channel::<Event>(CHANNEL_BUFFER_SIZE);

    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            debug!(target: "statistics", "event: {event:?}");
        }
    });

    Some(Box::new(Sender { sender }))
}
