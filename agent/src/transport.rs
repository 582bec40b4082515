use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::identity::AgentAddress;
use crate::messages::OutboundMessage;
use crate::utils::errors::TransportError;

/// Messaging substrate used for direct replies.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        destination: &AgentAddress,
        message: OutboundMessage,
    ) -> Result<(), TransportError>;
}

type Slots = RwLock<HashMap<AgentAddress, (u64, mpsc::UnboundedSender<OutboundMessage>)>>;

/// In-process substrate: one unbounded mailbox per registered address.
#[derive(Clone, Default)]
pub struct MailboxTransport {
    slots: Arc<Slots>,
    next_id: Arc<AtomicU64>,
}

/// Receiving end of a [`MailboxTransport`] registration.
///
/// Dropping it unregisters the address, unless a newer registration has
/// taken the slot over in the meantime.
pub struct Mailbox {
    address: AgentAddress,
    id: u64,
    slots: Arc<Slots>,
    rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Mailbox {
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        self.rx.recv().await
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        let mut slots = self.slots.write();
        if matches!(slots.get(&self.address), Some((id, _)) if *id == self.id) {
            slots.remove(&self.address);
        }
    }
}

impl MailboxTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a mailbox for `address`, replacing any previous one.
    pub fn register(&self, address: AgentAddress) -> Mailbox {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.write().insert(address.clone(), (id, tx));
        Mailbox {
            address,
            id,
            slots: Arc::clone(&self.slots),
            rx,
        }
    }
}

#[async_trait]
impl Transport for MailboxTransport {
    async fn send(
        &self,
        destination: &AgentAddress,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        let mailbox = self
            .slots
            .read()
            .get(destination)
            .map(|(_, tx)| tx.clone())
            .ok_or_else(|| TransportError::UnknownRecipient(destination.clone()))?;
        mailbox
            .send(message)
            .map_err(|_| TransportError::MailboxClosed(destination.clone()))
    }
}

/// Reply channel private to one inbound message: accepts messages for its
/// sender only and hands them to a single receiver.
pub struct ReplySlot {
    sender: AgentAddress,
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ReplySlot {
    pub fn open(sender: AgentAddress) -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender, tx }, rx)
    }
}

#[async_trait]
impl Transport for ReplySlot {
    async fn send(
        &self,
        destination: &AgentAddress,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        if destination != &self.sender {
            return Err(TransportError::UnknownRecipient(destination.clone()));
        }
        self.tx
            .send(message)
            .map_err(|_| TransportError::MailboxClosed(destination.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::SimulationResult;

    fn message(id: &str) -> OutboundMessage {
        SimulationResult::failed(id, "nope").into()
    }

    #[tokio::test]
    async fn test_delivers_to_registered_mailbox() {
        let transport = MailboxTransport::new();
        let address = AgentAddress::from("agent1qpeer");
        let mut mailbox = transport.register(address.clone());

        transport.send(&address, message("r1")).await.unwrap();
        assert_eq!(mailbox.recv().await, Some(message("r1")));
    }

    #[tokio::test]
    async fn test_dropped_mailbox_is_unregistered() {
        let transport = MailboxTransport::new();
        let address = AgentAddress::from("agent1qpeer");

        let err = transport.send(&address, message("r1")).await.unwrap_err();
        assert!(matches!(err, TransportError::UnknownRecipient(_)));

        drop(transport.register(address.clone()));
        let err = transport.send(&address, message("r1")).await.unwrap_err();
        assert!(matches!(err, TransportError::UnknownRecipient(_)));
    }

    #[tokio::test]
    async fn test_stale_mailbox_drop_keeps_newer_registration() {
        let transport = MailboxTransport::new();
        let address = AgentAddress::from("agent1qpeer");
        let stale = transport.register(address.clone());
        let mut current = transport.register(address.clone());

        drop(stale);
        transport.send(&address, message("r2")).await.unwrap();
        assert_eq!(current.recv().await, Some(message("r2")));
    }

    #[tokio::test]
    async fn test_reply_slot_only_accepts_its_sender() {
        let sender = AgentAddress::from("agent1qowner");
        let (slot, mut rx) = ReplySlot::open(sender.clone());

        slot.send(&sender, message("mine")).await.unwrap();
        let err = slot
            .send(&AgentAddress::from("agent1qother"), message("theirs"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownRecipient(_)));
        assert_eq!(rx.try_recv().ok(), Some(message("mine")));
        assert!(rx.try_recv().is_err());

        drop(rx);
        let err = slot.send(&sender, message("late")).await.unwrap_err();
        assert!(matches!(err, TransportError::MailboxClosed(_)));
    }
}
