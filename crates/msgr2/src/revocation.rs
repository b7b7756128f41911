//! Message revocation for msgr2 connections
//!
//! This module implements the ability to cancel in-flight messages before
//! transmission completes. This is useful for:
//! - Canceling requests that are no longer needed
//! - Implementing timeouts for operations
//! - Cleaning up on connection errors
//!
//! Messages can be revoked at different stages:
//! - **Queued**: Message is waiting to be sent (easy to revoke)
//! - **Sending**: Message is currently being transmitted (may be partially sent)
//! - **Sent**: Message has been fully transmitted (cannot be revoked)

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Unique identifier for a message that can be revoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(u64);

impl MessageId {
    /// Create a new message ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Status of a message in the revocation system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    /// Message is queued and waiting to be sent
    Queued,
    /// Message is currently being transmitted
    Sending,
    /// Message has been fully transmitted
    Sent,
    /// Message was revoked before transmission completed
    Revoked,
}

/// Result of a revocation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationResult {
    /// Message was successfully revoked (was queued or sending)
    Revoked,
    /// Message was already sent (too late to revoke)
    AlreadySent,
    /// Message ID not found (already completed or never existed)
    NotFound,
}

/// Handle for a revocable message
///
/// This handle can be used to check the status of a message or revoke it.
/// When dropped, the handle does NOT automatically revoke the message.
#[derive(Debug)]
pub struct MessageHandle {
    id: MessageId,
    revocation_tx: Option<oneshot::Sender<()>>,
    manager: Arc<Mutex<RevocationManagerState>>,
}

impl MessageHandle {
    /// Get the message ID
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Check if the message has been revoked
    pub async fn is_revoked(&self) -> bool {
        let state = self.manager.lock().await;
        state
            .messages
            .get(&self.id)
            .map(|info| info.status == MessageStatus::Revoked)
            .unwrap_or(false)
    }

    /// Get the current status of the message
    pub async fn status(&self) -> Option<MessageStatus> {
        let state = self.manager.lock().await;
        state.messages.get(&self.id).map(|info| info.status)
    }

    /// Attempt to revoke the message
    ///
    /// Returns:
    /// - `Revoked`: Message was successfully revoked
    /// - `AlreadySent`: Message was already fully transmitted
    /// - `NotFound`: Message ID not found
    pub async fn revoke(mut self) -> RevocationResult {
        let mut state = self.manager.lock().await;

        if let Some(info) = state.messages.get_mut(&self.id) {
            match info.status {
                MessageStatus::Queued | MessageStatus::Sending => {
                    // Mark as revoked
                    info.status = MessageStatus::Revoked;

                    // Signal the sender to stop
                    if let Some(tx) = self.revocation_tx.take() {
                        let _ = tx.send(());
                    }

                    tracing::debug!("Message {:?} revoked", self.id);
                    RevocationResult::Revoked
                }
                MessageStatus::Sent => {
                    tracing::debug!("Message {:?} already sent, cannot revoke", self.id);
                    RevocationResult::AlreadySent
                }
                MessageStatus::Revoked => {
                    tracing::debug!("Message {:?} already revoked", self.id);
                    RevocationResult::Revoked
                }
            }
        } else {
            tracing::debug!("Message {:?} not found", self.id);
            RevocationResult::NotFound
        }
    }

    /// Wait for the message to complete (either sent or revoked)
    ///
    /// Returns the final status of the message.
    pub async fn wait_completion(&self) -> MessageStatus {
        loop {
            if let Some(status) = self.status().await {
                match status {
                    MessageStatus::Sent | MessageStatus::Revoked => return status,
                    _ => {
                        // Still in progress, wait a bit
                        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                    }
                }
            } else {
                // Message not found, assume it completed
                return MessageStatus::Sent;
            }
        }
    }
}

/// Information about a tracked message
#[derive(Debug)]
struct MessageInfo {
    status: MessageStatus,
}

/// Internal state for the revocation manager
#[derive(Debug)]
struct RevocationManagerState {
    /// Next message ID to assign
    next_id: u64,
    /// Map of message ID to message info
    messages: HashMap<MessageId, MessageInfo>,
}

impl RevocationManagerState {
    fn new() -> Self {
        Self {
            next_id: 1,
            messages: HashMap::new(),
        }
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Manager for message revocation
///
/// This tracks all in-flight messages and allows them to be revoked
/// before transmission completes.
///
/// # Example
///
/// ```no_run
/// use msgr2::revocation::RevocationManager;
///
/// # async fn example() -> Result<(), &'static str> {
/// let manager = RevocationManager::new();
///
/// // Register a message for sending
/// let (handle, revocation_rx) = manager.register_message().await;
///
/// // Simulate sending - check for revocation
/// let send_result: Result<(), &str> = tokio::select! {
///     _ = revocation_rx => {
///         // Message was revoked
///         Err("revoked")
///     }
///     _ = async {
///         // Simulate message send
///         tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
///         Ok::<(), &str>(())
///     } => {
///         // Message sent successfully
///         manager.mark_sent(handle.id()).await;
///         Ok(())
///     }
/// };
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RevocationManager {
    state: Arc<Mutex<RevocationManagerState>>,
}

impl RevocationManager {
    /// Create a new revocation manager
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RevocationManagerState::new())),
        }
    }

    /// Register a new message for sending
    ///
    /// Returns:
    /// - A handle that can be used to revoke the message
    /// - A receiver that will be signaled if the message is revoked
    pub async fn register_message(&self) -> (MessageHandle, oneshot::Receiver<()>) {
        let mut state = self.state.lock().await;

        let id = state.allocate_id();
        let (revocation_tx, revocation_rx) = oneshot::channel();

        state.messages.insert(
            id,
            MessageInfo {
                status: MessageStatus::Queued,
            },
        );

        tracing::trace!("Registered message {:?} for revocation tracking", id);

        let handle = MessageHandle {
            id,
            revocation_tx: Some(revocation_tx),
            manager: self.state.clone(),
        };

        (handle, revocation_rx)
    }

    /// Mark a message as currently being sent
    pub async fn mark_sending(&self, id: MessageId) {
        let mut state = self.state.lock().await;
        if let Some(info) = state.messages.get_mut(&id) {
            if info.status == MessageStatus::Queued {
                info.status = MessageStatus::Sending;
                tracing::trace!("Message {:?} marked as sending", id);
            }
        }
    }

    /// Mark a message as fully sent
    pub async fn mark_sent(&self, id: MessageId) {
        let mut state = self.state.lock().await;
        if let Some(info) = state.messages.get_mut(&id) {
            if info.status != MessageStatus::Revoked {
                info.status = MessageStatus::Sent;
                tracing::trace!("Message {:?} marked as sent", id);
            }
        }
    }

    /// Remove a message from tracking (cleanup after completion)
    pub async fn remove_message(&self, id: MessageId) {
        let mut state = self.state.lock().await;
        state.messages.remove(&id);
        tracing::trace!("Message {:?} removed from tracking", id);
    }

    /// Get the status of a message
    pub async fn get_status(&self, id: MessageId) -> Option<MessageStatus> {
        let state = self.state.lock().await;
        state.messages.get(&id).map(|info| info.status)
    }

    /// Get the number of tracked messages
    pub async fn tracked_count(&self) -> usize {
        let state = self.state.lock().await;
        state.messages.len()
    }

    /// Clear all tracked messages (useful for cleanup on connection close)
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.messages.clear();
        tracing::debug!("Cleared all tracked messages");
    }

    /// Get statistics about tracked messages
    pub async fn stats(&self) -> RevocationStats {
        let state = self.state.lock().await;

        let mut queued = 0;
        let mut sending = 0;
        let mut sent = 0;
        let mut revoked = 0;

        for info in state.messages.values() {
            match info.status {
                MessageStatus::Queued => queued += 1,
                MessageStatus::Sending => sending += 1,
                MessageStatus::Sent => sent += 1,
                MessageStatus::Revoked => revoked += 1,
            }
        }

        RevocationStats {
            total: state.messages.len(),
            queued,
            sending,
            sent,
            revoked,
        }
    }
}

impl Default for RevocationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about message revocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationStats {
    /// Total number of tracked messages
    pub total: usize,
    /// Number of queued messages
    pub queued: usize,
    /// Number of messages currently being sent
    pub sending: usize,
    /// Number of sent messages
    pub sent: usize,
    /// Number of revoked messages
    pub revoked: usize,
}
