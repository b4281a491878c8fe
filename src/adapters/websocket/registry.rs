//! Connection registry for channel-based message routing.
//!
//! The registry is the single source of truth for which connections are
//! live, which user each one asserted, and which channels each one joined.
//!
//! # Architecture
//!
//! ```text
//! connections                         channels (index)
//! ├── conn-a  user=1  {10, 11}        10 → {conn-a, conn-b}
//! ├── conn-b  user=2  {10}            11 → {conn-a}
//! └── conn-c  pending {}
//! ```
//!
//! Both maps live behind one lock so a join can never be observed half
//! applied by a concurrent [`ConnectionRegistry::subscribers_of`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    ChannelId, ConnectionId, ConnectionState, InvalidTransition, StateMachine, Timestamp, UserId,
};
use crate::ports::ConnectionSink;

/// Errors from registry operations.
///
/// None of these are user-facing; they indicate a handle that raced its
/// own close or a programming error in the transport adapter.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    #[error("connection {0} is not registered")]
    NotRegistered(ConnectionId),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// A transport session as handed to the registry on accept.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sink: Arc<dyn ConnectionSink>,
}

impl ConnectionHandle {
    /// Wrap a sink under a freshly generated id.
    pub fn new(sink: Arc<dyn ConnectionSink>) -> Self {
        Self::with_id(ConnectionId::new(), sink)
    }

    pub fn with_id(id: ConnectionId, sink: Arc<dyn ConnectionSink>) -> Self {
        Self { id, sink }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn sink(&self) -> &Arc<dyn ConnectionSink> {
        &self.sink
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// One subscriber of a channel at snapshot time.
#[derive(Clone)]
pub struct Subscriber {
    pub connection_id: ConnectionId,
    pub user_id: Option<UserId>,
    pub sink: Arc<dyn ConnectionSink>,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("connection_id", &self.connection_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Owned copy of a channel's subscribers, taken under the registry lock.
///
/// Later registry mutations are not reflected. The snapshot can be iterated
/// any number of times.
#[derive(Debug, Clone)]
pub struct SubscriberSnapshot {
    channel: ChannelId,
    subscribers: Vec<Subscriber>,
}

impl SubscriberSnapshot {
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Subscriber> {
        self.subscribers.iter()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.subscribers
            .iter()
            .any(|s| s.connection_id == *connection_id)
    }

    /// Connection ids in the snapshot, in no particular order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.subscribers.iter().map(|s| s.connection_id).collect()
    }
}

impl<'a> IntoIterator for &'a SubscriberSnapshot {
    type Item = &'a Subscriber;
    type IntoIter = std::slice::Iter<'a, Subscriber>;

    fn into_iter(self) -> Self::IntoIter {
        self.subscribers.iter()
    }
}

impl IntoIterator for SubscriberSnapshot {
    type Item = Subscriber;
    type IntoIter = std::vec::IntoIter<Subscriber>;

    fn into_iter(self) -> Self::IntoIter {
        self.subscribers.into_iter()
    }
}

/// What was torn down by [`ConnectionRegistry::unregister`].
#[derive(Debug, Clone)]
pub struct RemovedConnection {
    pub connection_id: ConnectionId,
    pub user_id: Option<UserId>,
    pub channels: Vec<ChannelId>,
    pub state: ConnectionState,
    pub connected_at: Timestamp,
}

struct ConnectionEntry {
    sink: Arc<dyn ConnectionSink>,
    user_id: Option<UserId>,
    state: ConnectionState,
    channels: HashSet<ChannelId>,
    connected_at: Timestamp,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// Reverse index; a channel key exists only while it has subscribers.
    channels: HashMap<ChannelId, HashSet<ConnectionId>>,
}

impl RegistryState {
    fn entry_mut(&mut self, id: &ConnectionId) -> Result<&mut ConnectionEntry, RegistryError> {
        self.connections
            .get_mut(id)
            .ok_or(RegistryError::NotRegistered(*id))
    }

    fn unindex(&mut self, channel: &ChannelId, id: &ConnectionId) {
        if let Some(members) = self.channels.get_mut(channel) {
            members.remove(id);
            if members.is_empty() {
                self.channels.remove(channel);
            }
        }
    }
}

/// Registry of live connections and their channel subscriptions.
///
/// # Thread Safety
///
/// All state sits behind a single `RwLock`. Mutations take the write lock;
/// `subscribers_of` holds the read lock only while cloning the snapshot, so
/// writing to recipients never happens under the lock.
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Add a new connection with no identity and no subscriptions.
    pub async fn register(&self, handle: ConnectionHandle) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        if state.connections.contains_key(&handle.id) {
            return Err(RegistryError::AlreadyRegistered(handle.id));
        }

        state.connections.insert(
            handle.id,
            ConnectionEntry {
                sink: handle.sink,
                user_id: None,
                state: ConnectionState::Pending,
                channels: HashSet::new(),
                connected_at: Timestamp::now(),
            },
        );
        tracing::debug!(connection_id = %handle.id, "connection registered");
        Ok(())
    }

    /// Record the asserted user for a connection, replacing any earlier one.
    ///
    /// Returns the previous identity, if any.
    pub async fn identify(
        &self,
        id: &ConnectionId,
        user_id: UserId,
    ) -> Result<Option<UserId>, RegistryError> {
        let mut state = self.state.write().await;
        let entry = state.entry_mut(id)?;
        entry.state = entry.state.transition_to(ConnectionState::Identified)?;
        let previous = entry.user_id.replace(user_id);

        tracing::debug!(connection_id = %id, user_id = %user_id, "connection identified");
        Ok(previous)
    }

    /// Subscribe a connection to a channel.
    ///
    /// Returns `false` if it was already subscribed.
    pub async fn join(&self, id: &ConnectionId, channel: ChannelId) -> Result<bool, RegistryError> {
        let mut state = self.state.write().await;
        let added = state.entry_mut(id)?.channels.insert(channel);
        if added {
            state.channels.entry(channel).or_default().insert(*id);
            tracing::debug!(connection_id = %id, channel_id = %channel, "joined channel");
        }
        Ok(added)
    }

    /// Unsubscribe a connection from a channel.
    ///
    /// Returns `false` if it was not subscribed.
    pub async fn leave(&self, id: &ConnectionId, channel: ChannelId) -> Result<bool, RegistryError> {
        let mut state = self.state.write().await;
        let removed = state.entry_mut(id)?.channels.remove(&channel);
        if removed {
            state.unindex(&channel, id);
            tracing::debug!(connection_id = %id, channel_id = %channel, "left channel");
        }
        Ok(removed)
    }

    /// Remove a connection and every one of its subscriptions.
    ///
    /// Unknown ids are a no-op returning `None`; close notifications may race.
    pub async fn unregister(&self, id: &ConnectionId) -> Option<RemovedConnection> {
        let mut state = self.state.write().await;
        let entry = state.connections.remove(id)?;

        for channel in &entry.channels {
            state.unindex(channel, id);
        }
        drop(state);

        let removed = RemovedConnection {
            connection_id: *id,
            user_id: entry.user_id,
            channels: entry.channels.into_iter().collect(),
            state: entry
                .state
                .transition_to(ConnectionState::Destroyed)
                .unwrap_or(ConnectionState::Destroyed),
            connected_at: entry.connected_at,
        };
        tracing::debug!(
            connection_id = %id,
            channels = removed.channels.len(),
            connected_secs = removed.connected_at.elapsed_secs(),
            "connection unregistered"
        );
        Some(removed)
    }

    /// Snapshot of every connection currently subscribed to `channel`.
    pub async fn subscribers_of(&self, channel: &ChannelId) -> SubscriberSnapshot {
        let state = self.state.read().await;
        let subscribers = state
            .channels
            .get(channel)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|id| {
                        state.connections.get(id).map(|entry| Subscriber {
                            connection_id: *id,
                            user_id: entry.user_id,
                            sink: Arc::clone(&entry.sink),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        SubscriberSnapshot {
            channel: *channel,
            subscribers,
        }
    }

    /// Lifecycle state of a connection; unknown ids report `Destroyed`.
    pub async fn state_of(&self, id: &ConnectionId) -> ConnectionState {
        self.state
            .read()
            .await
            .connections
            .get(id)
            .map(|e| e.state)
            .unwrap_or(ConnectionState::Destroyed)
    }

    /// Asserted user of a live connection.
    pub async fn user_of(&self, id: &ConnectionId) -> Option<UserId> {
        self.state
            .read()
            .await
            .connections
            .get(id)
            .and_then(|e| e.user_id)
    }

    /// Channels a live connection is subscribed to, sorted.
    pub async fn channels_of(&self, id: &ConnectionId) -> Vec<ChannelId> {
        let state = self.state.read().await;
        let mut channels: Vec<ChannelId> = state
            .connections
            .get(id)
            .map(|e| e.channels.iter().copied().collect())
            .unwrap_or_default();
        channels.sort();
        channels
    }

    pub async fn is_registered(&self, id: &ConnectionId) -> bool {
        self.state.read().await.connections.contains_key(id)
    }

    /// Number of subscribers of a channel (0 if nobody joined it).
    pub async fn subscriber_count(&self, channel: &ChannelId) -> usize {
        self.state
            .read()
            .await
            .channels
            .get(channel)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// All channels with at least one subscriber (for monitoring/debugging).
    pub async fn active_channels(&self) -> Vec<ChannelId> {
        self.state.read().await.channels.keys().copied().collect()
    }

    /// Total count of live connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Number of channels with at least one subscriber.
    pub async fn channel_count(&self) -> usize {
        self.state.read().await.channels.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
