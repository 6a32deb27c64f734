//! Connection and room bookkeeping for the realtime channel.
//!
//! [`RoomTable`] owns the per-connection outbound queues and the room
//! membership sets. Rooms are opaque string tokens; every connection
//! auto-joins a personal room named by its [`ConnectionId`], so emitting
//! to that room targets exactly one client.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tokio::sync::mpsc;

use super::connection_id::ConnectionId;
use super::messages::SocketMessage;

/// Connection senders plus room membership, shared across connection
/// tasks.
///
/// Locks are held only for map access, never across an await point, so
/// plain `std::sync` locks suffice.
#[derive(Debug, Default)]
pub struct RoomTable {
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<SocketMessage>>>,
    rooms: RwLock<HashMap<String, HashSet<ConnectionId>>>,
}

impl RoomTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outbound queue and joins its personal
    /// room.
    pub fn attach(&self, id: ConnectionId, tx: mpsc::Sender<SocketMessage>) {
        write_recover(&self.connections).insert(id, tx);
        self.join(&id.personal_room(), id);
        tracing::debug!(connection = %id, "connection attached");
    }

    /// Removes a connection and purges it from every room.
    pub fn detach(&self, id: ConnectionId) {
        write_recover(&self.connections).remove(&id);
        let mut rooms = write_recover(&self.rooms);
        rooms.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
        tracing::debug!(connection = %id, "connection detached");
    }

    /// Adds a connection to `room`, creating the room on first join.
    pub fn join(&self, room: &str, id: ConnectionId) {
        write_recover(&self.rooms)
            .entry(room.to_string())
            .or_default()
            .insert(id);
    }

    /// Removes a connection from `room`; empty rooms are dropped.
    pub fn leave(&self, room: &str, id: ConnectionId) {
        let mut rooms = write_recover(&self.rooms);
        if let Some(members) = rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Returns `true` if `id` is a member of `room`.
    #[must_use]
    pub fn is_member(&self, room: &str, id: ConnectionId) -> bool {
        read_recover(&self.rooms, |rooms| {
            rooms.get(room).is_some_and(|members| members.contains(&id))
        })
    }

    /// Resolves delivery targets: members of `room` (all connections if
    /// `None`), minus `skip`.
    #[must_use]
    pub fn senders_for(
        &self,
        room: Option<&str>,
        skip: Option<ConnectionId>,
    ) -> Vec<mpsc::Sender<SocketMessage>> {
        let ids: Vec<ConnectionId> = match room {
            Some(room) => read_recover(&self.rooms, |rooms| {
                rooms
                    .get(room)
                    .map(|members| members.iter().copied().collect())
                    .unwrap_or_default()
            }),
            None => read_recover(&self.connections, |conns| conns.keys().copied().collect()),
        };

        read_recover(&self.connections, |conns| {
            ids.iter()
                .filter(|id| Some(**id) != skip)
                .filter_map(|id| conns.get(id).cloned())
                .collect()
        })
    }

    /// Number of attached connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        read_recover(&self.connections, HashMap::len)
    }
}

/// Reads through lock poisoning: a panicked writer cannot leave the maps
/// in a torn state, so the poisoned guard is still usable.
fn read_recover<K, V, R>(lock: &RwLock<HashMap<K, V>>, f: impl FnOnce(&HashMap<K, V>) -> R) -> R {
    match lock.read() {
        Ok(guard) => f(&guard),
        Err(poisoned) => f(&poisoned.into_inner()),
    }
}

fn write_recover<K, V>(lock: &RwLock<HashMap<K, V>>) -> std::sync::RwLockWriteGuard<'_, HashMap<K, V>> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn queue() -> (mpsc::Sender<SocketMessage>, mpsc::Receiver<SocketMessage>) {
        mpsc::channel(8)
    }

    #[test]
    fn attach_joins_personal_room() {
        let table = RoomTable::new();
        let id = ConnectionId::new();
        let (tx, _rx) = queue();
        table.attach(id, tx);

        assert_eq!(table.connection_count(), 1);
        assert!(table.is_member(&id.personal_room(), id));
    }

    #[test]
    fn detach_purges_rooms() {
        let table = RoomTable::new();
        let id = ConnectionId::new();
        let (tx, _rx) = queue();
        table.attach(id, tx);
        table.join("lobby", id);

        table.detach(id);
        assert_eq!(table.connection_count(), 0);
        assert!(!table.is_member("lobby", id));
        assert!(table.senders_for(Some("lobby"), None).is_empty());
    }

    #[test]
    fn senders_for_room_skips_excluded_member() {
        let table = RoomTable::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let (tx_a, _rx_a) = queue();
        let (tx_b, _rx_b) = queue();
        table.attach(a, tx_a);
        table.attach(b, tx_b);
        table.join("lobby", a);
        table.join("lobby", b);

        let targets = table.senders_for(Some("lobby"), Some(a));
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn senders_for_none_targets_all_connections() {
        let table = RoomTable::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let (tx_a, _rx_a) = queue();
        let (tx_b, _rx_b) = queue();
        table.attach(a, tx_a);
        table.attach(b, tx_b);

        assert_eq!(table.senders_for(None, None).len(), 2);
        assert_eq!(table.senders_for(None, Some(b)).len(), 1);
    }

    #[test]
    fn leave_drops_empty_rooms() {
        let table = RoomTable::new();
        let id = ConnectionId::new();
        let (tx, _rx) = queue();
        table.attach(id, tx);
        table.join("lobby", id);
        table.leave("lobby", id);

        assert!(!table.is_member("lobby", id));
        assert!(table.senders_for(Some("lobby"), None).is_empty());
    }

    #[test]
    fn unknown_room_has_no_targets() {
        let table = RoomTable::new();
        assert!(table.senders_for(Some("ghost"), None).is_empty());
    }
}
