// Live connection set owned by the hub task.

use crate::use_cases::types::{ConnId, Connection};
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;

/// Why a frame could not be handed to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    // Outbound queue is full: the client is not draining fast enough.
    Backlogged,
    // Writer task is gone: the socket is dead.
    Closed,
}

impl<T> From<TrySendError<T>> for DeliveryError {
    fn from(e: TrySendError<T>) -> Self {
        match e {
            TrySendError::Full(_) => DeliveryError::Backlogged,
            TrySendError::Closed(_) => DeliveryError::Closed,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn get(&self, conn_id: ConnId) -> Option<&Connection> {
        self.connections.get(&conn_id)
    }

    /// Makes the connection eligible for fan-out. Ids are unique by construction.
    pub fn add(&mut self, connection: Connection) {
        self.connections.insert(connection.conn_id, connection);
    }

    /// Removes a connection. Dropping the returned value closes its outbound queue,
    /// which tells the writer task to close the socket. Absent ids are a no-op.
    pub fn remove(&mut self, conn_id: ConnId) -> Option<Connection> {
        self.connections.remove(&conn_id)
    }

    /// Applies `f` to every connection not in `exclude`. Connections for which `f`
    /// fails are removed and returned; iteration always covers the whole set.
    pub fn for_each_except<F>(&mut self, exclude: &[ConnId], mut f: F) -> Vec<Connection>
    where
        F: FnMut(&Connection) -> Result<(), DeliveryError>,
    {
        let mut failed = Vec::new();
        for (conn_id, connection) in &self.connections {
            if exclude.contains(conn_id) {
                continue;
            }
            if f(connection).is_err() {
                failed.push(*conn_id);
            }
        }

        failed
            .into_iter()
            .filter_map(|conn_id| self.connections.remove(&conn_id))
            .collect()
    }

    /// Enqueues one shared frame on every connection not in `exclude` without
    /// waiting on any of them.
    pub fn broadcast_except(&mut self, frame: &Utf8Bytes, exclude: &[ConnId]) -> Vec<Connection> {
        self.for_each_except(exclude, |connection| {
            connection
                .outbound
                .try_send(frame.clone())
                .map_err(DeliveryError::from)
        })
    }
}
