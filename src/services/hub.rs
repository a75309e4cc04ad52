//! Realtime fan-out to connected websocket clients.
//!
//! A single task owns every client handle. Connections talk to it through
//! [`Hub`], a cheap cloneable sender. Each client has a bounded queue; a
//! client whose queue is full or closed is dropped from the hub.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::events::NotificationEvent;

const COMMAND_BUFFER: usize = 1024;

enum Command {
    Register {
        id: Uuid,
        sender: mpsc::Sender<String>,
    },
    Unregister {
        id: Uuid,
    },
    SetLocation {
        id: Uuid,
        location: String,
    },
    Broadcast {
        event: NotificationEvent,
        location: Option<String>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

struct Client {
    sender: mpsc::Sender<String>,
    location: Option<String>,
}

#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<Command>,
    client_buffer: usize,
}

impl Hub {
    /// Starts the hub task. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(client_buffer: usize) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run(receiver));
        Self {
            commands,
            client_buffer: client_buffer.max(1),
        }
    }

    /// Adds a client and returns its id with the queue of outgoing frames.
    pub async fn register(&self) -> Option<(Uuid, mpsc::Receiver<String>)> {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(self.client_buffer);
        self.commands
            .send(Command::Register { id, sender })
            .await
            .ok()?;
        Some((id, receiver))
    }

    pub fn unregister(&self, id: Uuid) {
        self.submit(Command::Unregister { id });
    }

    pub fn set_location(&self, id: Uuid, location: String) {
        self.submit(Command::SetLocation { id, location });
    }

    /// Sends to every client.
    pub fn publish(&self, event: NotificationEvent) {
        self.submit(Command::Broadcast {
            event,
            location: None,
        });
    }

    /// Sends only to clients whose current location equals `location`.
    pub fn publish_to(&self, location: &str, event: NotificationEvent) {
        self.submit(Command::Broadcast {
            event,
            location: Some(location.to_string()),
        });
    }

    pub async fn client_count(&self) -> usize {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Count { reply }).await.is_err() {
            return 0;
        }
        response.await.unwrap_or(0)
    }

    fn submit(&self, command: Command) {
        if let Err(e) = self.commands.try_send(command) {
            warn!("Realtime hub is not accepting commands: {e}");
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_clients(count: usize) {
    metrics::gauge!("ws_clients").set(count as f64);
}

async fn run(mut commands: mpsc::Receiver<Command>) {
    let mut clients: HashMap<Uuid, Client> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Register { id, sender } => {
                clients.insert(
                    id,
                    Client {
                        sender,
                        location: None,
                    },
                );
                record_clients(clients.len());
            }
            Command::Unregister { id } => {
                clients.remove(&id);
                record_clients(clients.len());
            }
            Command::SetLocation { id, location } => {
                if let Some(client) = clients.get_mut(&id) {
                    client.location = Some(location);
                }
            }
            Command::Broadcast { event, location } => {
                let frame = match serde_json::to_string(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Failed to encode realtime event: {e}");
                        continue;
                    }
                };

                clients.retain(|id, client| {
                    if location.is_some() && client.location != location {
                        return true;
                    }
                    match client.sender.try_send(frame.clone()) {
                        Ok(()) => true,
                        Err(e) => {
                            debug!(client = %id, "Dropping realtime client: {e}");
                            false
                        }
                    }
                });
                record_clients(clients.len());
            }
            Command::Count { reply } => {
                let _ = reply.send(clients.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_client() {
        let hub = Hub::spawn(4);
        let (_, mut first) = hub.register().await.unwrap();
        let (_, mut second) = hub.register().await.unwrap();

        hub.publish(NotificationEvent::data_changed("categories"));

        let frame = first.recv().await.unwrap();
        assert!(frame.contains("categories"));
        assert_eq!(second.recv().await.unwrap(), frame);
    }

    #[tokio::test]
    async fn targeted_broadcast_respects_location() {
        let hub = Hub::spawn(4);
        let (here, mut at_here) = hub.register().await.unwrap();
        let (_, mut elsewhere) = hub.register().await.unwrap();
        hub.set_location(here, "/equipments".to_string());

        hub.publish_to("/equipments", NotificationEvent::data_changed("equipments"));
        hub.publish(NotificationEvent::data_changed("users"));

        assert!(at_here.recv().await.unwrap().contains("equipments"));
        assert!(at_here.recv().await.unwrap().contains("users"));
        assert!(elsewhere.recv().await.unwrap().contains("users"));
    }

    #[tokio::test]
    async fn slow_and_closed_clients_are_dropped() {
        let hub = Hub::spawn(1);
        let (_, _slow) = hub.register().await.unwrap();
        let (_, closed) = hub.register().await.unwrap();
        drop(closed);

        hub.publish(NotificationEvent::data_changed("a"));
        assert_eq!(hub.client_count().await, 1);

        hub.publish(NotificationEvent::data_changed("b"));
        assert_eq!(hub.client_count().await, 0);
    }

    #[tokio::test]
    async fn unregister_removes_client() {
        let hub = Hub::spawn(4);
        let (id, _rx) = hub.register().await.unwrap();
        assert_eq!(hub.client_count().await, 1);

        hub.unregister(id);
        assert_eq!(hub.client_count().await, 0);
    }
}
