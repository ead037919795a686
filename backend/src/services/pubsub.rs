//! Publish/subscribe broker feeding GraphQL subscriptions.
//!
//! The broker is constructed once at startup and handed to the schema and to
//! every operation context. Each subscriber gets its own receiver; slow
//! subscribers that fall behind skip the events they missed.

use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{trace, warn};

use crate::database::models::{Role, User};

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    UserCreated(User),
    RoleChanged(Role),
}

#[derive(Clone)]
pub struct Broker {
    sender: broadcast::Sender<Event>,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Broker {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers the event reached.
    pub fn publish(&self, event: Event) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("Event published without subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn users_created(&self) -> impl Stream<Item = User> + Send + 'static {
        self.events().filter_map(|event| match event {
            Event::UserCreated(user) => Some(user),
            _ => None,
        })
    }

    pub fn roles_changed(&self) -> impl Stream<Item = Role> + Send + 'static {
        self.events().filter_map(|event| match event {
            Event::RoleChanged(role) => Some(role),
            _ => None,
        })
    }

    fn events(&self) -> impl Stream<Item = Event> + Send + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|received| match received {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(error = %err, "Subscriber lagged behind the broker");
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{RoleDraft, UserDraft};

    fn role() -> Role {
        Role::stamped(RoleDraft {
            name: "admin".to_string(),
            node_id: "node-1".to_string(),
            permissions: Vec::new(),
        })
    }

    fn user() -> User {
        User::stamped(UserDraft {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "hash".to_string(),
            role_id: None,
        })
    }

    #[test]
    fn publishing_without_subscribers_is_not_an_error() {
        let broker = Broker::default();
        assert_eq!(broker.publish(Event::RoleChanged(role())), 0);
    }

    #[tokio::test]
    async fn streams_only_yield_their_event_kind() {
        let broker = Broker::default();
        let roles = broker.roles_changed();
        tokio::pin!(roles);

        let role = role();
        assert_eq!(broker.publish(Event::UserCreated(user())), 1);
        assert_eq!(broker.publish(Event::RoleChanged(role.clone())), 1);

        assert_eq!(roles.next().await, Some(role));
    }

    #[tokio::test]
    async fn separate_brokers_do_not_share_events() {
        let first = Broker::default();
        let second = Broker::default();
        let _listener = second.subscribe();

        assert_eq!(first.publish(Event::UserCreated(user())), 0);
        assert_eq!(second.publish(Event::UserCreated(user())), 1);
    }
}
