use crate::{
    client::BusHandle,
    config::BusConfig,
    dispatcher::{DeliverySink, Dispatcher},
    error::BusError,
    message::Message,
    registry::SubscriptionRegistry,
};
use log::{debug, info, trace, warn};
use mqtt_topic::{Topic, TopicFilter};
use std::{
    collections::HashMap,
    sync::{atomic::AtomicU64, Arc},
};
use tokio::{
    sync::{
        mpsc::{self, Receiver, Sender},
        oneshot,
    },
    task::JoinHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WillDisconnectLogic {
    Send,
    DoNotSend,
}

/// Unique identifier for a connection
pub type ConnectionId = u64;

/// Client ID
pub type ClientId = String;

/// Commands processed by the [`Bus`] task, in the order they were sent.
#[derive(Debug)]
pub enum BusMessage {
    Connect(ConnectionId, ClientId, Option<Message>, DeliverySink),
    Disconnect(ConnectionId, ClientId, WillDisconnectLogic),
    Subscribe(ConnectionId, ClientId, TopicFilter),
    Unsubscribe(ConnectionId, ClientId, TopicFilter),
    Publish(Message),
    MatchingSubscribers(Topic, oneshot::Sender<Vec<ClientId>>),
    Shutdown,
}

#[derive(Debug)]
struct Session {
    connection_id: ConnectionId,
    will: Option<Message>,
}

/// Everything owned by the running bus task.
struct BusState {
    config: BusConfig,
    sessions: HashMap<ClientId, Session>,
    subscriptions: SubscriptionRegistry<ClientId>,
    dispatcher: Dispatcher<ClientId>,
}

/// An in-process message bus.
///
/// The bus is a single task which owns every session and subscription and
/// processes [`BusMessage`]s one at a time. Callers talk to it through a
/// [`BusHandle`], and it stops once every handle is dropped or a shutdown is
/// requested. Stopping drops every delivery sink, which ends all subscriber
/// streams.
pub struct Bus {
    sender: Sender<BusMessage>,
    receiver: Receiver<BusMessage>,
    connection_counter: Arc<AtomicU64>,
    state: BusState,
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new()
    }
}

impl Bus {
    /// Construct a new Bus with the default configuration.
    pub fn new() -> Bus {
        Bus::build(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Result<Bus, BusError> {
        config.validate()?;

        Ok(Bus::build(config))
    }

    fn build(config: BusConfig) -> Bus {
        let (sender, receiver) = mpsc::channel(config.command_channel_capacity);

        Bus {
            sender,
            receiver,
            connection_counter: Arc::new(AtomicU64::new(0)),
            state: BusState {
                config,
                sessions: HashMap::new(),
                subscriptions: SubscriptionRegistry::new(),
                dispatcher: Dispatcher::new(),
            },
        }
    }

    pub fn sender(&self) -> Sender<BusMessage> {
        self.sender.clone()
    }

    pub fn handle(&self) -> BusHandle {
        BusHandle::new(
            self.sender.clone(),
            self.connection_counter.clone(),
            self.state.config.operation_timeout,
        )
    }

    /// Runs the bus on a new tokio task.
    pub fn spawn(self) -> (BusHandle, JoinHandle<()>) {
        let handle = self.handle();

        (handle, tokio::spawn(self.run()))
    }

    pub async fn run(self) {
        let Bus { sender, mut receiver, connection_counter: _, mut state } = self;

        // Only handles keep the bus alive.
        drop(sender);

        while let Some(msg) = receiver.recv().await {
            match msg {
                BusMessage::Connect(connection_id, client_id, will, sink) => {
                    state.handle_connect(connection_id, client_id, will, sink);
                },
                BusMessage::Disconnect(connection_id, client_id, will_disconnect_logic) => {
                    state.handle_disconnect(connection_id, client_id, will_disconnect_logic);
                },
                BusMessage::Subscribe(connection_id, client_id, filter) => {
                    state.handle_subscribe(connection_id, client_id, filter);
                },
                BusMessage::Unsubscribe(connection_id, client_id, filter) => {
                    state.handle_unsubscribe(connection_id, client_id, filter);
                },
                BusMessage::Publish(message) => {
                    state.publish_message(message);
                },
                BusMessage::MatchingSubscribers(topic, reply) => {
                    // The asker may have given up waiting.
                    reply.send(state.subscriptions.matching_subscribers(&topic)).ok();
                },
                BusMessage::Shutdown => {
                    info!("Shutting down the bus");
                    break;
                },
            }
        }

        debug!("Bus stopped with {} sessions", state.sessions.len());
    }
}

impl BusState {
    fn handle_connect(
        &mut self,
        connection_id: ConnectionId,
        client_id: ClientId,
        will: Option<Message>,
        sink: DeliverySink,
    ) {
        if let Some(existing_session) = self.sessions.remove(&client_id) {
            info!(
                "Client ID {} (connection {}) taken over by connection {}",
                client_id, existing_session.connection_id, connection_id
            );

            self.end_session(&client_id, existing_session, WillDisconnectLogic::Send);
        }

        info!("Client ID {} connected (connection {})", client_id, connection_id);

        self.dispatcher.register(client_id.clone(), sink);
        self.sessions.insert(client_id, Session { connection_id, will });
    }

    fn handle_disconnect(
        &mut self,
        connection_id: ConnectionId,
        client_id: ClientId,
        will_disconnect_logic: WillDisconnectLogic,
    ) {
        if !self.is_current_connection(connection_id, &client_id) {
            debug!(
                "Ignoring disconnect of client ID {} from stale connection {}",
                client_id, connection_id
            );
            return;
        }

        if let Some(session) = self.sessions.remove(&client_id) {
            info!("Client ID {} disconnected", client_id);
            self.end_session(&client_id, session, will_disconnect_logic);
        }
    }

    fn handle_subscribe(
        &mut self,
        connection_id: ConnectionId,
        client_id: ClientId,
        filter: TopicFilter,
    ) {
        if !self.is_current_connection(connection_id, &client_id) {
            warn!(
                "Ignoring subscribe to {} from client ID {} on stale connection {}",
                filter, client_id, connection_id
            );
            return;
        }

        debug!("Client ID {} subscribed to {}", client_id, filter);
        self.subscriptions.subscribe_filter(client_id, filter);
    }

    fn handle_unsubscribe(
        &mut self,
        connection_id: ConnectionId,
        client_id: ClientId,
        filter: TopicFilter,
    ) {
        if !self.is_current_connection(connection_id, &client_id) {
            warn!(
                "Ignoring unsubscribe from {} by client ID {} on stale connection {}",
                filter, client_id, connection_id
            );
            return;
        }

        if self.subscriptions.unsubscribe_filter(&client_id, &filter) {
            debug!("Client ID {} unsubscribed from {}", client_id, filter);
        } else {
            debug!("Client ID {} was not subscribed to {}", client_id, filter);
        }
    }

    fn is_current_connection(&self, connection_id: ConnectionId, client_id: &str) -> bool {
        self.sessions
            .get(client_id)
            .map_or(false, |session| session.connection_id == connection_id)
    }

    /// Drops the subscriptions and sink of a session which is already
    /// removed from `sessions`, then publishes its will if required.
    fn end_session(
        &mut self,
        client_id: &ClientId,
        session: Session,
        will_disconnect_logic: WillDisconnectLogic,
    ) {
        let removed = self.subscriptions.remove_subscriber(client_id);
        self.dispatcher.unregister(client_id);

        debug!("Removed {} subscriptions of client ID {}", removed, client_id);

        if let (Some(will), WillDisconnectLogic::Send) = (session.will, will_disconnect_logic) {
            info!("Publishing will of client ID {} on {}", client_id, will.topic);
            self.publish_message(will);
        }
    }

    fn publish_message(&mut self, message: Message) {
        trace!("Publishing message on {}", message.topic);

        let dispatch = self.dispatcher.dispatch(&self.subscriptions, &message);

        if !self.config.drop_closed_subscribers {
            return;
        }

        // The session itself stays until its disconnect arrives, which decides
        // whether the will is sent.
        for client_id in dispatch.closed {
            warn!("Dropping subscriptions of client ID {} with a closed receiver", client_id);

            self.subscriptions.remove_subscriber(&client_id);
            self.dispatcher.unregister(&client_id);
        }
    }
}
