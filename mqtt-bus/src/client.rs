use crate::{
    bus::{BusMessage, ClientId, ConnectionId, WillDisconnectLogic},
    config::ConnectOptions,
    error::BusError,
    message::Message,
};
use bytes::Bytes;
use futures::Stream;
use log::{debug, warn};
use mqtt_topic::{Topic, TopicFilter};
use nanoid::nanoid;
use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::{Context, Poll},
    time::Duration,
};
use tokio::{
    runtime,
    sync::{
        mpsc::{self, error::TrySendError, Sender, UnboundedReceiver},
        oneshot,
    },
    task::JoinHandle,
    time,
};

/// A cloneable handle for talking to a running [`crate::Bus`].
///
/// Input is validated before anything is sent, so an invalid topic or filter
/// never reaches the bus.
#[derive(Debug, Clone)]
pub struct BusHandle {
    sender: Sender<BusMessage>,
    connection_counter: Arc<AtomicU64>,
    operation_timeout: Duration,
}

impl BusHandle {
    pub(crate) fn new(
        sender: Sender<BusMessage>,
        connection_counter: Arc<AtomicU64>,
        operation_timeout: Duration,
    ) -> Self {
        Self { sender, connection_counter, operation_timeout }
    }

    async fn send(&self, message: BusMessage) -> Result<(), BusError> {
        time::timeout(self.operation_timeout, self.sender.send(message))
            .await
            .map_err(|_| BusError::Timeout)?
            .map_err(|_| BusError::BusClosed)
    }

    /// Starts a session. A client ID which is already connected is taken over.
    pub async fn connect(&self, options: ConnectOptions) -> Result<BusClient, BusError> {
        let client_id = match options.client_id {
            Some(client_id) if !client_id.is_empty() => client_id,
            _ => nanoid!(),
        };

        let connection_id = self.connection_counter.fetch_add(1, Ordering::Relaxed);
        let (sink, receiver) = mpsc::unbounded_channel();

        self.send(BusMessage::Connect(connection_id, client_id.clone(), options.will, sink))
            .await?;

        Ok(BusClient {
            client_id,
            connection_id,
            handle: self.clone(),
            receiver: Some(receiver),
            disconnected: false,
        })
    }

    /// Returns once the message is queued on the bus, not once it's delivered.
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Bytes>,
        retain: bool,
    ) -> Result<(), BusError> {
        self.publish_message(Message::new(topic, payload, retain)?).await
    }

    pub async fn publish_message(&self, message: Message) -> Result<(), BusError> {
        self.send(BusMessage::Publish(message)).await
    }

    /// Client IDs of every session with a subscription matching `topic`.
    pub async fn matching_subscribers(&self, topic: &str) -> Result<Vec<ClientId>, BusError> {
        let topic: Topic = topic.parse().map_err(BusError::InvalidTopic)?;
        let (reply, receiver) = oneshot::channel();

        self.send(BusMessage::MatchingSubscribers(topic, reply)).await?;

        receiver.await.map_err(|_| BusError::BusClosed)
    }

    pub async fn shutdown(&self) -> Result<(), BusError> {
        self.send(BusMessage::Shutdown).await
    }
}

/// A connected session.
///
/// Messages for the session's subscriptions are read with [`BusClient::recv`],
/// through the [`Stream`] impl, or by handing a callback to
/// [`BusClient::handle`]. Dropping the client without calling
/// [`BusClient::close`] counts as an abnormal disconnect and publishes the will.
#[derive(Debug)]
pub struct BusClient {
    client_id: ClientId,
    connection_id: ConnectionId,
    handle: BusHandle,
    receiver: Option<UnboundedReceiver<Message>>,
    disconnected: bool,
}

impl BusClient {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn bus(&self) -> &BusHandle {
        &self.handle
    }

    pub async fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        let filter: TopicFilter = filter.parse().map_err(BusError::InvalidSub)?;

        self.handle
            .send(BusMessage::Subscribe(self.connection_id, self.client_id.clone(), filter))
            .await
    }

    pub async fn unsubscribe(&self, filter: &str) -> Result<(), BusError> {
        let filter: TopicFilter = filter.parse().map_err(BusError::InvalidSub)?;

        self.handle
            .send(BusMessage::Unsubscribe(self.connection_id, self.client_id.clone(), filter))
            .await
    }

    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Bytes>,
        retain: bool,
    ) -> Result<(), BusError> {
        self.handle.publish(topic, payload, retain).await
    }

    /// Waits for the next message. Returns `None` once the session has ended,
    /// or if the messages are being fed to a [`BusClient::handle`] callback.
    pub async fn recv(&mut self) -> Option<Message> {
        match &mut self.receiver {
            Some(receiver) => receiver.recv().await,
            None => None,
        }
    }

    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.as_mut()?.try_recv().ok()
    }

    /// Spawns a task feeding every received message to `callback` until the
    /// session ends.
    ///
    /// Returns `None` if messages are already being handled.
    pub fn handle<F>(&mut self, mut callback: F) -> Option<JoinHandle<()>>
    where
        F: FnMut(Message) + Send + 'static,
    {
        let mut receiver = self.receiver.take()?;

        Some(tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                callback(message);
            }
        }))
    }

    /// Ends the session normally. The will is discarded.
    pub async fn close(self) -> Result<(), BusError> {
        self.disconnect(WillDisconnectLogic::DoNotSend).await
    }

    /// Ends the session and has the bus publish the will.
    pub async fn disconnect_with_will(self) -> Result<(), BusError> {
        self.disconnect(WillDisconnectLogic::Send).await
    }

    async fn disconnect(
        mut self,
        will_disconnect_logic: WillDisconnectLogic,
    ) -> Result<(), BusError> {
        self.disconnected = true;

        self.handle
            .send(BusMessage::Disconnect(
                self.connection_id,
                self.client_id.clone(),
                will_disconnect_logic,
            ))
            .await
    }
}

impl Stream for BusClient {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        match self.get_mut().receiver.as_mut() {
            Some(receiver) => receiver.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for BusClient {
    fn drop(&mut self) {
        if self.disconnected {
            return;
        }

        let message = BusMessage::Disconnect(
            self.connection_id,
            self.client_id.clone(),
            WillDisconnectLogic::Send,
        );

        match self.handle.sender.try_send(message) {
            Ok(()) => {},
            Err(TrySendError::Closed(_)) => {
                debug!("Bus already stopped when client ID {} was dropped", self.client_id);
            },
            Err(TrySendError::Full(message)) => match runtime::Handle::try_current() {
                Ok(runtime) => {
                    debug!("Bus queue full, deferring disconnect of client ID {}", self.client_id);

                    let sender = self.handle.sender.clone();
                    runtime.spawn(async move {
                        if sender.send(message).await.is_err() {
                            debug!("Bus stopped before a deferred disconnect was delivered");
                        }
                    });
                },
                Err(_) => {
                    warn!(
                        "Failed to send disconnect for client ID {}. Bus queue is full",
                        self.client_id
                    );
                },
            },
        }
    }
}
