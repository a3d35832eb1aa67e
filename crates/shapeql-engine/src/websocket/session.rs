use std::collections::HashMap;

use futures_util::{Stream, StreamExt};
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinSet},
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use super::protocol::{ClientEvent, Frame, Protocol, ServerEvent};
use crate::{Executor, Request, SessionConfig};

/// One subscription connection.
///
/// The session owns the connection-scoped cancellation token: every subscription runs under a
/// child of it, and all of them are cancelled when the session ends.
pub struct Session {
    executor: Executor,
    protocol: Protocol,
    config: SessionConfig,
    token: CancellationToken,
}

/// The outcome of handling one message.
enum Flow {
    Continue,
    Stop,
}

struct Active {
    generation: u64,
    token: CancellationToken,
    handle: AbortHandle,
}

/// Sent by subscription tasks back to the session.
struct TaskEvent {
    id: String,
    generation: u64,
    event: ServerEvent,
    terminal: bool,
}

impl Session {
    pub fn new(executor: Executor, protocol: Protocol, config: SessionConfig) -> Self {
        Session {
            executor,
            protocol,
            config,
            token: CancellationToken::new(),
        }
    }

    /// Drives the connection until either side closes it.
    ///
    /// `incoming` yields the text of every client message; frames for the client are written to
    /// `outgoing`.
    pub async fn run<S>(self, mut incoming: S, outgoing: mpsc::Sender<Frame>)
    where
        S: Stream<Item = String> + Unpin,
    {
        let _guard = self.token.clone().drop_guard();
        tracing::debug!(protocol = self.protocol.name(), "websocket session started");

        if self.handshake(&mut incoming, &outgoing).await {
            self.ready(&mut incoming, &outgoing).await;
        }

        tracing::debug!("websocket session ended");
    }

    async fn send(&self, outgoing: &mpsc::Sender<Frame>, event: ServerEvent) -> Flow {
        let closing = matches!(event, ServerEvent::Close { .. });
        if let ServerEvent::Close { code, reason } = &event {
            tracing::debug!(code, %reason, "closing websocket connection");
        }
        let Some(frame) = self.protocol.encode(&event) else {
            return Flow::Continue;
        };
        if outgoing.send(frame).await.is_err() || closing {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    /// Waits for `connection_init`. Returns whether the connection was acknowledged.
    async fn handshake<S>(&self, incoming: &mut S, outgoing: &mpsc::Sender<Frame>) -> bool
    where
        S: Stream<Item = String> + Unpin,
    {
        let deadline = time::sleep(self.config.init_timeout);
        tokio::pin!(deadline);

        loop {
            let text = tokio::select! {
                () = &mut deadline => {
                    tracing::warn!("connection initialisation timed out");
                    let reason = "Connection initialisation timeout";
                    self.send(outgoing, ServerEvent::ConnectionError(reason.into())).await;
                    self.send(outgoing, ServerEvent::close(4408, reason)).await;
                    return false;
                }
                text = incoming.next() => match text {
                    Some(text) => text,
                    None => return false,
                },
            };

            let flow = match self.protocol.decode(&text) {
                Ok(ClientEvent::Init) => {
                    if let Flow::Stop = self.send(outgoing, ServerEvent::Ack).await {
                        return false;
                    }
                    if self.protocol == Protocol::GraphqlWs {
                        if let Flow::Stop = self.send(outgoing, ServerEvent::KeepAlive).await {
                            return false;
                        }
                    }
                    return true;
                }
                Ok(ClientEvent::Ping(payload)) => self.send(outgoing, ServerEvent::Pong(payload)).await,
                Ok(ClientEvent::Pong | ClientEvent::Stop { .. }) => Flow::Continue,
                Ok(ClientEvent::Subscribe { .. }) => {
                    tracing::warn!("subscribe received before connection_init");
                    self.send(outgoing, ServerEvent::close(4401, "Unauthorized")).await
                }
                Ok(ClientEvent::Terminate) => Flow::Stop,
                Err(err) => self.invalid(outgoing, &err).await,
            };

            if let Flow::Stop = flow {
                return false;
            }
        }
    }

    async fn invalid(&self, outgoing: &mpsc::Sender<Frame>, err: &serde_json::Error) -> Flow {
        tracing::warn!("invalid websocket message: {err}");
        self.send(outgoing, ServerEvent::close(4400, "Invalid message received")).await
    }

    async fn ready<S>(&self, incoming: &mut S, outgoing: &mpsc::Sender<Frame>)
    where
        S: Stream<Item = String> + Unpin,
    {
        let (events_sender, mut events) = mpsc::channel::<TaskEvent>(16);
        let mut tasks = JoinSet::new();
        let mut subscriptions = HashMap::<String, Active>::new();
        let mut generation = 0_u64;

        let period = self.config.keep_alive_interval;
        let mut keep_alive = time::interval_at(Instant::now() + period, period);
        let mut pong_deadline: Option<Instant> = None;

        loop {
            let flow = tokio::select! {
                text = incoming.next() => match text {
                    None => Flow::Stop,
                    Some(text) => match self.protocol.decode(&text) {
                        Ok(ClientEvent::Init) => {
                            tracing::warn!("repeated connection_init");
                            self.send(outgoing, ServerEvent::close(4429, "Too many initialisation requests")).await
                        }
                        Ok(ClientEvent::Subscribe { id, request }) => {
                            if subscriptions.contains_key(&id) {
                                tracing::warn!(%id, "duplicate subscription id");
                                self.send(outgoing, ServerEvent::close(4409, format!("Subscriber for {id} already exists"))).await
                            } else {
                                generation += 1;
                                let token = self.token.child_token();
                                let task = subscription_loop(
                                    self.executor.clone(),
                                    request,
                                    id.clone(),
                                    generation,
                                    token.clone(),
                                    events_sender.clone(),
                                );
                                let handle = tasks.spawn(task);
                                subscriptions.insert(id, Active { generation, token, handle });
                                Flow::Continue
                            }
                        }
                        Ok(ClientEvent::Stop { id }) => match subscriptions.remove(&id) {
                            Some(active) => {
                                tracing::debug!(%id, "subscription stopped by the client");
                                active.token.cancel();
                                active.handle.abort();
                                if self.protocol == Protocol::GraphqlWs {
                                    self.send(outgoing, ServerEvent::Complete { id }).await
                                } else {
                                    Flow::Continue
                                }
                            }
                            None => Flow::Continue,
                        },
                        Ok(ClientEvent::Ping(payload)) => self.send(outgoing, ServerEvent::Pong(payload)).await,
                        Ok(ClientEvent::Pong) => {
                            pong_deadline = None;
                            Flow::Continue
                        }
                        Ok(ClientEvent::Terminate) => Flow::Stop,
                        Err(err) => self.invalid(outgoing, &err).await,
                    },
                },
                Some(TaskEvent { id, generation, event, terminal }) = events.recv() => {
                    let current = subscriptions.get(&id).is_some_and(|active| active.generation == generation);
                    if !current {
                        Flow::Continue
                    } else {
                        if terminal {
                            subscriptions.remove(&id);
                        }
                        self.send(outgoing, event).await
                    }
                }
                _ = keep_alive.tick() => {
                    if self.protocol == Protocol::GraphqlTransportWs && pong_deadline.is_none() {
                        pong_deadline = Some(Instant::now() + self.config.keep_alive_timeout);
                    }
                    self.send(outgoing, ServerEvent::KeepAlive).await
                }
                () = time::sleep_until(pong_deadline.unwrap_or_else(Instant::now)), if pong_deadline.is_some() => {
                    tracing::warn!("no pong received within the keep-alive window");
                    self.send(outgoing, ServerEvent::close(4504, "Keep-alive timeout")).await
                }
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(err) = result {
                        if err.is_panic() {
                            tracing::warn!("subscription task panicked");
                        }
                    }
                    Flow::Continue
                }
            };

            if let Flow::Stop = flow {
                break;
            }
        }

        self.token.cancel();
        tasks.shutdown().await;
    }
}

/// Runs one subscription and reports its responses to the session.
async fn subscription_loop(
    executor: Executor,
    request: Request,
    id: String,
    generation: u64,
    token: CancellationToken,
    events: mpsc::Sender<TaskEvent>,
) {
    let report = |event: ServerEvent, terminal: bool| TaskEvent {
        id: id.clone(),
        generation,
        event,
        terminal,
    };

    let mut responses = match executor.subscribe(request, token).await {
        Ok(responses) => responses,
        Err(errors) => {
            let event = ServerEvent::Error { id: id.clone(), errors };
            events.send(report(event, true)).await.ok();
            return;
        }
    };

    while let Some(response) = responses.next().await {
        let event = ServerEvent::Next {
            id: id.clone(),
            response,
        };
        if events.send(report(event, false)).await.is_err() {
            // The session is gone.
            return;
        }
    }

    tracing::debug!(%id, "subscription source exhausted");
    events.send(report(ServerEvent::Complete { id: id.clone() }, true)).await.ok();
}
