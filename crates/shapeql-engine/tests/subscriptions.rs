use futures_util::{stream, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shapeql_engine::{
    record,
    websocket::{Frame, Protocol, Session},
    EnumTable, EventStream, Executor, Func, Request, Schema, SessionConfig,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

record! {
    pub struct Query {
        pub ready: bool,
    }
}

record! {
    pub struct Subscription {
        #[field = "ticks(count)"]
        pub ticks: Func<fn(i32) -> EventStream<i32>>,
        pub forever: Func<fn() -> EventStream<String>>,
    }
}

fn executor() -> Executor {
    let schema = Schema::builder(&EnumTable::new())
        .query::<Query>()
        .subscription::<Subscription>()
        .finish()
        .unwrap();

    let subscription = Subscription {
        ticks: Func::new(|count: i32| async move { EventStream::new(stream::iter(0..count)) }),
        forever: Func::new(|| async { EventStream::new(stream::pending::<String>()) }),
    };

    Executor::builder(schema, Query { ready: true })
        .subscription(subscription)
        .build()
}

#[tokio::test]
async fn each_event_produces_a_response() {
    let responses = executor()
        .subscribe(Request::new("subscription { ticks(count: 3) }"), CancellationToken::new())
        .await
        .unwrap();

    let responses: Vec<Value> = responses
        .map(|response| serde_json::to_value(response).unwrap())
        .collect()
        .await;

    assert_eq!(
        responses,
        [
            json!({"data": {"ticks": 0}}),
            json!({"data": {"ticks": 1}}),
            json!({"data": {"ticks": 2}})
        ]
    );
}

#[tokio::test]
async fn subscription_errors() {
    let executor = executor();

    let response = executor.execute(Request::new("subscription { ticks(count: 1) }")).await;
    assert_eq!(
        response.errors[0].message,
        "subscriptions are only supported over a websocket connection"
    );

    let Err(errors) = executor
        .subscribe(
            Request::new("subscription { ticks(count: 1) forever }"),
            CancellationToken::new(),
        )
        .await
    else {
        panic!("expected the subscription to be rejected");
    };
    assert_eq!(errors[0].message, "a subscription must select exactly one root field");
}

struct Client {
    sender: mpsc::Sender<String>,
    frames: mpsc::Receiver<Frame>,
    session: JoinHandle<()>,
}

impl Client {
    fn connect(protocol: Protocol) -> Client {
        let (sender, receiver) = mpsc::channel(16);
        let (frame_sender, frames) = mpsc::channel(16);
        let incoming = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|message| (message, receiver))
        })
        .boxed();

        let session = Session::new(executor(), protocol, SessionConfig::default());
        let session = tokio::spawn(session.run(incoming, frame_sender));

        Client {
            sender,
            frames,
            session,
        }
    }

    async fn send(&self, message: Value) {
        self.sender.send(message.to_string()).await.unwrap();
    }

    async fn receive(&mut self) -> Value {
        match self.frames.recv().await {
            Some(Frame::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a message, got {other:?}"),
        }
    }

    async fn closed(mut self) -> (u16, String) {
        let frame = self.frames.recv().await;
        self.session.await.unwrap();
        match frame {
            Some(Frame::Close { code, reason }) => (code, reason),
            other => panic!("expected a close frame, got {other:?}"),
        }
    }

    async fn init(&mut self) {
        self.send(json!({"type": "connection_init"})).await;
        assert_eq!(self.receive().await, json!({"type": "connection_ack"}));
    }
}

#[tokio::test]
async fn transport_ws_subscription() {
    let mut client = Client::connect(Protocol::GraphqlTransportWs);
    client.init().await;

    client.send(json!({"type": "ping"})).await;
    assert_eq!(client.receive().await, json!({"type": "pong"}));

    client
        .send(json!({"type": "subscribe", "id": "1", "payload": {"query": "subscription { ticks(count: 2) }"}}))
        .await;
    assert_eq!(
        client.receive().await,
        json!({"type": "next", "id": "1", "payload": {"data": {"ticks": 0}}})
    );
    assert_eq!(
        client.receive().await,
        json!({"type": "next", "id": "1", "payload": {"data": {"ticks": 1}}})
    );
    assert_eq!(client.receive().await, json!({"type": "complete", "id": "1"}));

    // Completed ids can be reused.
    client
        .send(json!({"type": "subscribe", "id": "1", "payload": {"query": "subscription { ticks(count: 1) forever }"}}))
        .await;
    assert_eq!(
        client.receive().await,
        json!({
            "type": "error",
            "id": "1",
            "payload": [{"message": "a subscription must select exactly one root field"}]
        })
    );

    client
        .send(json!({"type": "subscribe", "id": "2", "payload": {"query": "subscription { forever }"}}))
        .await;
    client.send(json!({"type": "complete", "id": "2"})).await;
    client
        .send(json!({"type": "subscribe", "id": "2", "payload": {"query": "{ ready }"}}))
        .await;
    assert_eq!(
        client.receive().await,
        json!({"type": "next", "id": "2", "payload": {"data": {"ready": true}}})
    );
    assert_eq!(client.receive().await, json!({"type": "complete", "id": "2"}));
}

#[tokio::test]
async fn duplicate_subscription_ids_close_the_connection() {
    let mut client = Client::connect(Protocol::GraphqlTransportWs);
    client.init().await;

    let subscribe = json!({"type": "subscribe", "id": "7", "payload": {"query": "subscription { forever }"}});
    client.send(subscribe.clone()).await;
    client.send(subscribe).await;

    assert_eq!(client.closed().await, (4409, "Subscriber for 7 already exists".to_string()));
}

#[tokio::test]
async fn protocol_violations_close_the_connection() {
    let client = Client::connect(Protocol::GraphqlTransportWs);
    client
        .send(json!({"type": "subscribe", "id": "1", "payload": {"query": "{ ready }"}}))
        .await;
    assert_eq!(client.closed().await, (4401, "Unauthorized".to_string()));

    let mut client = Client::connect(Protocol::GraphqlTransportWs);
    client.init().await;
    client.send(json!({"type": "connection_init"})).await;
    assert_eq!(client.closed().await, (4429, "Too many initialisation requests".to_string()));

    let client = Client::connect(Protocol::GraphqlTransportWs);
    client.sender.send("not json".to_string()).await.unwrap();
    assert_eq!(client.closed().await, (4400, "Invalid message received".to_string()));
}

#[tokio::test(start_paused = true)]
async fn initialisation_timeout() {
    let client = Client::connect(Protocol::GraphqlTransportWs);
    assert_eq!(client.closed().await, (4408, "Connection initialisation timeout".to_string()));

    let mut client = Client::connect(Protocol::GraphqlWs);
    assert_eq!(
        client.receive().await,
        json!({"type": "connection_error", "payload": {"message": "Connection initialisation timeout"}})
    );
    assert_eq!(client.closed().await, (4408, "Connection initialisation timeout".to_string()));
}

#[tokio::test(start_paused = true)]
async fn unanswered_pings_close_the_connection() {
    let mut client = Client::connect(Protocol::GraphqlTransportWs);
    client.init().await;

    assert_eq!(client.receive().await, json!({"type": "ping"}));
    client.send(json!({"type": "pong"})).await;
    assert_eq!(client.receive().await, json!({"type": "ping"}));

    assert_eq!(client.closed().await, (4504, "Keep-alive timeout".to_string()));
}

#[tokio::test]
async fn legacy_graphql_ws_subscription() {
    let mut client = Client::connect(Protocol::GraphqlWs);
    client.init().await;
    assert_eq!(client.receive().await, json!({"type": "ka"}));

    client
        .send(json!({"type": "start", "id": "a", "payload": {"query": "subscription { ticks(count: 1) }"}}))
        .await;
    assert_eq!(
        client.receive().await,
        json!({"type": "data", "id": "a", "payload": {"data": {"ticks": 0}}})
    );
    assert_eq!(client.receive().await, json!({"type": "complete", "id": "a"}));

    client
        .send(json!({"type": "start", "id": "b", "payload": {"query": "subscription { forever }"}}))
        .await;
    client.send(json!({"type": "stop", "id": "b"})).await;
    assert_eq!(client.receive().await, json!({"type": "complete", "id": "b"}));

    client.send(json!({"type": "connection_terminate"})).await;
    assert!(client.frames.recv().await.is_none());
    client.session.await.unwrap();
}
