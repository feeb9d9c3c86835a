//! Shared utilities for integration tests: gRPC-shaped h2c backends, a
//! gateway launcher and a raw HTTP/2 client.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, Response},
    Router,
};
use bytes::{BufMut, Bytes, BytesMut};
use futures_util::stream;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::client::conn::http2;
use hyper_util::rt::{TokioExecutor, TokioIo};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use grpc_gateway::cache::{CacheStore, MemoryStore, ResponseCache};
use grpc_gateway::http::{Gates, ProxyServer};
use grpc_gateway::lifecycle::Shutdown;
use grpc_gateway::load_balancer::RoundRobinBalancer;
use grpc_gateway::observability::{InMemoryMeter, RequestMeter};
use grpc_gateway::proxy::StreamDirector;
use grpc_gateway::security::JwtAuthenticator;

pub const SECRET: &str = "integration-secret";

/// Wrap `payload` in a gRPC length-prefixed frame.
pub fn frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(5 + payload.len());
    buf.put_u8(0);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Split a body into the payloads of its gRPC frames.
pub fn unframe(mut body: &[u8]) -> Vec<Vec<u8>> {
    let mut messages = Vec::new();
    while body.len() >= 5 {
        let len = u32::from_be_bytes([body[1], body[2], body[3], body[4]]) as usize;
        messages.push(body[5..5 + len].to_vec());
        body = &body[5 + len..];
    }
    messages
}

pub fn token(secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &serde_json::json!({ "sub": "integration" }),
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn ok_trailers() -> HeaderMap {
    let mut trailers = HeaderMap::new();
    trailers.insert("grpc-status", HeaderValue::from_static("0"));
    trailers
}

/// What a mock backend answers with.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Reply with one message `<name>:<first request message>`.
    Echo,
    /// Trailers-only failure.
    Fail { code: i32, message: &'static str },
    /// Send the head at once; after the request ends, send `<name>:<i>` for
    /// each of `messages`, waiting `interval` between them.
    Stream { messages: usize, interval: Duration },
    /// Answer every request message as it arrives with `<name>:<message>`.
    PingPong,
    /// Send the head and then nothing while the request stays open.
    Hold,
}

/// Everything a mock backend saw.
#[derive(Debug)]
pub struct BackendState {
    pub name: String,
    pub behaviour: Behaviour,
    pub calls: AtomicUsize,
    /// Request streams that ended with an error (reset by the peer).
    pub resets: AtomicUsize,
    pub forwarded_for: Mutex<Vec<String>>,
    pub bodies: Mutex<Vec<Bytes>>,
    stop: Notify,
}

impl BackendState {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Stop serving; open connections are closed once idle.
    pub fn stop(&self) {
        self.stop.notify_one();
    }
}

/// Start an h2c backend on an ephemeral port.
pub async fn start_backend(name: &str, behaviour: Behaviour) -> (SocketAddr, Arc<BackendState>) {
    let state = Arc::new(BackendState {
        name: name.to_string(),
        behaviour,
        calls: AtomicUsize::new(0),
        resets: AtomicUsize::new(0),
        forwarded_for: Mutex::new(Vec::new()),
        bodies: Mutex::new(Vec::new()),
        stop: Notify::new(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(backend_handler).with_state(state.clone());

    let stopper = state.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move { stopper.stop.notified().await })
            .await;
    });

    (addr, state)
}

fn grpc_response(body: Body) -> Response<Body> {
    Response::builder()
        .header(header::CONTENT_TYPE, "application/grpc")
        .body(body)
        .unwrap()
}

/// A response body fed frame by frame from a channel.
fn channel_body(rx: mpsc::Receiver<Frame<Bytes>>) -> Body {
    Body::new(StreamBody::new(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|f| (Ok::<_, Infallible>(f), rx))
    })))
}

async fn backend_handler(State(state): State<Arc<BackendState>>, request: Request<Body>) -> Response<Body> {
    state.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(value) = request.headers().get("x-forwarded-for") {
        state
            .forwarded_for
            .lock()
            .unwrap()
            .push(value.to_str().unwrap().to_string());
    }

    match state.behaviour.clone() {
        Behaviour::PingPong => return ping_pong(state, request.into_body()),
        Behaviour::Hold => return hold(state, request.into_body()),
        Behaviour::Stream { messages, interval } => {
            return server_stream(state, request.into_body(), messages, interval)
        }
        _ => {}
    }

    let body = request.into_body().collect().await.unwrap().to_bytes();
    state.bodies.lock().unwrap().push(body.clone());

    match state.behaviour.clone() {
        Behaviour::Echo => {
            let first = unframe(&body).into_iter().next().unwrap_or_default();
            let mut reply = format!("{}:", state.name).into_bytes();
            reply.extend_from_slice(&first);

            let frames = vec![
                Ok::<_, Infallible>(Frame::data(frame(&reply))),
                Ok(Frame::trailers(ok_trailers())),
            ];
            grpc_response(Body::new(StreamBody::new(stream::iter(frames))))
        }
        Behaviour::Fail { code, message } => Response::builder()
            .header(header::CONTENT_TYPE, "application/grpc")
            .header("grpc-status", code.to_string())
            .header("grpc-message", message)
            .body(Body::empty())
            .unwrap(),
        Behaviour::Stream { .. } | Behaviour::PingPong | Behaviour::Hold => unreachable!(),
    }
}

fn server_stream(state: Arc<BackendState>, body: Body, messages: usize, interval: Duration) -> Response<Body> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let Ok(request) = body.collect().await else {
            state.resets.fetch_add(1, Ordering::SeqCst);
            return;
        };
        state.bodies.lock().unwrap().push(request.to_bytes());

        for i in 0..messages {
            if i > 0 {
                tokio::time::sleep(interval).await;
            }
            let reply = format!("{}:{i}", state.name);
            if tx.send(Frame::data(frame(reply.as_bytes()))).await.is_err() {
                return;
            }
        }
        let _ = tx.send(Frame::trailers(ok_trailers())).await;
    });
    grpc_response(channel_body(rx))
}

fn ping_pong(state: Arc<BackendState>, mut body: Body) -> Response<Body> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        while let Some(next) = body.frame().await {
            let Ok(next) = next else {
                state.resets.fetch_add(1, Ordering::SeqCst);
                return;
            };
            let Ok(data) = next.into_data() else { continue };
            for message in unframe(&data) {
                let mut reply = format!("{}:", state.name).into_bytes();
                reply.extend_from_slice(&message);
                if tx.send(Frame::data(frame(&reply))).await.is_err() {
                    return;
                }
            }
        }
        let _ = tx.send(Frame::trailers(ok_trailers())).await;
    });
    grpc_response(channel_body(rx))
}

fn hold(state: Arc<BackendState>, mut body: Body) -> Response<Body> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        // `tx` lives as long as the request stream, keeping the response open.
        let _tx = tx;
        while let Some(next) = body.frame().await {
            if next.is_err() {
                state.resets.fetch_add(1, Ordering::SeqCst);
                return;
            }
        }
    });
    grpc_response(channel_body(rx))
}

/// A running gateway and the handles tests inspect.
pub struct Gateway {
    pub addr: SocketAddr,
    pub meter: InMemoryMeter,
    pub store: MemoryStore,
    pub shutdown: Shutdown,
}

impl Gateway {
    /// Wait for the response to `method` to land in the cache. Entries are
    /// written once the response stream has ended, after the caller got it.
    pub async fn cached(&self, method: &str) -> bool {
        for _ in 0..100 {
            if self.store.get(method).await.unwrap().is_some() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway in front of `backends` with in-memory cache and meter.
pub async fn start_gateway(backends: &[SocketAddr], cache_ttl: Duration) -> Gateway {
    let targets: Vec<String> = backends.iter().map(ToString::to_string).collect();
    let balancer = RoundRobinBalancer::connect(targets.as_slice()).await.unwrap();
    let meter = InMemoryMeter::new();
    let store = MemoryStore::new();

    let gates = Gates {
        authenticator: Arc::new(JwtAuthenticator::new(SECRET.as_bytes())),
        cache: ResponseCache::with_ttl(Arc::new(store.clone()) as Arc<dyn CacheStore>, cache_ttl),
        meter: Arc::new(meter.clone()) as Arc<dyn RequestMeter>,
    };
    let server = ProxyServer::new(StreamDirector::new(Arc::new(balancer)), gates);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    Gateway {
        addr,
        meter,
        store,
        shutdown,
    }
}

/// A raw HTTP/2 client connection to the gateway.
pub struct Client {
    sender: http2::SendRequest<Body>,
    connection: JoinHandle<()>,
    gateway: SocketAddr,
    pub local_addr: SocketAddr,
}

/// A completed call.
#[derive(Debug)]
pub struct Reply {
    pub headers: HeaderMap,
    pub body: Bytes,
    pub trailers: Option<HeaderMap>,
}

impl Reply {
    fn status_entry(&self, key: &str) -> Option<String> {
        self.trailers
            .as_ref()
            .and_then(|t| t.get(key))
            .or_else(|| self.headers.get(key))
            .map(|v| v.to_str().unwrap().to_string())
    }

    pub fn code(&self) -> Option<i32> {
        self.status_entry("grpc-status").map(|v| v.parse().unwrap())
    }

    pub fn message(&self) -> Option<String> {
        self.status_entry("grpc-message")
    }

    /// First response message as text.
    pub fn text(&self) -> String {
        let first = unframe(&self.body).into_iter().next().unwrap_or_default();
        String::from_utf8(first).unwrap()
    }
}

pub async fn connect(gateway: SocketAddr) -> Client {
    let stream = TcpStream::connect(gateway).await.unwrap();
    let local_addr = stream.local_addr().unwrap();
    let (sender, connection) = http2::handshake(TokioExecutor::new(), TokioIo::new(stream))
        .await
        .unwrap();
    let connection = tokio::spawn(async move {
        let _ = connection.await;
    });

    Client {
        sender,
        connection,
        gateway,
        local_addr,
    }
}

impl Client {
    fn request(&self, method: &str, bearer: Option<&str>, body: Body) -> Request<Body> {
        let mut builder = Request::post(format!("http://{}{}", self.gateway, method))
            .header(header::CONTENT_TYPE, "application/grpc")
            .header("te", "trailers");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(body).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> Response<Incoming> {
        let mut sender = self.sender.clone();
        sender.ready().await.unwrap();
        sender.send_request(request).await.unwrap()
    }

    /// Send one call carrying `messages` as its request stream.
    pub async fn call(&self, method: &str, bearer: Option<&str>, messages: &[&[u8]]) -> Reply {
        let mut body = BytesMut::new();
        for message in messages {
            body.extend_from_slice(&frame(message));
        }

        let request = self.request(method, bearer, Body::from(body.freeze()));
        let response = self.send(request).await;

        let (parts, body) = response.into_parts();
        let collected = body.collect().await.unwrap();
        let trailers = collected.trailers().cloned();

        Reply {
            headers: parts.headers,
            body: collected.to_bytes(),
            trailers,
        }
    }

    /// Open a call whose request stream stays open: each `Bytes` sent on the
    /// returned channel goes out as it is sent; dropping the sender ends it.
    /// Returns once the response head has arrived.
    pub async fn open(&self, method: &str, bearer: Option<&str>) -> (mpsc::Sender<Bytes>, Response<Incoming>) {
        let (tx, rx) = mpsc::channel::<Bytes>(16);
        let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|b| (Ok::<_, Infallible>(b), rx))
        }));

        let response = self.send(self.request(method, bearer, body)).await;
        (tx, response)
    }

    /// Drop the TCP connection without closing any stream.
    pub fn disconnect(self) {
        self.connection.abort();
    }
}

/// The next data frame, or `None` once trailers or the end arrive.
pub async fn next_data(body: &mut Incoming) -> Option<Bytes> {
    match body.frame().await {
        Some(next) => next.unwrap().into_data().ok(),
        None => None,
    }
}

/// Read what is left of a response: data frames and the trailers.
pub async fn read_rest(body: &mut Incoming) -> (Vec<Bytes>, Option<HeaderMap>) {
    let mut data = Vec::new();
    while let Some(next) = body.frame().await {
        match next.unwrap().into_data() {
            Ok(chunk) => data.push(chunk),
            Err(frame) => return (data, frame.into_trailers().ok()),
        }
    }
    (data, None)
}
