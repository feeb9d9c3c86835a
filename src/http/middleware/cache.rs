//! Response cache gate.
//!
//! On a hit the stored body is replayed and the rest of the pipeline is
//! skipped. On a miss the call proceeds and its response streams straight
//! through to the caller while the data frames are copied aside. When the
//! stream ends with `grpc-status: 0` the copy is stored under the method
//! path; any other outcome discards it.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use bytes::{Bytes, BytesMut};
use futures_util::stream;
use http_body_util::StreamBody;
use hyper::body::{Frame, SizeHint};

use crate::cache::ResponseCache;
use crate::grpc::{Code, CONTENT_TYPE_GRPC, GRPC_STATUS};

/// Responses larger than this are relayed but not cached.
pub const MAX_CACHED_BODY: usize = 4 * 1024 * 1024;

pub async fn cache_middleware(
    State(cache): State<ResponseCache>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.uri().path().to_string();

    if let Some(body) = cache.lookup(&method).await {
        tracing::info!(method = %method, "Cache hit for method");
        return cached_response(body);
    }

    let response = next.run(request).await;
    if !may_succeed(&response) {
        return response;
    }

    let head_code = Code::from_headers(response.headers());
    let (parts, body) = response.into_parts();
    let capture = Capture {
        cache,
        method,
        head_code,
        data: BytesMut::new(),
    };
    Response::from_parts(parts, Body::new(CapturingBody::new(body, capture)))
}

/// False when the head already shows the call failed, so there is nothing
/// to store and the body can stream straight through.
fn may_succeed(response: &Response) -> bool {
    if response.status() != StatusCode::OK {
        return false;
    }
    matches!(Code::from_headers(response.headers()), None | Some(Code::Ok))
}

/// A successful gRPC response carrying `body` and a `grpc-status: 0` trailer.
fn cached_response(body: Bytes) -> Response {
    let mut trailers = HeaderMap::new();
    trailers.insert(GRPC_STATUS, HeaderValue::from(Code::Ok as i32));

    let mut frames = Vec::with_capacity(2);
    if !body.is_empty() {
        frames.push(Ok::<_, Infallible>(Frame::data(body)));
    }
    frames.push(Ok(Frame::trailers(trailers)));

    let mut response = Response::new(Body::new(StreamBody::new(stream::iter(frames))));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_GRPC));
    response
}

/// What a passing response has produced so far.
struct Capture {
    cache: ResponseCache,
    method: String,
    head_code: Option<Code>,
    data: BytesMut,
}

impl Capture {
    /// Store the copy if the call ended with `code == OK`.
    fn finish(self, code: Option<Code>) {
        if code != Some(Code::Ok) {
            tracing::debug!(method = %self.method, code = ?code, "Response not cached");
            return;
        }
        let Capture {
            cache, method, data, ..
        } = self;
        tokio::spawn(async move {
            cache.store(&method, data.freeze()).await;
        });
    }
}

/// Relays every frame unchanged while copying data frames into a [`Capture`].
///
/// Dropping the body before its end (the caller went away) drops the copy.
struct CapturingBody {
    inner: Body,
    capture: Option<Capture>,
}

impl CapturingBody {
    fn new(inner: Body, capture: Capture) -> Self {
        Self {
            inner,
            capture: Some(capture),
        }
    }

    fn observe(&mut self, frame: &Frame<Bytes>) {
        if let Some(data) = frame.data_ref() {
            let overflow = match self.capture.as_mut() {
                Some(capture) if capture.data.len() + data.len() <= MAX_CACHED_BODY => {
                    capture.data.extend_from_slice(data);
                    false
                }
                Some(_) => true,
                None => false,
            };
            if overflow {
                if let Some(capture) = self.capture.take() {
                    tracing::debug!(method = %capture.method, "Response too large to cache");
                }
            }
        } else if let Some(trailers) = frame.trailers_ref() {
            if let Some(capture) = self.capture.take() {
                capture.finish(Code::from_headers(trailers));
            }
        }
    }
}

impl HttpBody for CapturingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => this.observe(frame),
            Poll::Ready(Some(Err(_))) => this.capture = None,
            Poll::Ready(None) => {
                // No trailers: the head carried the final status.
                if let Some(capture) = this.capture.take() {
                    let code = capture.head_code;
                    capture.finish(code);
                }
            }
            Poll::Pending => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        // Keep being polled until the capture has been settled.
        self.capture.is_none() && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
