//! Response capture for the audit trail
//!
//! [`capture_response`] wraps a response body so every data frame is
//! forwarded to the client unchanged while a copy accumulates on the side.
//! Once the body has been fully written the completion callback receives the
//! status code and the accumulated bytes. If the body is dropped early
//! (client disconnect, HEAD request) the callback still runs on a spawned
//! task with whatever was captured so far.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use axum::{body::Body, http::StatusCode, response::Response};
use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use http_body::{Frame, SizeHint};

/// Status and body observed on the way out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

type OnComplete = Box<dyn FnOnce(CapturedResponse) -> BoxFuture<'static, ()> + Send>;

/// Wrap `response` so `on_complete` runs once its body has been sent
pub fn capture_response<F, Fut>(response: Response, on_complete: F) -> Response
where
    F: FnOnce(CapturedResponse) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (parts, body) = response.into_parts();
    let body = CaptureBody::new(body, parts.status, on_complete);
    Response::from_parts(parts, Body::new(body))
}

/// Pass-through body that keeps a copy of every data frame
pub struct CaptureBody<B> {
    inner: B,
    status: StatusCode,
    buffer: BytesMut,
    on_complete: Option<OnComplete>,
    pending: Option<BoxFuture<'static, ()>>,
    finished: bool,
}

impl<B> CaptureBody<B> {
    pub fn new<F, Fut>(inner: B, status: StatusCode, on_complete: F) -> Self
    where
        F: FnOnce(CapturedResponse) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            inner,
            status,
            buffer: BytesMut::new(),
            on_complete: Some(Box::new(move |captured| Box::pin(on_complete(captured)))),
            pending: None,
            finished: false,
        }
    }

    /// Hand the captured response to the callback, at most once
    fn start_completion(&mut self) -> Option<BoxFuture<'static, ()>> {
        let on_complete = self.on_complete.take()?;
        let captured = CapturedResponse {
            status: self.status,
            body: std::mem::take(&mut self.buffer).freeze(),
        };
        Some(on_complete(captured))
    }
}

impl<B> http_body::Body for CaptureBody<B>
where
    B: http_body::Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        loop {
            if let Some(pending) = this.pending.as_mut() {
                ready!(pending.as_mut().poll(cx));
                this.pending = None;
                this.finished = true;
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
                Some(Ok(frame)) => {
                    if let Some(data) = frame.data_ref() {
                        this.buffer.extend_from_slice(data);
                    }
                    return Poll::Ready(Some(Ok(frame)));
                }
                Some(Err(err)) => {
                    // The stream is broken; report what made it out
                    if let Some(completion) = this.start_completion() {
                        spawn_completion(completion);
                    }
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                None => match this.start_completion() {
                    Some(completion) => this.pending = Some(completion),
                    None => this.finished = true,
                },
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for CaptureBody<B> {
    fn drop(&mut self) {
        let completion = self.pending.take().or_else(|| self.start_completion());
        if let Some(completion) = completion {
            spawn_completion(completion);
        }
    }
}

pub(crate) fn spawn_completion(completion: BoxFuture<'static, ()>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(completion);
        }
        Err(_) => tracing::warn!("No async runtime available, dropping response completion"),
    }
}
