//! Request body tee.
//!
//! `TeeBody` wraps a body and mirrors every data frame it yields into a shared buffer while
//! the downstream consumer polls it. The frames themselves pass through unchanged. The
//! mirror is bounded by a `TeeLimit`; bytes beyond the limit are forwarded but not kept.
//!
//! The wrapped body lives in state shared with the `TeeHandle`, so the handle can still
//! drain what the consumer left unread, e.g. when the backend answered without reading
//! the whole request. The handle only touches the wrapped body once the consumer has
//! dropped its `TeeBody`; while the consumer is still streaming, frames belong to it.
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeLimit {
    Disabled,
    Bounded(usize),
    Unbounded,
}

impl TeeLimit {
    /// `0` disables the tee, a negative value keeps the whole body.
    pub fn from_signed(max: i64) -> Self {
        match max {
            0 => Self::Disabled,
            n if n < 0 => Self::Unbounded,
            n => Self::Bounded(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    fn remaining(&self, buffered: usize) -> usize {
        match self {
            Self::Disabled => 0,
            Self::Bounded(max) => max.saturating_sub(buffered),
            Self::Unbounded => usize::MAX,
        }
    }
}

#[derive(Debug)]
struct Shared<B> {
    inner: Option<B>,
    buffer: BytesMut,
    limit: TeeLimit,
    consumer_dropped: bool,
}

impl<B> Shared<B> {
    fn mirror(&mut self, data: &Bytes) {
        let take = self.limit.remaining(self.buffer.len()).min(data.len());
        if take > 0 {
            self.buffer.extend_from_slice(&data[..take]);
        }
    }

    fn is_full(&self) -> bool {
        self.limit.remaining(self.buffer.len()) == 0
    }
}

fn lock<B>(shared: &Mutex<Shared<B>>) -> MutexGuard<'_, Shared<B>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct BodyTee;

impl BodyTee {
    /// Splits `body` into the body handed downstream and the handle used to read the capture.
    pub fn new<B>(body: B, limit: TeeLimit) -> (TeeBody<B>, TeeHandle<B>) {
        let shared = Arc::new(Mutex::new(Shared {
            inner: Some(body),
            buffer: BytesMut::new(),
            limit,
            consumer_dropped: false,
        }));

        (
            TeeBody {
                shared: shared.clone(),
            },
            TeeHandle { shared },
        )
    }
}

/// The body seen by the downstream consumer.
pub struct TeeBody<B> {
    shared: Arc<Mutex<Shared<B>>>,
}

impl<B> Body for TeeBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut shared = lock(&self.shared);
        let Some(inner) = shared.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    shared.mirror(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(None) => {
                shared.inner = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        lock(&self.shared)
            .inner
            .as_ref()
            .is_none_or(Body::is_end_stream)
    }

    fn size_hint(&self) -> SizeHint {
        lock(&self.shared)
            .inner
            .as_ref()
            .map(Body::size_hint)
            .unwrap_or_else(|| SizeHint::with_exact(0))
    }
}

impl<B> Drop for TeeBody<B> {
    fn drop(&mut self) {
        lock(&self.shared).consumer_dropped = true;
    }
}

/// Read side of the tee, kept by the observer.
pub struct TeeHandle<B> {
    shared: Arc<Mutex<Shared<B>>>,
}

impl<B> TeeHandle<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    /// Finishes the capture and returns it, or `None` when nothing was captured.
    ///
    /// Once the consumer dropped its `TeeBody`, `drain` reads the unread remainder into
    /// the buffer until the limit is reached or the body ends, and the wrapped body is
    /// released. A body error stops the drain and keeps what was captured so far.
    ///
    /// While the consumer still holds the body, only what it has read so far is
    /// returned. The body keeps streaming to the consumer but is no longer mirrored.
    pub async fn finish(self, drain: bool) -> Option<Bytes> {
        let consumer_dropped = lock(&self.shared).consumer_dropped;
        if consumer_dropped && drain {
            self.drain().await;
        }

        let mut shared = lock(&self.shared);
        if consumer_dropped {
            shared.inner = None;
        } else {
            shared.limit = TeeLimit::Disabled;
        }

        if shared.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut shared.buffer).freeze())
        }
    }

    async fn drain(&self) {
        poll_fn(|cx| {
            let mut shared = lock(&self.shared);
            loop {
                if shared.is_full() {
                    return Poll::Ready(());
                }
                let Some(inner) = shared.inner.as_mut() else {
                    return Poll::Ready(());
                };

                match Pin::new(inner).poll_frame(cx) {
                    Poll::Ready(Some(Ok(frame))) => {
                        if let Some(data) = frame.data_ref() {
                            shared.mirror(data);
                        }
                    }
                    Poll::Ready(Some(Err(_))) | Poll::Ready(None) => {
                        shared.inner = None;
                        return Poll::Ready(());
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }
        })
        .await
    }
}
