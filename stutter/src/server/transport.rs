use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use rama::{
    Service,
    extensions::{Extensions, ExtensionsMut, ExtensionsRef},
    stream::Stream,
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::delivery::FlushTracker;

/// Wraps every accepted connection in a [`TrackedStream`] and makes its
/// [`FlushTracker`] available to the requests served over it.
#[derive(Debug, Clone)]
pub struct TrackFlushService<S> {
    inner: S,
}

impl<S> TrackFlushService<S> {
    #[inline(always)]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S, IO> Service<IO> for TrackFlushService<S>
where
    IO: Stream + Unpin + ExtensionsMut,
    S: Service<TrackedStream<IO>>,
{
    type Output = S::Output;
    type Error = S::Error;

    async fn serve(&self, stream: IO) -> Result<Self::Output, Self::Error> {
        let tracker = FlushTracker::new();
        let mut stream = TrackedStream::new(stream, tracker.clone());
        stream.extensions_mut().insert(tracker);
        self.inner.serve(stream).await
    }
}

/// Transport which reports written bytes and completed flushes
/// to its [`FlushTracker`].
#[derive(Debug)]
pub struct TrackedStream<IO> {
    inner: IO,
    tracker: FlushTracker,
}

impl<IO> TrackedStream<IO> {
    pub fn new(inner: IO, tracker: FlushTracker) -> Self {
        Self { inner, tracker }
    }
}

impl<IO: ExtensionsRef> ExtensionsRef for TrackedStream<IO> {
    fn extensions(&self) -> &Extensions {
        self.inner.extensions()
    }
}

impl<IO: ExtensionsMut> ExtensionsMut for TrackedStream<IO> {
    fn extensions_mut(&mut self) -> &mut Extensions {
        self.inner.extensions_mut()
    }
}

impl<IO: AsyncRead + Unpin> AsyncRead for TrackedStream<IO> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<IO: AsyncWrite + Unpin> AsyncWrite for TrackedStream<IO> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let result = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = result {
            self.tracker.record_write(n);
        }
        result
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let result = Pin::new(&mut self.inner).poll_write_vectored(cx, bufs);
        if let Poll::Ready(Ok(n)) = result {
            self.tracker.record_write(n);
        }
        result
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let result = Pin::new(&mut self.inner).poll_flush(cx);
        if let Poll::Ready(Ok(())) = result {
            self.tracker.record_flush();
        }
        result
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
