//! Pull-based streaming over a producer task.
//!
//! A [`StreamIterator`] owns the receiving half of a bounded channel fed by
//! one producer task. The producer writes through a [`StreamSender`]; a value
//! send returns `false` once the consumer has gone away, and
//! [`StreamSender::fail`] consumes the sender so nothing can follow an error.
//!
//! Closing (explicitly or by drop) cancels a token that the spawned producer
//! future is raced against, so an abandoned producer is dropped at its next
//! suspension point even if it never looks at the send result.

use std::future::Future;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::errors::{Result, RunError};

/// One incremental piece of a streamed result.
#[derive(Debug)]
pub enum StreamChunk<T> {
    /// A produced value.
    Value(T),
    /// Terminal: nothing follows an error in the same stream.
    Error(RunError),
}

/// Producer half of a stream.
#[derive(Debug)]
pub struct StreamSender<T> {
    tx: mpsc::Sender<StreamChunk<T>>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> StreamSender<T> {
    /// Emit a value. Returns `false` once the consumer is gone; the producer
    /// should stop.
    pub async fn send(&self, value: T) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            res = self.tx.send(StreamChunk::Value(value)) => res.is_ok(),
        }
    }

    /// Emit the terminal error chunk.
    pub async fn fail(self, error: RunError) {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {}
            _ = self.tx.send(StreamChunk::Error(error)) => {}
        }
    }

    /// True once the consumer has closed or dropped the iterator.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Token that fires when the consumer stops listening.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Consumer half of a stream.
///
/// [`next`](Self::next) yields `Ok(Some(value))` per value, `Ok(None)` once
/// exhausted, and `Err` exactly once for an error chunk, after which it
/// behaves as exhausted.
#[derive(Debug)]
pub struct StreamIterator<T> {
    rx: mpsc::Receiver<StreamChunk<T>>,
    cancel: CancellationToken,
    done: bool,
}

impl<T: Send + 'static> StreamIterator<T> {
    /// Create a connected pair. `cancel` is the token closing will fire.
    pub fn channel(buffer: usize, cancel: CancellationToken) -> (StreamSender<T>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let sender = StreamSender {
            tx,
            cancel: cancel.clone(),
        };
        let iter = Self {
            rx,
            cancel,
            done: false,
        };
        (sender, iter)
    }

    /// Run `producer` on its own task and stream what it sends.
    ///
    /// The stream is cancelled when the call's cancellation token fires, and
    /// the producer future is dropped as soon as the stream closes.
    pub fn spawn<F, Fut>(config: &RunConfig, producer: F) -> Self
    where
        F: FnOnce(StreamSender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let buffer = strand_settings::get_settings().runnable.stream_buffer;
        let cancel = config.cancellation().child_token();
        let (sender, iter) = Self::channel(buffer, cancel.clone());
        let fut = producer(sender);
        drop(tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::trace!("stream producer dropped after close");
                }
                () = fut => {}
            }
        }));
        iter
    }

    /// Stream a fixed sequence of chunks without a producer task.
    ///
    /// Chunks after the first error are never observed.
    pub fn from_chunks(chunks: impl IntoIterator<Item = StreamChunk<T>>) -> Self {
        let chunks: Vec<_> = chunks.into_iter().collect();
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            // capacity equals the chunk count
            let _ = tx.try_send(chunk);
        }
        Self {
            rx,
            cancel: CancellationToken::new(),
            done: false,
        }
    }

    /// A finished stream yielding `values` in order.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self::from_chunks(values.into_iter().map(StreamChunk::Value))
    }

    /// Single-chunk stream, the fallback for units without incremental output.
    pub fn once(value: T) -> Self {
        Self::from_values([value])
    }

    /// Stream consisting of one terminal error.
    pub fn failed(error: RunError) -> Self {
        Self::from_chunks([StreamChunk::Error(error)])
    }

    /// Pull the next value.
    pub async fn next(&mut self) -> Result<Option<T>> {
        if self.done {
            return Ok(None);
        }
        let received = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(RunError::Cancelled),
            chunk = self.rx.recv() => Ok(chunk),
        };
        match received {
            Ok(Some(StreamChunk::Value(value))) => Ok(Some(value)),
            Ok(Some(StreamChunk::Error(error))) | Err(error) => {
                self.finish();
                Err(error)
            }
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// Drain every remaining value, stopping at the terminal error.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut values = Vec::new();
        while let Some(value) = self.next().await? {
            values.push(value);
        }
        Ok(values)
    }

    /// Transform each value on a forwarding task.
    ///
    /// Closing the mapped stream closes this one.
    pub fn map<U, F>(mut self, f: F) -> StreamIterator<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + 'static,
    {
        let buffer = self.rx.max_capacity();
        let (sender, out) = StreamIterator::channel(buffer, CancellationToken::new());
        drop(tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    () = sender.cancellation().cancelled() => break,
                    next = self.next() => next,
                };
                match next {
                    Ok(Some(value)) => {
                        if !sender.send(f(value)).await {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(error) => {
                        sender.fail(error).await;
                        break;
                    }
                }
            }
        }));
        out
    }

    /// Adapt to a `futures::Stream` of results; ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        futures::stream::unfold(self, |mut iter| async move {
            match iter.next().await {
                Ok(Some(value)) => Some((Ok(value), iter)),
                Ok(None) => None,
                Err(error) => Some((Err(error), iter)),
            }
        })
    }
}

impl<T> StreamIterator<T> {
    /// Stop consuming. Idempotent and never blocks; the producer is released
    /// through the cancellation token.
    pub fn close(&mut self) {
        self.finish();
    }

    /// True once exhausted, failed or closed.
    pub fn is_closed(&self) -> bool {
        self.done
    }

    fn finish(&mut self) {
        self.done = true;
        self.cancel.cancel();
        self.rx.close();
    }
}

impl<T> Drop for StreamIterator<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
