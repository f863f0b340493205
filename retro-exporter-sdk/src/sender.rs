//! Background sender.
//!
//! A single worker task per bound emitter consumes flushed generations from
//! a bounded queue, so datagrams reach each destination in flush order. The
//! producer side only ever calls `try_send` on the queue and never waits on
//! the network.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::buffer::Generation;
use crate::stats::Counters;

/// Socket shared by an emitter and its worker.
///
/// The worker clones the socket for each send. Emptying the slot closes the
/// socket as soon as no send is in flight, without waiting for the worker
/// task to be polled again.
pub(crate) type SocketSlot = Arc<Mutex<Option<Arc<UdpSocket>>>>;

/// A flushed generation plus the destinations registered when it was flushed.
#[derive(Debug)]
pub(crate) struct Outbound {
    pub generation: Generation,
    pub targets: Arc<Vec<SocketAddr>>,
}

/// Transmits outbound batches through the shared socket.
#[derive(Debug)]
pub(crate) struct SendWorker {
    socket: SocketSlot,
    counters: Arc<Counters>,
}

impl SendWorker {
    pub fn new(socket: SocketSlot, counters: Arc<Counters>) -> Self {
        Self { socket, counters }
    }

    fn socket(&self) -> Option<Arc<UdpSocket>> {
        self.socket.lock().clone()
    }

    /// Spawn the worker loop on `runtime`.
    ///
    /// The loop ends when the queue is closed and drained, as soon as the
    /// cancellation flag is raised, or once the socket slot has been emptied.
    pub fn spawn(
        self,
        runtime: &Handle,
        queue: mpsc::Receiver<Outbound>,
        cancel: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        runtime.spawn(self.run(queue, cancel))
    }

    async fn run(self, mut queue: mpsc::Receiver<Outbound>, mut cancel: watch::Receiver<bool>) {
        tracing::debug!("sender started");

        loop {
            let outbound = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => break,
                next = queue.recv() => match next {
                    Some(outbound) => outbound,
                    None => break,
                },
            };

            if !self.transmit(outbound, &mut cancel).await {
                break;
            }
        }

        tracing::debug!("sender stopped");
    }

    /// Send one batch to every target. Returns `false` if cancelled or closed.
    async fn transmit(&self, outbound: Outbound, cancel: &mut watch::Receiver<bool>) -> bool {
        let Outbound {
            generation,
            targets,
        } = outbound;

        if targets.is_empty() {
            tracing::trace!(
                records = generation.record_count(),
                "no destinations, batch discarded"
            );
            return true;
        }

        let records = generation.record_count();
        let datagram = generation.into_datagram();

        for target in targets.iter() {
            if *cancel.borrow() {
                return false;
            }
            let Some(socket) = self.socket() else {
                return false;
            };

            tokio::select! {
                biased;
                _ = cancelled(cancel) => return false,
                result = socket.send_to(&datagram, target) => match result {
                    Ok(sent) => {
                        Counters::incr(&self.counters.datagrams_sent);
                        Counters::add(&self.counters.bytes_sent, sent as u64);
                        tracing::trace!(%target, bytes = sent, records, "datagram sent");
                    }
                    Err(e) => {
                        // Best effort: one unreachable destination must not stop the others.
                        Counters::incr(&self.counters.send_errors);
                        tracing::warn!(%target, error = %e, "failed to send datagram");
                    }
                },
            }
        }

        true
    }
}

/// Resolves once cancellation is requested or the controller is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BatchBuffer;
    use std::time::Duration;

    async fn loopback() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    async fn slot() -> SocketSlot {
        Arc::new(Mutex::new(Some(Arc::new(loopback().await))))
    }

    fn outbound(payload: &[u8], targets: Vec<SocketAddr>) -> Outbound {
        let mut buffer = BatchBuffer::new();
        buffer.ingest(payload.to_vec());
        Outbound {
            generation: buffer.detach().unwrap(),
            targets: Arc::new(targets),
        }
    }

    #[tokio::test]
    async fn test_sends_to_every_target_in_order() {
        let first = loopback().await;
        let second = loopback().await;
        let counters = Arc::new(Counters::default());
        let worker = SendWorker::new(slot().await, counters.clone());

        let (tx, rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let handle = worker.spawn(&Handle::current(), rx, stop_rx);

        let targets = vec![first.local_addr().unwrap(), second.local_addr().unwrap()];
        tx.send(outbound(b"one", targets.clone())).await.unwrap();
        tx.send(outbound(b"two", targets)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let mut buf = [0u8; 16];
        for socket in [&first, &second] {
            let (n, _) = socket.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"one");
            let (n, _) = socket.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"two");
        }

        let stats = counters.collect();
        assert_eq!(stats.datagrams_sent, 4);
        assert_eq!(stats.bytes_sent, 12);
    }

    #[tokio::test]
    async fn test_empty_targets_send_nothing() {
        let counters = Arc::new(Counters::default());
        let worker = SendWorker::new(slot().await, counters.clone());

        let (tx, rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let handle = worker.spawn(&Handle::current(), rx, stop_rx);

        tx.send(outbound(b"lost", Vec::new())).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(counters.collect().datagrams_sent, 0);
        assert_eq!(counters.collect().send_errors, 0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_worker_and_skips_queue() {
        let receiver = loopback().await;
        let counters = Arc::new(Counters::default());
        let worker = SendWorker::new(slot().await, counters.clone());

        let (tx, rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = watch::channel(false);

        // Queue before the worker runs, then cancel: nothing may go out.
        tx.send(outbound(b"late", vec![receiver.local_addr().unwrap()]))
            .await
            .unwrap();
        stop_tx.send_replace(true);

        let handle = worker.spawn(&Handle::current(), rx, stop_rx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should stop promptly")
            .unwrap();

        assert_eq!(counters.collect().datagrams_sent, 0);
        drop(tx);
    }

    #[tokio::test]
    async fn test_emptied_slot_stops_worker() {
        let receiver = loopback().await;
        let counters = Arc::new(Counters::default());
        let socket = slot().await;
        let worker = SendWorker::new(socket.clone(), counters.clone());

        let (tx, rx) = mpsc::channel(4);
        let (_stop_tx, stop_rx) = watch::channel(false);

        tx.send(outbound(b"gone", vec![receiver.local_addr().unwrap()]))
            .await
            .unwrap();
        socket.lock().take();

        let handle = worker.spawn(&Handle::current(), rx, stop_rx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should stop once the socket is gone")
            .unwrap();

        assert_eq!(counters.collect().datagrams_sent, 0);
        drop(tx);
    }
}
