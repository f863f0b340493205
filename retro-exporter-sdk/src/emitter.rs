//! The batching emitter.

use std::fmt;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use parking_lot::Mutex;
use retro_exporter_types::{Frame, Sample};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::buffer::{BatchBuffer, FlushPolicy};
use crate::codec;
use crate::destinations::{check_family, parse_destination, Destinations};
use crate::error::{EmitterError, Result};
use crate::fields::{FieldMap, FieldSource, SplitFields};
use crate::sender::{Outbound, SendWorker, SocketSlot};
use crate::stats::{Counters, EmitterStats};

/// Default number of flushed generations that may wait for the sender.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Where an emitter is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No socket. Samples are still encoded and buffered, flushes are discarded.
    Unbound,
    /// Socket allocated, flushes are sent.
    Bound,
    /// Terminal. Everything is a no-op.
    Disposed,
}

enum Link {
    Unbound,
    Bound(BoundLink),
    Disposed,
}

struct BoundLink {
    socket: SocketSlot,
    queue: mpsc::Sender<Outbound>,
    worker: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Batches samples into MessagePack records and fans them out over UDP.
///
/// Ingestion (`push*`) is synchronous and never touches the network: once
/// the buffered size exceeds the threshold, the buffer is detached and
/// queued for a background sender task that transmits it as one datagram to
/// every destination.
///
/// Ingestion takes `&mut self`, so there is exactly one producer at a time.
/// Wrap the emitter in a mutex to feed it from several threads; the lock
/// then also covers the buffer swap.
///
/// The socket lives until [`dispose`](Self::dispose), [`shutdown`](Self::shutdown),
/// or drop, whichever comes first.
///
/// # Example
///
/// ```rust,no_run
/// use retro_exporter_sdk::Emitter;
/// use retro_exporter_types::Sample;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut emitter = Emitter::builder()
///         .threshold(512)
///         .output("a", None)
///         .output("start", Some("st"))
///         .build()?;
///
///     emitter.add_destination("127.0.0.1", 8934)?;
///     emitter.bind()?;
///
///     let sample = Sample::builder().timestamp(1).field("a", true).build();
///     emitter.push_sample(&sample);
///
///     emitter.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct Emitter {
    policy: FlushPolicy,
    bind_ip: IpAddr,
    port: u16,
    queue_capacity: usize,
    fields: FieldMap,
    destinations: Destinations,
    buffer: BatchBuffer,
    frame: Frame,
    counters: Arc<Counters>,
    cancel: watch::Sender<bool>,
    link: Link,
}

impl Emitter {
    /// Create an unbound emitter with the given flush threshold (bytes).
    pub fn new(threshold: usize) -> Result<Self> {
        Self::builder().threshold(threshold).build()
    }

    /// Create a builder for configuring the emitter.
    pub fn builder() -> EmitterBuilder {
        EmitterBuilder::new()
    }

    /// Register a source field for output. `output` defaults to the source name.
    pub fn register_output(&mut self, source: &str, output: Option<&str>) {
        self.fields.register(source, output);
    }

    /// Number of registered source fields.
    pub fn output_count(&self) -> usize {
        self.fields.len()
    }

    /// Add a destination by IP address and port.
    ///
    /// Destinations may be added at any time; they receive flushes triggered
    /// after they were added. Re-adding an endpoint is a no-op. The address
    /// family must match the local bind address.
    pub fn add_destination(&mut self, ip: &str, port: u16) -> Result<()> {
        let addr = parse_destination(ip, port)?;
        self.add_destination_addr(addr)?;
        Ok(())
    }

    /// Add a destination endpoint. Returns `Ok(false)` if it was already present.
    pub fn add_destination_addr(&mut self, addr: SocketAddr) -> Result<bool> {
        check_family(self.bind_ip, addr)?;
        let added = self.destinations.insert(addr);
        if added {
            tracing::debug!(destination = %addr, "destination added");
        }
        Ok(added)
    }

    /// Number of registered destinations.
    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    /// Allocate the socket on the configured port and start the sender.
    ///
    /// See [`bind_port`](Self::bind_port).
    pub fn bind(&mut self) -> Result<()> {
        self.bind_port(self.port)
    }

    /// Allocate the socket on `port` (0 = ephemeral) and start the sender.
    ///
    /// Must be called from within a Tokio runtime. Binding an emitter that
    /// is already bound or disposed does nothing.
    pub fn bind_port(&mut self, port: u16) -> Result<()> {
        if !matches!(self.link, Link::Unbound) {
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| EmitterError::NoRuntime)?;

        let std_socket =
            std::net::UdpSocket::bind(SocketAddr::new(self.bind_ip, port)).map_err(EmitterError::Bind)?;
        std_socket.set_nonblocking(true).map_err(EmitterError::Bind)?;
        let local_addr = std_socket.local_addr().map_err(EmitterError::Bind)?;
        let socket = {
            let _guard = runtime.enter();
            UdpSocket::from_std(std_socket).map_err(EmitterError::Bind)?
        };
        let socket: SocketSlot = Arc::new(Mutex::new(Some(Arc::new(socket))));

        let (queue, rx) = mpsc::channel(self.queue_capacity);
        let worker = SendWorker::new(socket.clone(), self.counters.clone()).spawn(
            &runtime,
            rx,
            self.cancel.subscribe(),
        );

        tracing::debug!(%local_addr, "emitter bound");
        self.link = Link::Bound(BoundLink {
            socket,
            queue,
            worker,
            local_addr,
        });
        Ok(())
    }

    /// Ingest one sample given as a timestamp and a set of fields.
    ///
    /// Only registered fields are emitted. A sample with none of them
    /// produces no record. Never blocks on the network.
    pub fn push<S: FieldSource + ?Sized>(&mut self, timestamp: i64, fields: &S) {
        if matches!(self.link, Link::Disposed) {
            return;
        }

        self.frame.reset(timestamp);
        self.fields.project(fields, &mut self.frame);
        if self.frame.is_empty() {
            Counters::incr(&self.counters.samples_skipped);
            return;
        }

        let record = match codec::encode_frame(&self.frame) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, timestamp, "dropping sample");
                return;
            }
        };
        Counters::incr(&self.counters.records_encoded);
        self.buffer.ingest(record);

        if self.policy.should_flush(self.buffer.size()) {
            self.flush();
        }
    }

    /// Ingest a [`Sample`].
    pub fn push_sample(&mut self, sample: &Sample) {
        self.push(sample.timestamp, sample);
    }

    /// Ingest a sample given as the poller's three typed maps.
    pub fn push_split(&mut self, timestamp: i64, fields: SplitFields<'_>) {
        self.push(timestamp, &fields);
    }

    /// Detach whatever has been buffered and hand it to the sender.
    ///
    /// Does nothing if the buffer is empty. When the emitter is not bound the
    /// detached data is discarded rather than queued.
    pub fn flush(&mut self) {
        let Some(generation) = self.buffer.detach() else {
            return;
        };
        Counters::incr(&self.counters.flushes);

        let Link::Bound(link) = &self.link else {
            Counters::incr(&self.counters.generations_dropped);
            tracing::trace!(bytes = generation.size(), "not bound, batch discarded");
            return;
        };

        let outbound = Outbound {
            generation,
            targets: self.destinations.snapshot(),
        };
        match link.queue.try_send(outbound) {
            Ok(()) => {}
            Err(TrySendError::Full(outbound)) => {
                Counters::incr(&self.counters.generations_dropped);
                tracing::warn!(
                    bytes = outbound.generation.size(),
                    "send queue full, batch dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                Counters::incr(&self.counters.generations_dropped);
            }
        }
    }

    /// Bytes accumulated since the last flush.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.size()
    }

    /// Records accumulated since the last flush.
    pub fn buffered_records(&self) -> usize {
        self.buffer.record_count()
    }

    /// Flush threshold in bytes.
    pub fn threshold(&self) -> usize {
        self.policy.threshold()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        match self.link {
            Link::Unbound => LifecycleState::Unbound,
            Link::Bound(_) => LifecycleState::Bound,
            Link::Disposed => LifecycleState::Disposed,
        }
    }

    /// Local address of the socket, if bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.link {
            Link::Bound(link) => Some(link.local_addr),
            _ => None,
        }
    }

    /// Snapshot of the emitter's counters.
    pub fn stats(&self) -> EmitterStats {
        self.counters.collect()
    }

    /// Cancel pending sends and close the socket.
    ///
    /// Idempotent. Buffered data that was not yet flushed is discarded and
    /// no datagram is sent afterwards. An idle socket is closed before this
    /// returns; a send already in flight releases it when it completes.
    pub fn dispose(&mut self) {
        if matches!(self.link, Link::Disposed) {
            return;
        }
        self.cancel.send_replace(true);
        if let Link::Bound(link) = mem::replace(&mut self.link, Link::Disposed) {
            link.socket.lock().take();
            link.worker.abort();
        }
        tracing::debug!("emitter disposed");
    }

    /// Flush what is buffered, let the sender drain its queue, then dispose.
    pub async fn shutdown(mut self) {
        self.flush();
        if let Link::Bound(link) = mem::replace(&mut self.link, Link::Disposed) {
            drop(link.queue);
            if let Err(e) = link.worker.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "sender task failed");
                }
            }
            link.socket.lock().take();
        }
        self.cancel.send_replace(true);
        tracing::debug!("emitter shut down");
    }
}

impl Drop for Emitter {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("threshold", &self.policy.threshold())
            .field("state", &self.state())
            .field("outputs", &self.fields.len())
            .field("destinations", &self.destinations.len())
            .field("buffered_bytes", &self.buffer.size())
            .finish()
    }
}

/// Builder for configuring an Emitter.
#[derive(Debug)]
pub struct EmitterBuilder {
    threshold: Option<usize>,
    bind_ip: IpAddr,
    port: u16,
    queue_capacity: usize,
    fields: FieldMap,
    destinations: Vec<SocketAddr>,
}

impl EmitterBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            threshold: None,
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            fields: FieldMap::new(),
            destinations: Vec::new(),
        }
    }

    /// Set the flush threshold in bytes. Defaults to 512.
    pub fn threshold(mut self, bytes: usize) -> Self {
        self.threshold = Some(bytes);
        self
    }

    /// Local port used by [`Emitter::bind`]. Defaults to 0 (ephemeral).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Local address the socket binds to. Defaults to `0.0.0.0`.
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    /// Number of flushed generations that may wait for the sender.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Register a source field for output.
    pub fn output(mut self, source: &str, output: Option<&str>) -> Self {
        self.fields.register(source, output);
        self
    }

    /// Add a destination endpoint. Its address family is checked against the
    /// bind address by [`build`](Self::build).
    pub fn destination(mut self, addr: SocketAddr) -> Self {
        self.destinations.push(addr);
        self
    }

    /// Build the (unbound) emitter.
    pub fn build(self) -> Result<Emitter> {
        let policy = match self.threshold {
            Some(bytes) => FlushPolicy::new(bytes)?,
            None => FlushPolicy::default(),
        };
        if self.queue_capacity == 0 {
            return Err(EmitterError::InvalidQueueCapacity(0));
        }

        let destinations = Destinations::new();
        for addr in self.destinations {
            check_family(self.bind_ip, addr)?;
            destinations.insert(addr);
        }
        let (cancel, _) = watch::channel(false);

        Ok(Emitter {
            policy,
            bind_ip: self.bind_ip,
            port: self.port,
            queue_capacity: self.queue_capacity,
            fields: self.fields,
            destinations,
            buffer: BatchBuffer::new(),
            frame: Frame::default(),
            counters: Arc::new(Counters::default()),
            cancel,
            link: Link::Unbound,
        })
    }
}

impl Default for EmitterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
