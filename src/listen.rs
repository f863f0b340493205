//! Receiving side of the stream.
//!
//! Binds a UDP socket, decodes every datagram as a sequence of frames, and
//! hands each frame to a sink. This is what a plot reader does with the
//! emitter's output.

use std::io::Write;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use retro_exporter_sdk::{decode_datagram, Frame};
use tokio::net::UdpSocket;
use tokio::sync::watch;

/// Largest payload a UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_535;

/// Counters reported when the listener stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenSummary {
    pub datagrams: u64,
    pub frames: u64,
    pub malformed: u64,
}

/// Receives datagrams and decodes them into frames.
#[derive(Debug)]
pub struct Listener {
    socket: UdpSocket,
}

impl Listener {
    /// Bind the receiving socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        Ok(Self { socket })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive until `stop` is raised, passing each frame to `sink`.
    ///
    /// Malformed datagrams are logged and counted; they do not stop the loop.
    pub async fn run<F>(&self, mut stop: watch::Receiver<bool>, mut sink: F) -> Result<ListenSummary>
    where
        F: FnMut(SocketAddr, &Frame) -> Result<()>,
    {
        let mut summary = ListenSummary::default();
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            let (len, from) = tokio::select! {
                biased;
                _ = stop.wait_for(|stop| *stop) => break,
                received = self.socket.recv_from(&mut buf) => received.context("receive failed")?,
            };
            summary.datagrams += 1;

            match decode_datagram(&buf[..len]) {
                Ok(frames) => {
                    tracing::trace!(%from, bytes = len, frames = frames.len(), "datagram received");
                    for frame in &frames {
                        summary.frames += 1;
                        sink(from, frame)?;
                    }
                }
                Err(e) => {
                    summary.malformed += 1;
                    tracing::warn!(%from, bytes = len, error = %e, "malformed datagram");
                }
            }
        }

        Ok(summary)
    }
}

/// Sink that writes each frame as one JSON line.
pub fn json_lines<W: Write>(mut out: W) -> impl FnMut(SocketAddr, &Frame) -> Result<()> {
    move |_, frame| {
        serde_json::to_writer(&mut out, frame)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retro_exporter_sdk::{encode_frame, Value};
    use std::time::Duration;

    fn frame(ts: i64) -> Frame {
        let mut frame = Frame::new(ts);
        frame.insert("a", Value::Bool(true));
        frame
    }

    #[tokio::test]
    async fn test_decodes_batched_datagrams() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let target = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut datagram = encode_frame(&frame(1)).unwrap();
        datagram.extend(encode_frame(&frame(2)).unwrap());
        sender.send_to(&datagram, target).await.unwrap();
        sender.send_to(b"\xc1garbage", target).await.unwrap();

        let mut seen = Vec::new();
        let run = listener.run(stop_rx, |_, frame| {
            seen.push(frame.timestamp);
            if seen.len() == 2 {
                stop_tx.send_replace(true);
            }
            Ok(())
        });
        let summary = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.datagrams, 1);
    }

    #[test]
    fn test_json_lines_sink() {
        let mut out = Vec::new();
        {
            let mut sink = json_lines(&mut out);
            sink("127.0.0.1:1".parse().unwrap(), &frame(3)).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "{\"t\":3,\"v\":{\"a\":true}}\n");
    }
}
