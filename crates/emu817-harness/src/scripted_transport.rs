//! In-memory transport that replays a scripted byte stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use emu817_core::{Error, Result, Transport};

/// A [`Transport`] fed from a fixed script of inbound chunks.
///
/// Each call to `receive` delivers the next scripted chunk (split across
/// calls if the caller's buffer is smaller); once the script runs out the
/// transport reports [`Error::ConnectionLost`], which is how a serial
/// client hanging up looks to the responder. Everything sent through the
/// transport is appended to a shared log for assertions.
///
/// # Example
///
/// ```
/// use emu817_harness::ScriptedTransport;
///
/// let transport = ScriptedTransport::new(vec![
///     vec![0x01, 0x40, 0x74, 0x00, 0x01], // one whole command
///     vec![0x00, 0x00],                   // a command split in two
///     vec![0x00, 0x00, 0x03],
/// ]);
/// let sent = transport.sent_handle();
/// # drop(sent);
/// ```
pub struct ScriptedTransport {
    script: VecDeque<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
    connected: Arc<AtomicBool>,
}

impl ScriptedTransport {
    /// Build a transport that will deliver `chunks` in order.
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        ScriptedTransport {
            script: chunks.into_iter().collect(),
            sent: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Handle onto the outbound byte log. Clone it before moving the
    /// transport into the code under test.
    pub fn sent_handle(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.sent)
    }

    /// Handle onto the connected flag, for asserting that the code under
    /// test closed the transport.
    pub fn connected_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    /// All bytes sent so far, flattened in order.
    pub fn sent(&self) -> Vec<u8> {
        self.sent.lock().expect("sent log poisoned").clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.sent
            .lock()
            .expect("sent log poisoned")
            .extend_from_slice(data);
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let Some(mut chunk) = self.script.pop_front() else {
            return Err(Error::ConnectionLost);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            // Caller's buffer was smaller than the chunk; requeue the rest.
            chunk.drain(..n);
            self.script.push_front(chunk);
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_chunks_in_order() {
        let mut t = ScriptedTransport::new(vec![vec![1, 2, 3], vec![4]]);
        let mut buf = [0u8; 16];
        assert_eq!(t.receive(&mut buf, Duration::from_secs(1)).await.unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(t.receive(&mut buf, Duration::from_secs(1)).await.unwrap(), 1);
        assert_eq!(buf[0], 4);
    }

    #[tokio::test]
    async fn splits_chunks_larger_than_the_buffer() {
        let mut t = ScriptedTransport::new(vec![vec![1, 2, 3, 4, 5]]);
        let mut buf = [0u8; 2];
        assert_eq!(t.receive(&mut buf, Duration::from_secs(1)).await.unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(t.receive(&mut buf, Duration::from_secs(1)).await.unwrap(), 2);
        assert_eq!(buf, [3, 4]);
        assert_eq!(t.receive(&mut buf, Duration::from_secs(1)).await.unwrap(), 1);
        assert_eq!(buf[0], 5);
    }

    #[tokio::test]
    async fn exhausted_script_reads_as_hangup() {
        let mut t = ScriptedTransport::new(vec![]);
        let mut buf = [0u8; 8];
        assert!(matches!(
            t.receive(&mut buf, Duration::from_secs(1)).await,
            Err(Error::ConnectionLost)
        ));
    }

    #[tokio::test]
    async fn logs_sent_bytes() {
        let mut t = ScriptedTransport::new(vec![]);
        let sent = t.sent_handle();
        t.send(&[0xF0]).await.unwrap();
        t.send(&[0x00, 0x01]).await.unwrap();
        assert_eq!(*sent.lock().unwrap(), vec![0xF0, 0x00, 0x01]);
    }

    #[tokio::test]
    async fn close_disconnects() {
        let mut t = ScriptedTransport::new(vec![vec![1]]);
        assert!(t.is_connected());
        t.close().await.unwrap();
        assert!(!t.is_connected());
        assert!(matches!(t.send(&[0]).await, Err(Error::NotConnected)));
    }
}
