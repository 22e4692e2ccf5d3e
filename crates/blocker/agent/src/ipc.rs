//! Daemon control channel over a Unix socket.
//!
//! Every request is one byte and every reply is one byte.

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Reply: monitoring is running.
pub const REPLY_ACTIVE: u8 = 0x01;
/// Reply: monitoring is stopped.
pub const REPLY_INACTIVE: u8 = 0x00;
/// Reply: the request failed.
pub const REPLY_ERROR: u8 = 0xFF;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unexpected reply byte {0:#04x}")]
    UnexpectedReply(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Status,
    Start,
    Stop,
    Shutdown,
}

impl Message {
    fn to_byte(self) -> u8 {
        match self {
            Message::Status => 0x01,
            Message::Start => 0x02,
            Message::Stop => 0x03,
            Message::Shutdown => 0x04,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Message::Status),
            0x02 => Some(Message::Start),
            0x03 => Some(Message::Stop),
            0x04 => Some(Message::Shutdown),
            _ => None,
        }
    }
}

/// Server side - runs in the daemon
pub struct IpcServer {
    listener: UnixListener,
    path: PathBuf,
    running: Arc<AtomicBool>,
}

impl IpcServer {
    pub fn bind(path: &Path) -> Result<Self, IpcError> {
        // Remove a stale socket left by a previous run
        let _ = std::fs::remove_file(path);

        let listener = UnixListener::bind(path)?;
        listener.set_nonblocking(true)?;

        info!(path = %path.display(), "control socket listening");

        Ok(Self {
            listener,
            path: path.to_path_buf(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Accept requests on a background thread. Each request arrives with the stream the
    /// reply must be written to.
    pub fn run(&self) -> Result<mpsc::Receiver<(Message, UnixStream)>, IpcError> {
        let (tx, rx) = mpsc::channel(32);
        let running = self.running.clone();
        let listener = self.listener.try_clone()?;

        std::thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        if let Some(msg) = read_message(stream) {
                            debug!(?msg, "control request");
                            if tx.blocking_send(msg).is_err() {
                                break;
                            }
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(50));
                    }
                    Err(e) => {
                        error!(error = %e, "accept error");
                    }
                }
            }
        });

        Ok(rx)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.stop();
        let _ = std::fs::remove_file(&self.path);
    }
}

fn read_message(mut stream: UnixStream) -> Option<(Message, UnixStream)> {
    stream.set_nonblocking(false).ok()?;
    stream.set_read_timeout(Some(IO_TIMEOUT)).ok()?;

    let mut buf = [0u8; 1];
    stream.read_exact(&mut buf).ok()?;
    Message::from_byte(buf[0]).map(|msg| (msg, stream))
}

/// Write a one-byte reply to a request stream.
pub fn reply(stream: &mut UnixStream, byte: u8) {
    if let Err(e) = stream.write_all(&[byte]) {
        debug!(error = %e, "failed to write control reply");
    }
}

/// Client side - used by the CLI
pub struct IpcClient {
    path: PathBuf,
}

impl IpcClient {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Send a request and wait for its reply byte.
    pub fn request(&self, msg: Message) -> Result<u8, IpcError> {
        let mut stream = UnixStream::connect(&self.path)?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.write_all(&[msg.to_byte()])?;

        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Ask the daemon whether monitoring is active.
    pub fn is_monitoring_active(&self) -> Result<bool, IpcError> {
        match self.request(Message::Status)? {
            REPLY_ACTIVE => Ok(true),
            REPLY_INACTIVE => Ok(false),
            other => Err(IpcError::UnexpectedReply(other)),
        }
    }
}
