//! Remote-debug attach listener.
//!
//! Opened once at startup on `debug.host:debug.port` (default
//! `0.0.0.0:5678`) and kept open until shutdown. The port is published by
//! the devcontainer so an editor on the host can find the process.
//!
//! # Wire format
//!
//! Newline-delimited. On connect the listener sends one JSON handshake:
//!
//! ```text
//! {"event":"attached","pid":4242,"process":"codebox","version":"0.1.0"}
//! ```
//!
//! The client then attaches a native debugger (lldb/gdb) to `pid`. Until
//! it disconnects it may send:
//!
//! | line     | reply                          |
//! |----------|--------------------------------|
//! | `ping`   | `pong`                         |
//! | `info`   | the handshake again            |
//! | `detach` | connection closed              |
//! | other    | `{"event":"error",...}`        |

use std::net::SocketAddr;

use codebox_core::{DebugConfig, ServiceHandle, ServiceState, ShutdownSignal};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// First line sent to every attaching client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Handshake {
    /// Always `"attached"`.
    pub event: &'static str,
    /// Process id to attach the debugger to.
    pub pid: u32,
    /// Executable name.
    pub process: String,
    /// Crate version.
    pub version: &'static str,
}

impl Handshake {
    /// Handshake describing the current process.
    pub fn current() -> Self {
        let process = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "codebox".to_string());

        Self {
            event: "attached",
            pid: std::process::id(),
            process,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        line.push('\n');
        line
    }
}

/// Observes how many clients have attached so far.
#[derive(Clone, Debug)]
pub struct AttachWatcher {
    rx: watch::Receiver<u64>,
}

impl AttachWatcher {
    /// Number of clients that have attached since startup.
    pub fn count(&self) -> u64 {
        *self.rx.borrow()
    }

    /// Resolve when at least one client has attached.
    pub async fn first_client(mut self) {
        let _ = self.rx.wait_for(|n| *n > 0).await;
    }
}

/// A bound debug listener, not yet accepting.
pub struct DebugListener {
    listener: TcpListener,
    handle: ServiceHandle,
    attached: watch::Sender<u64>,
}

impl DebugListener {
    /// Bind the listener socket.
    pub async fn bind(config: &DebugConfig, handle: ServiceHandle) -> Result<Self> {
        let addr = config.bind_string();
        handle.set_state(ServiceState::Starting);

        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(source) => {
                handle.set_state(ServiceState::Failed(source.to_string()));
                return Err(Error::Bind { addr, source });
            }
        };

        // Connections queue in the backlog from here on.
        handle.set_state(ServiceState::Ready);
        let (attached, _rx) = watch::channel(0);
        Ok(Self {
            listener,
            handle,
            attached,
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Error::Debug)
    }

    /// Watch attach events.
    pub fn watcher(&self) -> AttachWatcher {
        AttachWatcher {
            rx: self.attached.subscribe(),
        }
    }

    /// Accept clients until `shutdown` fires.
    pub async fn run(self, shutdown: ShutdownSignal) {
        let Self {
            listener,
            handle,
            attached,
        } = self;

        let addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();
        info!(%addr, pid = std::process::id(), "Debug listener waiting for attach");

        let handshake = Handshake::current();
        let stop = shutdown.clone().wait();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        attached.send_modify(|n| *n += 1);
                        info!(%peer, "Debugger client attached");
                        tokio::spawn(serve_client(stream, peer, handshake.clone(), shutdown.clone()));
                    }
                    Err(e) => warn!(error = %e, "Debug listener accept failed"),
                },
            }
        }

        handle.set_state(ServiceState::Stopping);
        drop(listener);
        handle.set_state(ServiceState::Stopped);
        info!("Debug listener closed");
    }
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    handshake: Handshake,
    shutdown: ShutdownSignal,
) {
    if let Err(e) = converse(stream, &handshake, shutdown).await {
        debug!(%peer, error = %e, "Debugger client connection ended with error");
    }
    info!(%peer, "Debugger client detached");
}

async fn converse(
    stream: TcpStream,
    handshake: &Handshake,
    shutdown: ShutdownSignal,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(handshake.to_line().as_bytes()).await?;

    let stop = shutdown.wait();
    tokio::pin!(stop);

    loop {
        let line = tokio::select! {
            _ = &mut stop => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };

        match reply(line.trim(), handshake) {
            Reply::Line(text) => send(&mut write, &text).await?,
            Reply::Close => return Ok(()),
            Reply::Nothing => {}
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Line(String),
    Close,
    Nothing,
}

fn reply(command: &str, handshake: &Handshake) -> Reply {
    match command {
        "" => Reply::Nothing,
        "ping" => Reply::Line("pong\n".to_string()),
        "info" => Reply::Line(handshake.to_line()),
        "detach" => Reply::Close,
        other => {
            let body = serde_json::json!({
                "event": "error",
                "message": "unknown command",
                "command": other,
            });
            Reply::Line(format!("{body}\n"))
        }
    }
}

async fn send<W: AsyncWrite + Unpin>(write: &mut W, text: &str) -> std::io::Result<()> {
    write.write_all(text.as_bytes()).await?;
    write.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use codebox_core::Shutdown;
    use std::time::Duration;

    fn local_config() -> DebugConfig {
        DebugConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..DebugConfig::default()
        }
    }

    #[test]
    fn test_handshake_line() {
        let hs = Handshake::current();
        let line = hs.to_line();
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["event"], "attached");
        assert_eq!(value["pid"], std::process::id());
    }

    #[test]
    fn test_replies() {
        let hs = Handshake::current();
        assert_eq!(reply("ping", &hs), Reply::Line("pong\n".into()));
        assert_eq!(reply("info", &hs), Reply::Line(hs.to_line()));
        assert_eq!(reply("detach", &hs), Reply::Close);
        assert_eq!(reply("", &hs), Reply::Nothing);
        match reply("step", &hs) {
            Reply::Line(text) => assert!(text.contains("unknown command")),
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_attach_handshake_and_ping() {
        let handle = ServiceHandle::new("debug");
        let listener = DebugListener::bind(&local_config(), handle.clone())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let watcher = listener.watcher();
        let shutdown = Shutdown::new();
        let task = tokio::spawn(listener.run(shutdown.signal()));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        let hello = lines.next_line().await.unwrap().unwrap();
        let hello: serde_json::Value = serde_json::from_str(&hello).unwrap();
        assert_eq!(hello["pid"], std::process::id());

        write.write_all(b"ping\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "pong");

        tokio::time::timeout(Duration::from_secs(5), watcher.clone().first_client())
            .await
            .unwrap();
        assert_eq!(watcher.count(), 1);
        assert_eq!(handle.state(), ServiceState::Ready);

        shutdown.trigger();
        task.await.unwrap();
        assert_eq!(handle.state(), ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_detach_closes_connection() {
        let listener = DebugListener::bind(&local_config(), ServiceHandle::new("debug"))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let task = tokio::spawn(listener.run(shutdown.signal()));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        lines.next_line().await.unwrap().unwrap();

        write.write_all(b"detach\n").await.unwrap();
        assert!(lines.next_line().await.unwrap().is_none());

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_conflict_marks_failed() {
        let first = DebugListener::bind(&local_config(), ServiceHandle::new("debug"))
            .await
            .unwrap();
        let taken = DebugConfig {
            port: first.local_addr().unwrap().port(),
            ..local_config()
        };

        let handle = ServiceHandle::new("debug");
        let result = DebugListener::bind(&taken, handle.clone()).await;
        assert!(matches!(result, Err(Error::Bind { .. })));
        assert!(matches!(handle.state(), ServiceState::Failed(_)));
    }
}
