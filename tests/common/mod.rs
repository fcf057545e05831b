//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use hopper::config::ForwardMode;
use hopper::http::{routes, HopState};
use hopper::{ServerError, ServerState, Telemetry};

/// Read the request line and headers.
async fn read_request_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// Value of a header in a raw request head (case-insensitive name).
pub fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

/// Start a backend whose reply is computed from the raw request head.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_request_head(&mut socket).await;
                        let (status, body) = f(head).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a backend that always returns `response`.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    start_programmable_backend(addr, move |_| async move { (200, response.to_string()) }).await;
}

/// Start a backend that answers after `delay`.
pub async fn start_slow_backend(addr: SocketAddr, delay: Duration, response: &'static str) {
    start_programmable_backend(addr, move |_| async move {
        tokio::time::sleep(delay).await;
        (200, response.to_string())
    })
    .await;
}

/// A running hopper node.
pub struct Hop {
    pub server: Arc<ServerState>,
    pub task: JoinHandle<Result<(), ServerError>>,
}

/// Start a hopper node on `addr` and wait until it accepts connections.
pub async fn start_hop(addr: SocketAddr, mode: ForwardMode) -> Hop {
    start_hop_with_base(addr, mode, CancellationToken::new()).await
}

/// Like [`start_hop`], with the caller holding the server's base token.
pub async fn start_hop_with_base(
    addr: SocketAddr,
    mode: ForwardMode,
    base: CancellationToken,
) -> Hop {
    let mut server = ServerState::new(base, addr.to_string());
    server.mount(routes(HopState::new(Arc::new(Telemetry::disabled()), mode)));
    let server = Arc::new(server);

    let task = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };
    wait_until_listening(addr).await;

    Hop { server, task }
}

/// Poll until something accepts TCP connections on `addr`.
pub async fn wait_until_listening(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("nothing listening on {}", addr);
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
