// Connection handling module
// Accepts a single TCP connection and serves it with hyper

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.config.logging.access_log {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, Arc::clone(state), Arc::clone(conn_counter));
}

/// Serve one connection in a spawned task.
///
/// With `keep_alive_timeout > 0` the connection stays open between
/// requests and is closed once no request headers arrive for
/// `keep_alive_timeout` seconds. Without keep-alive, headers must arrive
/// within `read_timeout` and the connection is bounded by
/// `max(read_timeout, write_timeout)` seconds.
/// The connection counter is decremented when the task finishes.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new());

        let lifetime = if performance.keep_alive_timeout > 0 {
            builder
                .keep_alive(true)
                .header_read_timeout(Duration::from_secs(performance.keep_alive_timeout));
            None
        } else {
            builder
                .keep_alive(false)
                .header_read_timeout(Duration::from_secs(performance.read_timeout));
            Some(Duration::from_secs(std::cmp::max(
                performance.read_timeout,
                performance.write_timeout,
            )))
        };

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move { handler::handle_request(req, state, peer_addr).await }
            }),
        );

        let outcome = match lifetime {
            Some(limit) => tokio::time::timeout(limit, conn).await,
            None => Ok(conn.await),
        };

        match outcome {
            Ok(Ok(())) => {}
            // idle keep-alive connection reached its header read timeout
            Ok(Err(err)) if err.is_timeout() => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    lifetime.map_or(0, |d| d.as_secs())
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Overrides};
    use crate::server::create_reusable_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn limited_state(max_connections: Option<u64>) -> Arc<AppState> {
        let mut cfg =
            Config::load_from("this-config-file-does-not-exist", &Overrides::default()).unwrap();
        cfg.logging.access_log = false;
        cfg.performance.max_connections = max_connections;
        Arc::new(AppState::from_config(cfg).unwrap())
    }

    async fn connected_pair(listener: &TcpListener) -> (TcpStream, TcpStream, SocketAddr) {
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        (client, server, peer)
    }

    #[tokio::test]
    async fn test_rejected_connection_restores_counter() {
        let state = limited_state(Some(1));
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let (mut client, server, peer) = connected_pair(&listener).await;

        let counter = Arc::new(AtomicUsize::new(1));
        accept_connection(server, peer, &state, &counter);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_served_connection_releases_counter() {
        let state = limited_state(Some(1));
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let (mut client, server, peer) = connected_pair(&listener).await;

        let counter = Arc::new(AtomicUsize::new(0));
        accept_connection(server, peer, &state, &counter);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        client
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.starts_with(b"HTTP/1.1 200 OK"));

        for _ in 0..100 {
            if counter.load(Ordering::SeqCst) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
