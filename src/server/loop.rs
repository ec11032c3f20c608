// Server loop module
// Accepts connections until shutdown is signalled

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept connections on `listener` and serve each in its own task.
///
/// Returns once `shutdown` is notified. Connections already being served
/// finish on their own tasks.
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                logger::log_shutdown("Shutdown requested");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Overrides};
    use crate::server::create_reusable_listener;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;

    fn test_config() -> Config {
        let mut cfg =
            Config::load_from("this-config-file-does-not-exist", &Overrides::default()).unwrap();
        cfg.logging.access_log = false;
        cfg
    }

    fn spawn_server(cfg: Config) -> (SocketAddr, Arc<Notify>, JoinHandle<()>) {
        let state = Arc::new(AppState::from_config(cfg).unwrap());
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(start_server_loop(listener, state, Arc::clone(&shutdown)));
        (addr, shutdown, server)
    }

    async fn roundtrip(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8(response).unwrap()
    }

    /// Read one response off a connection that stays open, using Content-Length
    async fn read_response(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-response");
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + length {
                return String::from_utf8(buf).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_serves_page_over_tcp_and_shuts_down() {
        let (addr, shutdown, server) = spawn_server(test_config());

        let response = roundtrip(
            addr,
            "POST / HTTP/1.1\r\n\
             Host: localhost\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: 11\r\n\
             Connection: close\r\n\
             \r\n\
             theme=light",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "got: {response}");
        assert!(response.contains("text-bg-dark"));

        let response = roundtrip(
            addr,
            "PUT / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 405"), "got: {response}");

        shutdown.notify_one();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_over_limit_is_closed_without_response() {
        let mut cfg = test_config();
        cfg.performance.max_connections = Some(0);
        let (addr, shutdown, server) = spawn_server(cfg);

        // every rejection releases its slot, so each attempt is turned away the same way
        for _ in 0..2 {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let mut response = Vec::new();
            stream.read_to_end(&mut response).await.unwrap();
            assert!(response.is_empty());
        }

        shutdown.notify_one();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_keep_alive_connection_outlives_read_timeout() {
        let mut cfg = test_config();
        cfg.performance.read_timeout = 1;
        cfg.performance.write_timeout = 1;
        cfg.performance.keep_alive_timeout = 5;
        let (addr, shutdown, server) = spawn_server(cfg);

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /?theme=light HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let first = read_response(&mut stream).await;
        assert!(first.starts_with("HTTP/1.1 200 OK"), "got: {first}");

        tokio::time::sleep(Duration::from_millis(1500)).await;

        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut second = Vec::new();
        stream.read_to_end(&mut second).await.unwrap();
        let second = String::from_utf8(second).unwrap();
        assert!(second.starts_with("HTTP/1.1 200 OK"), "got: {second}");

        shutdown.notify_one();
        server.await.unwrap();
    }
}
