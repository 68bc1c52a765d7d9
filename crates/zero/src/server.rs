//! Host server: accepts TCP connections and feeds requests to the engine.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::engine::{Engine, EngineHandle};
use crate::error::Error;

/// Request limits applied by the host server before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Maximum request body size in bytes (default: 1MB).
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1 MB
        }
    }
}

impl ServerConfig {
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }
}

/// Serve HTTP/1 connections from `listener` until `shutdown` resolves.
///
/// Each request is dispatched against the engine current at the time it
/// arrives, so [`EngineHandle::replace`] takes effect for new requests
/// without disturbing in-flight ones. Connections already accepted are
/// left to finish on their own.
///
/// Bodies larger than `config.max_body_size` are answered with 413 before
/// any handler runs. Handlers run on the blocking thread pool.
pub async fn serve<F>(
    listener: TcpListener,
    engine: EngineHandle,
    config: ServerConfig,
    shutdown: F,
) -> Result<(), Error>
where
    F: Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    zero_telemetry::log_listening!(addr = %addr, "listening");

    tokio::pin!(shutdown);
    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    zero_telemetry::log_connection_error!(error = %e, "accept failed");
                    continue;
                }
            },
        };

        let engine = engine.clone();
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let engine = engine.load();
                async move { Ok::<_, Infallible>(dispatch(engine, config, req).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                zero_telemetry::log_connection_error!(
                    peer = %peer,
                    error = %e,
                    "connection error"
                );
            }
        });
    }

    zero_telemetry::log_shutdown!(addr = %addr, "server stopped accepting connections");
    Ok(())
}

async fn dispatch(
    engine: Arc<Engine>,
    config: ServerConfig,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    // Check content-length before reading the body
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > config.max_body_size) {
        return body_too_large(config.max_body_size);
    }

    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, config.max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return body_too_large(config.max_body_size);
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to read request body");
            return error_response(StatusCode::BAD_REQUEST, "failed to read request body");
        }
    };

    let request = Request::from_parts(parts, body);
    match tokio::task::spawn_blocking(move || engine.handle(request)).await {
        Ok(response) => response,
        Err(e) => {
            zero_telemetry::log_handler_fault!(error = %e, "handler task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

fn body_too_large(limit: usize) -> Response<Full<Bytes>> {
    error_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        &format!("request body exceeds {limit} bytes"),
    )
}

/// `{"message": ...}` response for failures outside the handler chain.
fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "message": message }).to_string();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

impl Engine {
    /// Bind `addr` and serve this engine until Ctrl-C.
    pub async fn run(self, addr: SocketAddr) -> Result<(), Error> {
        self.run_with(addr, ServerConfig::default()).await
    }

    /// Like [`run`](Self::run) with explicit server limits.
    pub async fn run_with(self, addr: SocketAddr, config: ServerConfig) -> Result<(), Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        serve(listener, EngineHandle::new(self), config, ctrl_c()).await
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::handler;
    use crate::engine::Routes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn roundtrip(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        // Read until the server closes; a reset after an early response
        // still leaves what was received.
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        while let Ok(n) = stream.read(&mut chunk).await {
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8(buf).unwrap()
    }

    async fn start(
        engine: Engine,
        config: ServerConfig,
    ) -> (
        SocketAddr,
        oneshot::Sender<()>,
        tokio::task::JoinHandle<Result<(), Error>>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, EngineHandle::new(engine), config, async {
            let _ = rx.await;
        }));
        (addr, tx, server)
    }

    fn body_len_engine() -> Engine {
        let mut engine = Engine::new();
        engine
            .post(
                "/upload",
                [handler(|c| {
                    let len = c.body().len().to_string();
                    c.string(StatusCode::OK, len);
                })],
            )
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn serves_requests_until_shutdown() {
        let mut engine = Engine::new();
        engine
            .post(
                "/echo/:name",
                [handler(|c| {
                    let reply = format!("{}:{}", c.param("name"), String::from_utf8_lossy(c.body()));
                    c.string(StatusCode::OK, reply);
                })],
            )
            .unwrap();

        let (addr, tx, server) = start(engine, ServerConfig::default()).await;

        let response = roundtrip(
            addr,
            "POST /echo/zero HTTP/1.1\r\nHost: test\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.ends_with("zero:hi"), "{response}");

        let response = roundtrip(addr, "GET /missing HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found"), "{response}");

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn declared_oversized_body_is_413() {
        let config = ServerConfig::default().with_max_body_size(8);
        let (addr, _tx, _server) = start(body_len_engine(), config).await;

        let response = roundtrip(
            addr,
            "POST /upload HTTP/1.1\r\nHost: test\r\nContent-Length: 16\r\nConnection: close\r\n\r\n0123456789abcdef",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large"), "{response}");
        assert!(response.ends_with(r#"{"message":"request body exceeds 8 bytes"}"#), "{response}");
    }

    #[tokio::test]
    async fn chunked_oversized_body_is_413() {
        let config = ServerConfig::default().with_max_body_size(8);
        let (addr, _tx, _server) = start(body_len_engine(), config).await;

        let response = roundtrip(
            addr,
            "POST /upload HTTP/1.1\r\nHost: test\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n10\r\n0123456789abcdef\r\n0\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large"), "{response}");
    }

    #[tokio::test]
    async fn body_within_limit_is_dispatched() {
        let config = ServerConfig::default().with_max_body_size(8);
        let (addr, _tx, _server) = start(body_len_engine(), config).await;

        let response = roundtrip(
            addr,
            "POST /upload HTTP/1.1\r\nHost: test\r\nContent-Length: 8\r\nConnection: close\r\n\r\n01234567",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.ends_with("\r\n\r\n8"), "{response}");
    }

    #[tokio::test]
    async fn unrecovered_panic_is_500_and_server_keeps_serving() {
        let mut engine = body_len_engine();
        #[allow(clippy::panic)]
        engine
            .get("/boom", [handler(|_| panic!("no recovery installed"))])
            .unwrap();
        let (addr, _tx, _server) = start(engine, ServerConfig::default()).await;

        let response = roundtrip(addr, "GET /boom HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error"), "{response}");

        let response = roundtrip(
            addr,
            "POST /upload HTTP/1.1\r\nHost: test\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    }

    #[tokio::test]
    async fn handlers_run_off_the_runtime_thread() {
        let mut engine = Engine::new();
        engine
            .get(
                "/thread",
                [handler(|c| {
                    let id = format!("{:?}", std::thread::current().id());
                    c.string(StatusCode::OK, id);
                })],
            )
            .unwrap();
        let (addr, _tx, _server) = start(engine, ServerConfig::default()).await;

        let response = roundtrip(addr, "GET /thread HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        let runtime_thread = format!("{:?}", std::thread::current().id());
        assert!(!response.ends_with(&runtime_thread), "{response}");
    }

    #[tokio::test]
    async fn run_reports_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = Engine::new().run(addr).await.unwrap_err();
        assert!(matches!(err, Error::Bind { addr: a, .. } if a == addr));
    }
}
