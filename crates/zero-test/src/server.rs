//! TestServer: in-process HTTP test harness.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use zero::{Engine, EngineHandle, ServerConfig};

/// Errors from TestServer operations.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server error: {0}")]
    Server(#[from] zero::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// In-process test harness.
///
/// Serves an engine on a random loopback port and provides HTTP request
/// helpers. The server stops when the harness is dropped.
pub struct TestServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the served engine, for swapping in a replacement.
    engine: EngineHandle,
    /// HTTP client for making requests.
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), zero::Error>>>,
}

impl TestServer {
    /// Start serving `engine`.
    ///
    /// The listener is bound before this returns, so requests can be made
    /// immediately.
    pub async fn start(engine: Engine) -> Result<Self, TestError> {
        Self::start_with(engine, ServerConfig::default()).await
    }

    /// Start serving `engine` with explicit server limits.
    pub async fn start_with(engine: Engine, config: ServerConfig) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let engine = EngineHandle::new(engine);

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(zero::server::serve(listener, engine.clone(), config, async {
            let _ = rx.await;
        }));

        Ok(TestServer {
            addr,
            engine,
            client: reqwest::Client::new(),
            shutdown: Some(tx),
            task: Some(task),
        })
    }

    /// Get the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the base URL of the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Handle to the served engine.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Make a GET request to the given path.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, TestError> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a POST request to the given path.
    pub async fn post(&self, path: &str, body: &str) -> Result<reqwest::Response, TestError> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await?)
    }

    /// Make a request with any method.
    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::Response, TestError> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.request(method, &url).send().await?)
    }

    /// Start building a request with any method, for custom headers.
    pub fn build(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url(), path);
        self.client.request(method, url)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    pub async fn shutdown(mut self) -> Result<(), TestError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
