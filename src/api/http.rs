use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::fmt;

use super::{ApiError, Backend, Endpoint, Method};

/// `Backend` over HTTP. Endpoint paths are resolved against `origin` the way a
/// browser resolves relative URLs against the page it was loaded from.
#[derive(Clone)]
pub struct HttpBackend {
    origin: Url,
    client: reqwest::Client,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpBackend")
            .field("origin", &self.origin.as_str())
            .finish()
    }
}

impl HttpBackend {
    pub fn new(origin: &str) -> anyhow::Result<Self> {
        let origin = Url::parse(origin)
            .map_err(|e| anyhow::anyhow!("Invalid backend URL '{}': {}", origin, e))?;
        if origin.cannot_be_a_base() {
            anyhow::bail!("Backend URL '{}' cannot be used as an origin", origin);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("stackprobe/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { origin, client })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        self.origin
            .join(path)
            .map_err(|e| ApiError::Transport(format!("invalid request URL {}: {}", path, e)))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn call(&self, endpoint: &Endpoint) -> Result<Value, ApiError> {
        let url = self.resolve(endpoint.path)?;

        let mut request = match endpoint.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };
        if let Some(body) = &endpoint.body {
            // Sets Content-Type: application/json
            request = request.json(body);
        }

        tracing::debug!("{:?} {}", endpoint.method, url);

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(error_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} answered {}", url, status);
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(error_chain(&e)))?;

        serde_json::from_slice(&body).map_err(|e| ApiError::Transport(e.to_string()))
    }
}

/// Flatten an error and its sources into one line, outermost first.
///
/// reqwest keeps the actual cause (refused connection, DNS failure, ...) in the
/// source chain and only prints a category plus the URL itself.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // hyper and reqwest sometimes repeat the inner message verbatim
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    async fn ping() -> Json<Value> {
        Json(serde_json::json!({ "message": "Pong!" }))
    }

    async fn add_item(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Json(serde_json::json!({ "received": body, "content_type": content_type }))
    }

    async fn broken() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn not_json() -> &'static str {
        "definitely not json"
    }

    async fn spawn_mock_server() -> (String, oneshot::Sender<()>) {
        let app = Router::new()
            .route("/api/ping", get(ping))
            .route("/api/add-item", post(add_item))
            .route("/api/get-latest-item", get(broken))
            .route("/plain", get(not_json));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server listener");
        let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("run mock server");
        });
        (format!("http://{address}"), shutdown_tx)
    }

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|inner| inner as &(dyn std::error::Error + 'static))
        }
    }

    #[test]
    fn test_error_chain_includes_every_cause() {
        let err = Layer(
            "error sending request",
            Some(Box::new(Layer(
                "client error (Connect)",
                Some(Box::new(Layer("Connection refused (os error 111)", None))),
            ))),
        );
        assert_eq!(
            error_chain(&err),
            "error sending request: client error (Connect): Connection refused (os error 111)"
        );
    }

    #[test]
    fn test_error_chain_skips_repeated_causes() {
        let err = Layer(
            "tcp connect error: Connection refused",
            Some(Box::new(Layer("Connection refused", None))),
        );
        assert_eq!(error_chain(&err), "tcp connect error: Connection refused");
    }

    #[test]
    fn test_rejects_unusable_origin() {
        assert!(HttpBackend::new("not a url").is_err());
        assert!(HttpBackend::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_paths_resolve_against_origin() {
        let backend = HttpBackend::new("http://example.test:8000/ignored/page").unwrap();
        let url = backend.resolve("/api/ping").unwrap();
        assert_eq!(url.as_str(), "http://example.test:8000/api/ping");
    }

    #[tokio::test]
    async fn test_get_returns_body_as_json() {
        let (base_url, shutdown) = spawn_mock_server().await;
        let backend = HttpBackend::new(&base_url).unwrap();

        let value = backend.call(&Endpoint::ping()).await.unwrap();
        assert_eq!(value, serde_json::json!({ "message": "Pong!" }));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_post_sends_json_name_body() {
        let (base_url, shutdown) = spawn_mock_server().await;
        let backend = HttpBackend::new(&base_url).unwrap();

        let value = backend
            .call(&Endpoint::add_item("TestItem-42"))
            .await
            .unwrap();
        assert_eq!(value["received"], serde_json::json!({ "name": "TestItem-42" }));
        assert_eq!(value["content_type"], "application/json");

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let (base_url, shutdown) = spawn_mock_server().await;
        let backend = HttpBackend::new(&base_url).unwrap();

        let err = backend.call(&Endpoint::get_latest_item()).await.unwrap_err();
        assert_eq!(err, ApiError::Http { status: 500 });

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_unparsable_body_is_transport_error() {
        let (base_url, shutdown) = spawn_mock_server().await;
        let backend = HttpBackend::new(&base_url).unwrap();
        let endpoint = Endpoint {
            method: Method::Get,
            path: "/plain",
            body: None,
        };

        let err = backend.call(&endpoint).await.unwrap_err();
        match err {
            ApiError::Transport(message) => {
                assert!(message.contains("expected value"), "no parse cause in {:?}", message);
                assert!(message.contains("line 1 column 1"), "no parse position in {:?}", message);
            }
            other => panic!("expected transport error, got {:?}", other),
        }

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Grab a free port, then close it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(&format!("http://{address}")).unwrap();
        let err = backend.call(&Endpoint::ping()).await.unwrap_err();
        match err {
            ApiError::Transport(message) => {
                let lower = message.to_lowercase();
                assert!(
                    lower.contains("refused") || lower.contains("connect"),
                    "no connection cause in {:?}",
                    message
                );
                assert!(message.contains(&address.to_string()), "no URL in {:?}", message);
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
