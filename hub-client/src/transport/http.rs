//! reqwest-backed transport.

use async_trait::async_trait;
use serde_json::Value;

use super::{Method, Request, Transport, TransportError};
use crate::config::ApiConfig;

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connection(e.to_string())
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// JSON-over-HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport honoring the timeout and user agent in `config`.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Value, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.uri);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::new(&ApiConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn get_decodes_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5, "name": "a"})))
            .expect(1)
            .mount(&server)
            .await;

        let body = transport()
            .execute(Request::get(format!("{}/items/5", server.uri())))
            .await
            .unwrap();

        assert_eq!(body, json!({"id": 5, "name": "a"}));
    }

    #[tokio::test]
    async fn patch_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/items/7"))
            .and(body_json(json!({"name": "y"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "y"})))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::new(Method::Patch, format!("{}/items/7", server.uri()))
            .with_body(json!({"name": "y"}));
        let body = transport().execute(request).await.unwrap();

        assert_eq!(body["name"], "y");
    }

    #[tokio::test]
    async fn empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/items/7"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let body = transport()
            .execute(Request::delete(format!("{}/items/7", server.uri())))
            .await
            .unwrap();

        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let result = transport()
            .execute(Request::get(format!("{}/items/1", server.uri())))
            .await;

        match result {
            Err(TransportError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "Not Found");
            }
            other => panic!("Expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = transport()
            .execute(Request::get(format!("{}/items", server.uri())))
            .await;

        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_connection_error() {
        // Port 9 (discard) is closed on test machines.
        let result = transport().execute(Request::get("http://127.0.0.1:9/items")).await;
        assert!(matches!(
            result,
            Err(TransportError::Connection(_) | TransportError::Request(_))
        ));
    }
}
