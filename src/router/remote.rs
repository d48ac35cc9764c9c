//! HTTP client for an external agent router service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AgentRouter;
use crate::credentials::ResolvedCredentials;
use crate::error::RouterError;

/// Default router endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/route";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in a `RouterError::Status`.
const MAX_ERROR_BODY: usize = 200;

const WEATHER_KEY_HEADER: HeaderName = HeaderName::from_static("x-tomorrow-api-key");
const HF_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-hf-token");
const GROQ_KEY_HEADER: HeaderName = HeaderName::from_static("x-groq-api-key");

/// Where to reach the router service.
#[derive(Debug, Clone)]
pub struct RemoteRouterConfig {
    pub endpoint: String,
}

impl Default for RemoteRouterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Serialize)]
struct RouteRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct RouteResponse {
    response: String,
}

/// Router facade backed by `POST <endpoint>` on a remote service.
///
/// The three credentials travel as headers on every request; they are marked
/// sensitive so they stay out of debug output.
pub struct RemoteRouter {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl RemoteRouter {
    /// Build the facade. Fails if the endpoint or any key is malformed.
    pub fn new(
        config: &RemoteRouterConfig,
        credentials: &ResolvedCredentials,
    ) -> Result<Self, RouterError> {
        let endpoint = reqwest::Url::parse(&config.endpoint).map_err(|e| RouterError::Init {
            reason: format!("invalid router endpoint {:?}: {}", config.endpoint, e),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RouterError::Init {
                reason: format!("unsupported router endpoint scheme: {}", endpoint.scheme()),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            WEATHER_KEY_HEADER,
            header_value("TOMORROW_API_KEY", &credentials.weather_api_key)?,
        );
        headers.insert(HF_TOKEN_HEADER, header_value("HF_TOKEN", &credentials.hf_token)?);
        headers.insert(
            GROQ_KEY_HEADER,
            header_value("GROQ_API_KEY", &credentials.groq_api_key)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RouterError::Init {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

fn header_value(name: &str, secret: &SecretString) -> Result<HeaderValue, RouterError> {
    let raw = secret.expose_secret();
    if raw.chars().any(char::is_whitespace) {
        return Err(RouterError::Init {
            reason: format!("{} contains whitespace", name),
        });
    }
    let mut value = HeaderValue::from_str(raw).map_err(|_| RouterError::Init {
        reason: format!("{} is not a valid header value", name),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

#[async_trait]
impl AgentRouter for RemoteRouter {
    fn name(&self) -> &str {
        "remote"
    }

    async fn route(&self, query: &str) -> Result<String, RouterError> {
        debug!(endpoint = %self.endpoint, chars = query.chars().count(), "Routing query");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RouteRequest { query })
            .send()
            .await
            .map_err(|e| RouterError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RouterError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body: RouteResponse =
            response
                .json()
                .await
                .map_err(|e| RouterError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    use super::*;

    fn credentials(weather: &str) -> ResolvedCredentials {
        ResolvedCredentials {
            weather_api_key: SecretString::from(weather),
            hf_token: SecretString::from("hf-test"),
            groq_api_key: SecretString::from("groq-test"),
        }
    }

    async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{port}/route")
    }

    fn router_for(endpoint: String) -> RemoteRouter {
        RemoteRouter::new(&RemoteRouterConfig { endpoint }, &credentials("tmr-test")).unwrap()
    }

    #[tokio::test]
    async fn forwards_query_and_credentials() {
        async fn handler(
            headers: AxumHeaders,
            Json(body): Json<serde_json::Value>,
        ) -> Json<serde_json::Value> {
            let seen = format!(
                "{}|{}|{}|{}",
                body["query"].as_str().unwrap_or_default(),
                headers["x-tomorrow-api-key"].to_str().unwrap(),
                headers["x-hf-token"].to_str().unwrap(),
                headers["x-groq-api-key"].to_str().unwrap(),
            );
            Json(serde_json::json!({ "response": seen }))
        }

        let endpoint = spawn(Router::new().route("/route", post(handler))).await;
        let answer = router_for(endpoint).route("weather in Oslo").await.unwrap();
        assert_eq!(answer, "weather in Oslo|tmr-test|hf-test|groq-test");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/route",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
        );
        let endpoint = spawn(app).await;

        let err = router_for(endpoint).route("hi").await.unwrap_err();
        match err {
            RouterError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let app = Router::new().route("/route", post(|| async { "plain text" }));
        let endpoint = spawn(app).await;

        let err = router_for(endpoint).route("hi").await.unwrap_err();
        assert!(matches!(err, RouterError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_request_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = router_for(format!("http://127.0.0.1:{port}/route"))
            .route("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::RequestFailed { .. }));
    }

    #[test]
    fn rejects_malformed_key() {
        let result = RemoteRouter::new(&RemoteRouterConfig::default(), &credentials("bad key"));
        assert!(matches!(result, Err(RouterError::Init { .. })));

        let result = RemoteRouter::new(&RemoteRouterConfig::default(), &credentials("bad\u{7f}"));
        assert!(matches!(result, Err(RouterError::Init { .. })));
    }

    #[test]
    fn rejects_bad_endpoint() {
        let config = RemoteRouterConfig {
            endpoint: "not a url".to_string(),
        };
        assert!(matches!(
            RemoteRouter::new(&config, &credentials("ok")),
            Err(RouterError::Init { .. })
        ));

        let config = RemoteRouterConfig {
            endpoint: "ftp://example.com/route".to_string(),
        };
        assert!(matches!(
            RemoteRouter::new(&config, &credentials("ok")),
            Err(RouterError::Init { .. })
        ));
    }

    #[test]
    fn default_endpoint_builds() {
        let router = RemoteRouter::new(&RemoteRouterConfig::default(), &credentials("ok")).unwrap();
        assert_eq!(router.endpoint(), DEFAULT_ENDPOINT);
    }
}
