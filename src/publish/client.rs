use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Aspect name that stands for a public post.
pub const PUBLIC: &str = "public";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("Request timed out after 30s")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Invalid pod URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Post rejected: {0}")]
    Rejected(String),
}

/// Who a post is addressed to: `["public"]` or a list of aspect ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audience {
    aspects: Vec<String>,
}

impl Audience {
    /// An empty list means public.
    pub fn new(aspects: Vec<String>) -> Self {
        if aspects.is_empty() {
            Self::public()
        } else {
            Self { aspects }
        }
    }

    pub fn public() -> Self {
        Self {
            aspects: vec![PUBLIC.to_string()],
        }
    }

    /// Only the single-entry list `["public"]` is public.
    pub fn is_public(&self) -> bool {
        matches!(self.aspects.as_slice(), [only] if only.eq_ignore_ascii_case(PUBLIC))
    }

    pub fn aspects(&self) -> &[String] {
        &self.aspects
    }
}

impl Default for Audience {
    fn default() -> Self {
        Self::public()
    }
}

/// Delivers a formatted message to the remote network.
///
/// One call is one attempt; implementations must not retry internally.
#[allow(async_fn_in_trait)]
pub trait Poster {
    async fn post(&self, message: &str, audience: &Audience) -> Result<(), PostError>;
}

/// Pod address and access token.
#[derive(Debug)]
pub struct PodCredentials {
    pub pod_url: Url,
    pub access_token: SecretString,
}

#[derive(Serialize)]
struct PostPayload<'a> {
    body: &'a str,
    public: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    aspects: Vec<&'a str>,
}

/// Posts to a diaspora* pod through its `/api/v1/posts` endpoint.
pub struct PodClient {
    client: reqwest::Client,
    endpoint: Url,
    access_token: SecretString,
}

impl PodClient {
    pub fn new(client: reqwest::Client, credentials: &PodCredentials) -> Result<Self, PostError> {
        // `join` replaces the last path segment unless the base ends in '/'
        let mut base = credentials.pod_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("api/v1/posts")?;
        tracing::debug!(endpoint = %endpoint, "Configured pod client");

        Ok(Self {
            client,
            endpoint,
            access_token: SecretString::from(credentials.access_token.expose_secret().to_string()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Poster for PodClient {
    async fn post(&self, message: &str, audience: &Audience) -> Result<(), PostError> {
        let public = audience.is_public();
        let payload = PostPayload {
            body: message,
            public,
            aspects: if public {
                Vec::new()
            } else {
                audience.aspects().iter().map(String::as_str).collect()
            },
        };

        let request = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.access_token.expose_secret())
            .json(&payload);

        let response = tokio::time::timeout(REQUEST_TIMEOUT, request.send())
            .await
            .map_err(|_| PostError::Timeout)?
            .map_err(PostError::Network)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let reason = response.text().await.unwrap_or_default();
            return Err(PostError::Rejected(reason));
        }
        if !status.is_success() {
            return Err(PostError::HttpStatus(status.as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(url: &str) -> PodCredentials {
        PodCredentials {
            pod_url: Url::parse(url).unwrap(),
            access_token: SecretString::from("token-123".to_string()),
        }
    }

    #[test]
    fn test_endpoint_keeps_pod_path() {
        let client = reqwest::Client::new();
        let pod = PodClient::new(client.clone(), &credentials("https://pod.example")).unwrap();
        assert_eq!(pod.endpoint().as_str(), "https://pod.example/api/v1/posts");

        let pod = PodClient::new(client, &credentials("https://example.org/diaspora")).unwrap();
        assert_eq!(
            pod.endpoint().as_str(),
            "https://example.org/diaspora/api/v1/posts"
        );
    }

    #[test]
    fn test_audience_defaults_to_public() {
        assert!(Audience::new(vec![]).is_public());
        assert!(Audience::new(vec!["Public".into()]).is_public());
        assert!(!Audience::new(vec!["12".into(), "34".into()]).is_public());
    }

    #[test]
    fn test_public_mixed_with_aspects_is_not_public() {
        let audience = Audience::new(vec!["public".into(), "12".into()]);
        assert!(!audience.is_public());
        assert_eq!(audience.aspects(), ["public", "12"]);
    }

    #[test]
    fn test_credentials_debug_masks_token() {
        let debug_output = format!("{:?}", credentials("https://pod.example"));
        assert!(!debug_output.contains("token-123"));
    }

    #[tokio::test]
    async fn test_public_post() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/posts"))
            .and(header("Authorization", "Bearer token-123"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let pod = PodClient::new(reqwest::Client::new(), &credentials(&mock_server.uri())).unwrap();
        pod.post("### Hello", &Audience::public()).await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["body"], "### Hello");
        assert_eq!(body["public"], true);
        assert!(body.get("aspects").is_none());
    }

    #[tokio::test]
    async fn test_aspect_post() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let pod = PodClient::new(reqwest::Client::new(), &credentials(&mock_server.uri())).unwrap();
        let audience = Audience::new(vec!["7".into(), "9".into()]);
        pod.post("msg", &audience).await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["public"], false);
        assert_eq!(body["aspects"], serde_json::json!(["7", "9"]));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let pod = PodClient::new(reqwest::Client::new(), &credentials(&mock_server.uri())).unwrap();
        match pod.post("msg", &Audience::public()).await.unwrap_err() {
            PostError::HttpStatus(503) => {}
            e => panic!("Expected HttpStatus(503), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_unprocessable_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("body too long"))
            .mount(&mock_server)
            .await;

        let pod = PodClient::new(reqwest::Client::new(), &credentials(&mock_server.uri())).unwrap();
        match pod.post("msg", &Audience::public()).await.unwrap_err() {
            PostError::Rejected(reason) => assert_eq!(reason, "body too long"),
            e => panic!("Expected Rejected, got {:?}", e),
        }
    }
}
