//! REST client for a node's transaction endpoints.
//!
//! Status lookups go to `GET /transactionStatus/{hash}` and announcements to
//! `PUT /transactions`. The node answers an unknown hash with HTTP 404 and
//! a `ResourceNotFound` code; that answer is mapped to
//! [`StatusLookup::NotFound`] and everything else that is not a status is
//! reported as a [`SourceError`].

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use watcher_config::NodeConfig;
use watcher_types::{
	SignedPayload, SourceError, StatusLookup, StatusSource, SubmissionAck, Submitter,
	TransactionHash, TransactionStatus, RESOURCE_NOT_FOUND,
};

/// Error body returned by the node.
#[derive(Debug, Default, Deserialize)]
struct NodeErrorBody {
	#[serde(default)]
	code: String,
	#[serde(default)]
	message: String,
}

/// Client for one node's REST API.
#[derive(Debug, Clone)]
pub struct NodeClient {
	client: reqwest::Client,
	base_url: Url,
}

impl NodeClient {
	/// Creates a client for the node at `base_url`.
	pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, SourceError> {
		let mut base_url = Url::parse(base_url)
			.map_err(|e| SourceError::Transport(format!("Invalid node URL: {}", e)))?;

		// Url::join drops the last segment unless the path ends with a slash
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());
			base_url.set_path(&path);
		}

		let client = reqwest::Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| SourceError::Transport(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self { client, base_url })
	}

	pub fn from_config(config: &NodeConfig) -> Result<Self, SourceError> {
		Self::new(&config.url, config.request_timeout())
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
		self.base_url
			.join(path)
			.map_err(|e| SourceError::Transport(format!("Invalid endpoint {}: {}", path, e)))
	}
}

#[async_trait]
impl StatusSource for NodeClient {
	async fn query(&self, hash: &TransactionHash) -> Result<StatusLookup, SourceError> {
		let url = self.endpoint(&format!("transactionStatus/{}", hash))?;

		let response = self
			.client
			.get(url)
			.header("Content-Type", "application/json")
			.send()
			.await
			.map_err(|e| SourceError::Transport(format!("Failed to query status: {}", e)))?;

		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| SourceError::Transport(format!("Failed to read status body: {}", e)))?;

		if status == StatusCode::NOT_FOUND {
			let error: NodeErrorBody = serde_json::from_str(&body).unwrap_or_default();
			if error.code == RESOURCE_NOT_FOUND {
				debug!(tx_hash = %hash.short(), "Status not yet available");
				return Ok(StatusLookup::NotFound);
			}
			return Err(SourceError::UnexpectedResponse {
				status: status.as_u16(),
				body,
			});
		}

		if !status.is_success() {
			return Err(SourceError::UnexpectedResponse {
				status: status.as_u16(),
				body,
			});
		}

		let value: serde_json::Value =
			serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))?;

		// Some nodes answer 200 with a not-found code instead of a 404
		if value.get("code").and_then(|c| c.as_str()) == Some(RESOURCE_NOT_FOUND) {
			debug!(tx_hash = %hash.short(), "Status not yet available");
			return Ok(StatusLookup::NotFound);
		}

		let status: TransactionStatus =
			serde_json::from_value(value).map_err(|e| SourceError::Decode(e.to_string()))?;

		Ok(StatusLookup::Found(status))
	}
}

#[async_trait]
impl Submitter for NodeClient {
	async fn submit(&self, payload: &SignedPayload) -> Result<SubmissionAck, SourceError> {
		let url = self.endpoint("transactions")?;
		let body = serde_json::json!({ "payload": payload.payload });

		let response = self
			.client
			.put(url)
			.json(&body)
			.send()
			.await
			.map_err(|e| SourceError::Transport(format!("Failed to announce transaction: {}", e)))?;

		let status = response.status();
		let text = response
			.text()
			.await
			.map_err(|e| SourceError::Transport(format!("Failed to read announce body: {}", e)))?;
		let node_body: NodeErrorBody = serde_json::from_str(&text).unwrap_or_default();

		if status.is_success() {
			info!(tx_hash = %payload.hash.short(), "Announced transaction");
			return Ok(SubmissionAck::accepted(node_body.message));
		}

		if status.is_client_error() {
			warn!(
				tx_hash = %payload.hash.short(),
				code = %node_body.code,
				"Node rejected transaction: {}",
				node_body.message
			);
			return Ok(SubmissionAck::rejected(node_body.code, node_body.message));
		}

		Err(SourceError::UnexpectedResponse {
			status: status.as_u16(),
			body: text,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use watcher_types::StatusGroup;
	use wiremock::matchers::{body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const HASH: &str = "3A1B9F8A5C4E2D7B6A0F1E2D3C4B5A69788796A5B4C3D2E1F00112233445566A";

	fn hash() -> TransactionHash {
		HASH.parse().unwrap()
	}

	async fn client(server: &MockServer) -> NodeClient {
		NodeClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
	}

	#[tokio::test]
	async fn test_query_found() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path(format!("/transactionStatus/{}", HASH)))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"group": "confirmed",
				"code": "Success",
				"hash": HASH,
				"deadline": "1000",
				"height": "55"
			})))
			.mount(&server)
			.await;

		let lookup = client(&server).await.query(&hash()).await.unwrap();
		let status = lookup.found().unwrap();
		assert_eq!(status.group, StatusGroup::Confirmed);
		assert_eq!(status.code, "Success");
		assert_eq!(status.height, Some(55));
	}

	#[tokio::test]
	async fn test_query_not_found_404() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path(format!("/transactionStatus/{}", HASH)))
			.respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
				"code": "ResourceNotFound",
				"message": format!("no resource exists with id '{}'", HASH)
			})))
			.mount(&server)
			.await;

		let lookup = client(&server).await.query(&hash()).await.unwrap();
		assert_eq!(lookup, StatusLookup::NotFound);
	}

	#[tokio::test]
	async fn test_query_not_found_in_success_body() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"code": "ResourceNotFound",
				"message": "no resource"
			})))
			.mount(&server)
			.await;

		let lookup = client(&server).await.query(&hash()).await.unwrap();
		assert_eq!(lookup, StatusLookup::NotFound);
	}

	#[tokio::test]
	async fn test_query_plain_404_is_an_error() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(404).set_body_string("no route"))
			.mount(&server)
			.await;

		let err = client(&server).await.query(&hash()).await.unwrap_err();
		assert!(matches!(err, SourceError::UnexpectedResponse { status: 404, .. }));
	}

	#[tokio::test]
	async fn test_query_server_error() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
			.mount(&server)
			.await;

		let err = client(&server).await.query(&hash()).await.unwrap_err();
		assert_eq!(
			err,
			SourceError::UnexpectedResponse {
				status: 503,
				body: "unavailable".to_string()
			}
		);
	}

	#[tokio::test]
	async fn test_query_connection_refused() {
		// Nothing listens on port 9 locally
		let client = NodeClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
		let err = client.query(&hash()).await.unwrap_err();
		assert!(matches!(err, SourceError::Transport(_)));
	}

	#[tokio::test]
	async fn test_query_respects_base_path() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path(format!("/node/transactionStatus/{}", HASH)))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"group": "unconfirmed",
				"code": "Success"
			})))
			.mount(&server)
			.await;

		let client =
			NodeClient::new(&format!("{}/node", server.uri()), Duration::from_secs(5)).unwrap();
		let lookup = client.query(&hash()).await.unwrap();
		assert_eq!(lookup.found().unwrap().group, StatusGroup::Unconfirmed);
	}

	#[tokio::test]
	async fn test_submit_accepted() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.and(path("/transactions"))
			.and(body_json(serde_json::json!({ "payload": "C001" })))
			.respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
				"message": "packet 9 was pushed to the network via /transactions"
			})))
			.expect(1)
			.mount(&server)
			.await;

		let payload = SignedPayload::new("C001", hash());
		let ack = client(&server).await.submit(&payload).await.unwrap();
		assert!(ack.accepted);
		assert!(ack.message.contains("pushed to the network"));
	}

	#[tokio::test]
	async fn test_submit_rejected() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.and(path("/transactions"))
			.respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
				"code": "InvalidArgument",
				"message": "payload has an invalid format"
			})))
			.mount(&server)
			.await;

		let ack = client(&server)
			.await
			.submit(&SignedPayload::new("00", hash()))
			.await
			.unwrap();
		assert!(!ack.accepted);
		assert_eq!(ack.code.as_deref(), Some("InvalidArgument"));
	}

	#[tokio::test]
	async fn test_submit_server_error() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;

		let err = client(&server)
			.await
			.submit(&SignedPayload::new("00", hash()))
			.await
			.unwrap_err();
		assert!(matches!(err, SourceError::UnexpectedResponse { status: 500, .. }));
	}
}
