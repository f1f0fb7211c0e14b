//! Message-queue client (SQS query API).
//!
//! Form-encoded `Action=...` posts signed with SigV4, XML responses
//! parsed with [`crate::xml`] — the same transport style as the S3
//! client, so no AWS SDK dependency. `GetQueueUrl` and `CreateQueue`
//! are addressed to the service endpoint; `SendMessage` and
//! `GetQueueAttributes` are addressed to the queue URL itself.
//!
//! Queue attribute counts are point-in-time approximations and must
//! never be treated as exact.

use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::models::QueueDepth;
use crate::sigv4::{self, AwsCredentials, SigningRequest};

const SQS_API_VERSION: &str = "2012-11-05";

/// Result of a queue-URL lookup. A missing queue is an expected,
/// distinct outcome (it triggers creation); everything else is an error.
#[derive(Debug)]
pub enum QueueLookup {
    Found(String),
    Missing,
}

pub struct SqsClient {
    region: String,
    scheme: String,
    host: String,
    creds: AwsCredentials,
    http: reqwest::Client,
}

impl SqsClient {
    /// Build a client for one region, reading credentials from the
    /// environment.
    pub fn new(region: &str, endpoint_url: Option<&str>) -> Result<Self> {
        let creds = AwsCredentials::from_env()?;
        let (scheme, host) = match endpoint_url {
            Some(endpoint) => {
                let scheme = if endpoint.starts_with("http://") {
                    "http"
                } else {
                    "https"
                };
                let host = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/')
                    .to_string();
                (scheme.to_string(), host)
            }
            None => (
                "https".to_string(),
                format!("sqs.{}.amazonaws.com", region),
            ),
        };

        Ok(Self {
            region: region.to_string(),
            scheme,
            host,
            creds,
            http: reqwest::Client::new(),
        })
    }

    /// POST one signed query-API call and return `(status, body)`.
    /// Non-2xx responses are returned, not errored — callers decide
    /// which API error codes are expected outcomes.
    async fn call_raw(
        &self,
        host: &str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<(reqwest::StatusCode, String)> {
        let body = form_encode(params);
        let content_type = "application/x-www-form-urlencoded".to_string();

        let signed = sigv4::sign(
            &SigningRequest {
                method: "POST",
                host,
                canonical_uri: path,
                canonical_querystring: "",
                service: "sqs",
                region: &self.region,
                payload: body.as_bytes(),
                extra_headers: &[("content-type".to_string(), content_type.clone())],
            },
            &self.creds,
            Utc::now(),
        );

        let url = format!("{}://{}{}", self.scheme, host, path);
        let mut req = self
            .http
            .post(&url)
            .header("Authorization", &signed.authorization)
            .header("Content-Type", &content_type)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date);
        if let Some(ref token) = self.creds.session_token {
            req = req.header("x-amz-security-token", token);
        }

        let resp = req
            .body(body)
            .send()
            .await
            .with_context(|| format!("SQS request to {} failed", url))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        Ok((status, text))
    }

    /// Call against the service endpoint and bail on any API error.
    async fn call(&self, params: &[(String, String)]) -> Result<String> {
        let (status, body) = self.call_raw(&self.host, "/", params).await?;
        if !status.is_success() {
            bail!(
                "SQS call failed (HTTP {}): {}",
                status,
                body.chars().take(500).collect::<String>()
            );
        }
        Ok(body)
    }

    /// Call against a queue URL and bail on any API error.
    async fn call_queue(&self, queue_url: &str, params: &[(String, String)]) -> Result<String> {
        let (host, path) = split_queue_url(queue_url)?;
        let (status, body) = self.call_raw(&host, &path, params).await?;
        if !status.is_success() {
            bail!(
                "SQS call to {} failed (HTTP {}): {}",
                queue_url,
                status,
                body.chars().take(500).collect::<String>()
            );
        }
        Ok(body)
    }

    /// Look up a queue URL by name. A nonexistent queue is reported as
    /// [`QueueLookup::Missing`]; any other failure is an error.
    pub async fn get_queue_url(&self, queue_name: &str) -> Result<QueueLookup> {
        let params = vec![
            ("Action".to_string(), "GetQueueUrl".to_string()),
            ("QueueName".to_string(), queue_name.to_string()),
            ("Version".to_string(), SQS_API_VERSION.to_string()),
        ];
        let (status, body) = self.call_raw(&self.host, "/", &params).await?;

        if status.is_success() {
            let url = crate::xml::extract_value(&body, "QueueUrl")
                .context("SQS GetQueueUrl response had no QueueUrl")?;
            return Ok(QueueLookup::Found(url));
        }

        let code = crate::xml::extract_value(&body, "Code").unwrap_or_default();
        if is_queue_missing_code(&code) {
            Ok(QueueLookup::Missing)
        } else {
            bail!(
                "SQS GetQueueUrl failed (HTTP {}, code '{}') for queue '{}'",
                status,
                code,
                queue_name
            )
        }
    }

    /// Create a queue and return its URL.
    pub async fn create_queue(&self, queue_name: &str) -> Result<String> {
        let params = vec![
            ("Action".to_string(), "CreateQueue".to_string()),
            ("QueueName".to_string(), queue_name.to_string()),
            ("Version".to_string(), SQS_API_VERSION.to_string()),
        ];
        let body = self.call(&params).await?;
        crate::xml::extract_value(&body, "QueueUrl")
            .context("SQS CreateQueue response had no QueueUrl")
    }

    /// Send one message body to a queue.
    pub async fn send_message(&self, queue_url: &str, message_body: &str) -> Result<()> {
        let params = vec![
            ("Action".to_string(), "SendMessage".to_string()),
            ("MessageBody".to_string(), message_body.to_string()),
            ("Version".to_string(), SQS_API_VERSION.to_string()),
        ];
        self.call_queue(queue_url, &params).await?;
        Ok(())
    }

    /// Read the three approximate depth counters for a queue.
    pub async fn queue_attributes(&self, queue_url: &str) -> Result<QueueDepth> {
        let params = vec![
            ("Action".to_string(), "GetQueueAttributes".to_string()),
            (
                "AttributeName.1".to_string(),
                "ApproximateNumberOfMessages".to_string(),
            ),
            (
                "AttributeName.2".to_string(),
                "ApproximateNumberOfMessagesNotVisible".to_string(),
            ),
            (
                "AttributeName.3".to_string(),
                "ApproximateNumberOfMessagesDelayed".to_string(),
            ),
            ("Version".to_string(), SQS_API_VERSION.to_string()),
        ];
        let body = self.call_queue(queue_url, &params).await?;
        Ok(parse_queue_attributes(&body))
    }
}

/// Whether an SQS error code means "queue does not exist". The query
/// API reports `AWS.SimpleQueueService.NonExistentQueue`; newer
/// endpoints use `QueueDoesNotExist`.
fn is_queue_missing_code(code: &str) -> bool {
    code.contains("NonExistentQueue") || code.contains("QueueDoesNotExist")
}

/// Split a queue URL into `(host, path)` for signing.
fn split_queue_url(queue_url: &str) -> Result<(String, String)> {
    let rest = queue_url
        .strip_prefix("https://")
        .or_else(|| queue_url.strip_prefix("http://"))
        .with_context(|| format!("Queue URL has no scheme: {}", queue_url))?;
    match rest.find('/') {
        Some(pos) => Ok((rest[..pos].to_string(), rest[pos..].trim_end_matches('/').to_string())),
        None => Ok((rest.to_string(), "/".to_string())),
    }
}

/// Parse `GetQueueAttributes` response blocks into a [`QueueDepth`].
/// Absent counters default to zero.
fn parse_queue_attributes(xml: &str) -> QueueDepth {
    let mut depth = QueueDepth::default();
    for block in crate::xml::extract_blocks(xml, "Attribute") {
        let name = crate::xml::extract_value(block, "Name").unwrap_or_default();
        let value = crate::xml::extract_value(block, "Value")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        match name.as_str() {
            "ApproximateNumberOfMessages" => depth.visible = value,
            "ApproximateNumberOfMessagesNotVisible" => depth.not_visible = value,
            "ApproximateNumberOfMessagesDelayed" => depth.delayed = value,
            _ => {}
        }
    }
    depth
}

/// Form-encode parameters for a query-API POST body.
fn form_encode(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", sigv4::uri_encode(k), sigv4::uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
