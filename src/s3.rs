//! Object-storage client (S3 wire protocol).
//!
//! Talks to S3 (or an S3-compatible service such as MinIO or LocalStack
//! via a custom endpoint) using the REST API with AWS SigV4 signing —
//! see [`crate::sigv4`]. Implements the five operations the pipeline
//! needs: head-bucket, create-bucket, paginated `ListObjectsV2`,
//! put-object from a local file, and get-object to a local file.
//!
//! Listings are eventually consistent: a just-uploaded object may not
//! appear immediately, and callers must treat counts as approximate.

use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::models::ObjectInfo;
use crate::sigv4::{self, AwsCredentials, SigningRequest};

pub struct S3Client {
    bucket: String,
    region: String,
    /// `(scheme, host)` — virtual-hosted AWS host, or a custom endpoint.
    scheme: String,
    host: String,
    /// Custom endpoints use path-style addressing (`/bucket/key`).
    path_style: bool,
    creds: AwsCredentials,
    http: reqwest::Client,
}

impl S3Client {
    /// Build a client for one bucket, reading credentials from the
    /// environment.
    pub fn new(bucket: &str, region: &str, endpoint_url: Option<&str>) -> Result<Self> {
        let creds = AwsCredentials::from_env()?;
        let (scheme, host, path_style) = match endpoint_url {
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
                (scheme.to_string(), host, true)
            }
            None => (
                "https".to_string(),
                format!("{}.s3.{}.amazonaws.com", bucket, region),
                false,
            ),
        };

        Ok(Self {
            bucket: bucket.to_string(),
            region: region.to_string(),
            scheme,
            host,
            path_style,
            creds,
            http: reqwest::Client::new(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Canonical URI for an object key ("" addresses the bucket itself).
    fn canonical_uri(&self, key: &str) -> String {
        let encoded_key = key
            .split('/')
            .map(sigv4::uri_encode)
            .collect::<Vec<_>>()
            .join("/");
        match (self.path_style, key.is_empty()) {
            (true, true) => format!("/{}", self.bucket),
            (true, false) => format!("/{}/{}", self.bucket, encoded_key),
            (false, true) => "/".to_string(),
            (false, false) => format!("/{}", encoded_key),
        }
    }

    /// Send one signed request and return the response.
    async fn send(
        &self,
        method: reqwest::Method,
        key: &str,
        query: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<reqwest::Response> {
        let canonical_uri = self.canonical_uri(key);
        let canonical_querystring = sigv4::canonical_querystring(query);

        let signed = sigv4::sign(
            &SigningRequest {
                method: method.as_str(),
                host: &self.host,
                canonical_uri: &canonical_uri,
                canonical_querystring: &canonical_querystring,
                service: "s3",
                region: &self.region,
                payload: &body,
                extra_headers: &[],
            },
            &self.creds,
            Utc::now(),
        );

        let mut url = format!("{}://{}{}", self.scheme, self.host, canonical_uri);
        if !canonical_querystring.is_empty() {
            url.push('?');
            url.push_str(&canonical_querystring);
        }

        let mut req = self
            .http
            .request(method, &url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date);
        if let Some(ref token) = self.creds.session_token {
            req = req.header("x-amz-security-token", token);
        }
        if !body.is_empty() {
            req = req.body(body);
        }

        req.send()
            .await
            .with_context(|| format!("S3 request to s3://{}/{} failed", self.bucket, key))
    }

    /// Whether the bucket exists. `Ok(false)` only for a clean 404;
    /// any other failure of the existence check is an error.
    pub async fn bucket_exists(&self) -> Result<bool> {
        let resp = self
            .send(reqwest::Method::HEAD, "", &[], Vec::new())
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            bail!(
                "S3 HeadBucket failed (HTTP {}) for bucket '{}'",
                status,
                self.bucket
            )
        }
    }

    /// Create the bucket. Regions other than `us-east-1` need an
    /// explicit `LocationConstraint` body.
    pub async fn create_bucket(&self) -> Result<()> {
        let body = if self.region == "us-east-1" {
            Vec::new()
        } else {
            format!(
                "<CreateBucketConfiguration><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
                self.region
            )
            .into_bytes()
        };

        let resp = self.send(reqwest::Method::PUT, "", &[], body).await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "S3 CreateBucket failed (HTTP {}) for bucket '{}': {}",
                status,
                self.bucket,
                body.chars().take(500).collect::<String>()
            );
        }
        Ok(())
    }

    /// List all objects under a prefix, following `NextContinuationToken`
    /// pagination (`max-keys=1000` per page).
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), "1000".to_string()),
            ];
            if !prefix.is_empty() {
                query.push(("prefix".to_string(), prefix.to_string()));
            }
            if let Some(ref token) = continuation_token {
                query.push(("continuation-token".to_string(), token.clone()));
            }

            let resp = self
                .send(reqwest::Method::GET, "", &query, Vec::new())
                .await?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!(
                    "S3 ListObjectsV2 failed (HTTP {}): {}",
                    status,
                    body.chars().take(500).collect::<String>()
                );
            }

            let xml_body = resp.text().await?;
            let (page, is_truncated, next_token) = parse_list_response(&xml_body);
            objects.extend(page);

            if is_truncated {
                continuation_token = next_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    /// Upload a local file under `key`.
    pub async fn put_object(&self, local_path: &std::path::Path, key: &str) -> Result<()> {
        let body = std::fs::read(local_path)
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        let resp = self.send(reqwest::Method::PUT, key, &[], body).await?;
        if !resp.status().is_success() {
            let status = resp.status();
            bail!("S3 PutObject failed (HTTP {}) for key '{}'", status, key);
        }
        Ok(())
    }

    /// Download `key` to a local path, creating parent directories.
    pub async fn get_object(&self, key: &str, dest: &std::path::Path) -> Result<()> {
        let resp = self
            .send(reqwest::Method::GET, key, &[], Vec::new())
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            bail!("S3 GetObject failed (HTTP {}) for key '{}'", status, key);
        }

        let bytes = resp.bytes().await?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(dest, &bytes)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(())
    }
}

/// Strip leading/trailing slashes from a configured key prefix.
pub fn normalized_prefix(prefix: &str) -> String {
    prefix.trim().trim_matches('/').to_string()
}

/// Object key for a batch file: `prefix/filename`, or just the
/// filename when the prefix is empty.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let p = normalized_prefix(prefix);
    if p.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", p, file_name)
    }
}

/// Listing prefix for a directory-like scan: normalized and given a
/// trailing `/` when non-empty.
pub fn listing_prefix(prefix: &str) -> String {
    let p = normalized_prefix(prefix);
    if p.is_empty() {
        p
    } else {
        format!("{}/", p)
    }
}

/// Parse a `ListObjectsV2` XML response into objects plus pagination
/// state. Directory placeholder keys (trailing `/`) are skipped.
fn parse_list_response(xml: &str) -> (Vec<ObjectInfo>, bool, Option<String>) {
    let is_truncated = crate::xml::extract_value(xml, "IsTruncated")
        .map(|v| v == "true")
        .unwrap_or(false);
    let next_token = crate::xml::extract_value(xml, "NextContinuationToken");

    let mut objects = Vec::new();
    for block in crate::xml::extract_blocks(xml, "Contents") {
        let key = crate::xml::extract_value(block, "Key").unwrap_or_default();
        if key.is_empty() || key.ends_with('/') {
            continue;
        }
        let last_modified = crate::xml::extract_value(block, "LastModified")
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| chrono::DateTime::from_timestamp(0, 0).unwrap());

        objects.push(ObjectInfo { key, last_modified });
    }

    (objects, is_truncated, next_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_building_with_and_without_prefix() {
        assert_eq!(
            object_key("batches", "seed_batch_0001.csv"),
            "batches/seed_batch_0001.csv"
        );
        assert_eq!(
            object_key("/batches/", "seed_batch_0001.csv"),
            "batches/seed_batch_0001.csv"
        );
        assert_eq!(object_key("", "seed_batch_0001.csv"), "seed_batch_0001.csv");
    }

    #[test]
    fn listing_prefix_gets_trailing_slash() {
        assert_eq!(listing_prefix("output/html"), "output/html/");
        assert_eq!(listing_prefix("/output/html/"), "output/html/");
        assert_eq!(listing_prefix(""), "");
    }

    #[test]
    fn parses_paginated_list_response() {
        let xml = r#"<?xml version="1.0"?>
<ListBucketResult>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>token-1</NextContinuationToken>
  <Contents>
    <Key>output/html/a.zip</Key>
    <LastModified>2025-06-01T12:00:00.000Z</LastModified>
  </Contents>
  <Contents>
    <Key>output/html/</Key>
    <LastModified>2025-06-01T11:00:00.000Z</LastModified>
  </Contents>
  <Contents>
    <Key>output/html/b.zip</Key>
    <LastModified>2025-06-01T12:05:00.000Z</LastModified>
  </Contents>
</ListBucketResult>"#;

        let (objects, truncated, token) = parse_list_response(xml);
        assert!(truncated);
        assert_eq!(token.as_deref(), Some("token-1"));
        // Placeholder directory key skipped.
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "output/html/a.zip");
        assert_eq!(
            objects[1].last_modified,
            chrono::DateTime::parse_from_rfc3339("2025-06-01T12:05:00Z").unwrap()
        );
    }

    #[test]
    fn final_page_has_no_token() {
        let xml = "<ListBucketResult><IsTruncated>false</IsTruncated></ListBucketResult>";
        let (objects, truncated, token) = parse_list_response(xml);
        assert!(objects.is_empty());
        assert!(!truncated);
        assert!(token.is_none());
    }
}
