//! Minimal S3 client: ListObjectsV2 and ranged GetObject over blocking
//! reqwest, signed with AWS Signature Version 4.
//!
//! Credentials come from the environment only:
//! `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, optional `AWS_SESSION_TOKEN`.
//! With a custom endpoint (MinIO, R2, Wasabi, ...) requests are path-style.

use std::ops::Range;
use std::thread;
use std::time::Duration;

use hmac::{Hmac, Mac};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::blocking::{Client, Response};
use sha2::{Digest, Sha256};

use crate::error::SourceError;

// ── Constants ───────────────────────────────────────────────────────

const MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("photokit/", env!("CARGO_PKG_VERSION"));
/// sha256 of the empty string. Every request we send has an empty body.
const EMPTY_PAYLOAD_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

type HmacSha256 = Hmac<Sha256>;

// ── Credentials ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn from_env() -> Result<Self, SourceError> {
        let access_key_id = require_env("AWS_ACCESS_KEY_ID")?;
        let secret_access_key = require_env("AWS_SECRET_ACCESS_KEY")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

fn require_env(var: &str) -> Result<String, SourceError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Ok(_) => Err(SourceError::Auth(format!("environment variable {} is empty", var))),
        Err(_) => Err(SourceError::Auth(format!("environment variable {} not set", var))),
    }
}

// ── SigV4 ───────────────────────────────────────────────────────────

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hmac(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// RFC 3986 percent-encoding as SigV4 wants it. `/` is kept only in paths.
fn uri_encode(s: &str, keep_slash: bool) -> String {
    let mut encoded = String::with_capacity(s.len() * 2);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            b'/' if keep_slash => encoded.push('/'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Sorted, encoded query string, used both on the wire and when signing.
fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k, false), uri_encode(v, false)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

struct SigningRequest<'a> {
    method: &'a str,
    /// Already-encoded absolute path.
    path: &'a str,
    /// Already-canonical query string.
    query: &'a str,
    /// Lowercase name, trimmed value. Must include `host`.
    headers: Vec<(String, String)>,
    amz_date: &'a str,
    region: &'a str,
}

/// Returns (signed header list, hex signature).
fn sign(req: &SigningRequest<'_>, secret_access_key: &str) -> (String, String) {
    let mut headers = req.headers.clone();
    headers.sort();
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        req.method, req.path, req.query, canonical_headers, signed_headers, EMPTY_PAYLOAD_SHA256
    );

    let date = &req.amz_date[..8];
    let scope = format!("{}/{}/s3/aws4_request", date, req.region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        req.amz_date,
        scope,
        hex(&Sha256::digest(canonical_request.as_bytes()))
    );

    let k_date = hmac(format!("AWS4{}", secret_access_key).as_bytes(), date);
    let k_region = hmac(&k_date, req.region);
    let k_service = hmac(&k_region, "s3");
    let k_signing = hmac(&k_service, "aws4_request");
    let signature = hex(&hmac(&k_signing, &string_to_sign));

    (signed_headers, signature)
}

// ── Listing model ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}

impl RemoteObject {
    /// Last path segment of the key.
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

#[derive(Debug, Default)]
struct ListPage {
    objects: Vec<RemoteObject>,
    is_truncated: bool,
    next_token: Option<String>,
}

fn push_entity(text: &mut String, name: &str) {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name
            .strip_prefix("#x")
            .and_then(|h| u32::from_str_radix(h, 16).ok())
            .or_else(|| name.strip_prefix('#').and_then(|d| d.parse().ok()))
            .and_then(char::from_u32),
    };
    match resolved {
        Some(c) => text.push(c),
        None => {
            text.push('&');
            text.push_str(name);
            text.push(';');
        }
    }
}

fn parse_list_page(xml: &str) -> Result<ListPage, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false); // keys may carry spaces
    let mut buf = Vec::new();

    let mut page = ListPage::default();
    let mut current: Option<RemoteObject> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.name().as_ref() == b"Contents" {
                    current = Some(RemoteObject::default());
                }
                text.clear();
            }
            Ok(Event::Text(ref e)) => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::CData(ref e)) => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(ref e)) => {
                push_entity(&mut text, &String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::End(ref e)) => {
                match (e.name().as_ref(), current.as_mut()) {
                    (b"Key", Some(obj)) => obj.key = std::mem::take(&mut text),
                    (b"Size", Some(obj)) => {
                        obj.size = text
                            .trim()
                            .parse()
                            .map_err(|_| format!("bad object size '{}'", text.trim()))?;
                    }
                    (b"LastModified", Some(obj)) => obj.last_modified = Some(text.trim().to_string()),
                    (b"ETag", Some(obj)) => obj.etag = Some(text.trim().trim_matches('"').to_string()),
                    (b"Contents", Some(_)) => {
                        if let Some(obj) = current.take() {
                            page.objects.push(obj);
                        }
                    }
                    (b"IsTruncated", None) => page.is_truncated = text.trim() == "true",
                    (b"NextContinuationToken", None) => {
                        page.next_token = Some(text.trim().to_string())
                    }
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed listing XML at byte {}: {}",
                    reader.error_position(),
                    e
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(page)
}

/// `Code: Message` from an S3 XML error body, or the HTTP status.
fn error_message(body: &str, status: u16) -> String {
    let mut reader = Reader::from_str(body);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut code = None;
    let mut message = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => text.clear(),
            Ok(Event::Text(ref e)) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::GeneralRef(ref e)) => push_entity(&mut text, &String::from_utf8_lossy(e.as_ref())),
            Ok(Event::End(ref e)) => {
                match e.name().as_ref() {
                    b"Code" => code = Some(text.trim().to_string()),
                    b"Message" => message = Some(text.trim().to_string()),
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    match (code, message) {
        (Some(c), Some(m)) => format!("{}: {}", c, m),
        (Some(c), None) => c,
        (None, Some(m)) => m,
        (None, None) => format!("HTTP {}", status),
    }
}

// ── Client ──────────────────────────────────────────────────────────

pub struct S3Client {
    http: Client,
    bucket: String,
    region: String,
    /// `scheme://host[:port]`
    origin: String,
    /// Host header value as signed.
    host: String,
    /// Encoded path prefix before the key: `/` or `/<endpoint path>/<bucket>/`.
    key_root: String,
    credentials: Credentials,
    backoff: Duration,
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("origin", &self.origin)
            .finish()
    }
}

impl S3Client {
    /// Virtual-hosted AWS client, or path-style against `endpoint`.
    pub fn new(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        credentials: Credentials,
    ) -> Result<Self, SourceError> {
        if bucket.is_empty() {
            return Err(SourceError::Rejected {
                status: 0,
                message: "bucket name is empty".to_string(),
            });
        }

        let (origin, host, key_root) = match endpoint {
            Some(endpoint) => {
                let url = reqwest::Url::parse(endpoint).map_err(|e| SourceError::Rejected {
                    status: 0,
                    message: format!("invalid endpoint '{}': {}", endpoint, e),
                })?;
                let host_name = url.host_str().ok_or_else(|| SourceError::Rejected {
                    status: 0,
                    message: format!("endpoint '{}' has no host", endpoint),
                })?;
                let host = match url.port() {
                    Some(port) => format!("{}:{}", host_name, port),
                    None => host_name.to_string(),
                };
                let prefix = url.path().trim_end_matches('/');
                let key_root = format!("{}/{}/", prefix, uri_encode(bucket, false));
                (format!("{}://{}", url.scheme(), host), host, key_root)
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket, region);
                (format!("https://{}", host), host, "/".to_string())
            }
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            bucket: bucket.to_string(),
            region: region.to_string(),
            origin,
            host,
            key_root,
            credentials,
            backoff: Duration::from_secs(1),
        })
    }

    /// First retry delay; doubles on each further attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Display location for a key: `s3://bucket/key`.
    pub fn object_url(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    /// Every object under `prefix`, following continuation tokens.
    /// Folder placeholder keys (ending in `/`) are dropped.
    pub fn list_objects(&self, prefix: &str) -> Result<Vec<RemoteObject>, SourceError> {
        let list_path = self.key_root.trim_end_matches('/');
        let list_path = if list_path.is_empty() { "/" } else { list_path };

        let mut objects = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let mut params: Vec<(&str, &str)> = vec![("list-type", "2"), ("prefix", prefix)];
            if let Some(t) = &token {
                params.push(("continuation-token", t));
            }
            let query = canonical_query(&params);

            let resp = self.send(list_path, &query, None)?;
            let body = resp
                .text()
                .map_err(|e| SourceError::Unavailable(format!("failed to read listing: {}", e)))?;
            let page = parse_list_page(&body).map_err(SourceError::Unavailable)?;
            pages += 1;

            log::debug!(
                "listed {} objects (page {}, truncated: {})",
                page.objects.len(),
                pages,
                page.is_truncated
            );
            objects.extend(page.objects.into_iter().filter(|o| !o.key.ends_with('/')));

            if !page.is_truncated {
                break;
            }
            match page.next_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => {
                    return Err(SourceError::Unavailable(
                        "listing truncated without a continuation token".to_string(),
                    ))
                }
            }
        }

        log::info!(
            "listed {} objects under s3://{}/{} in {} pages",
            objects.len(),
            self.bucket,
            prefix,
            pages
        );
        Ok(objects)
    }

    /// Object bytes, or only `range` of them. A range past the end of a
    /// small object returns what exists.
    pub fn get_object(&self, key: &str, range: Option<Range<u64>>) -> Result<Vec<u8>, SourceError> {
        let path = format!("{}{}", self.key_root, uri_encode(key, true));
        let range_header = match &range {
            Some(r) if r.end > r.start => Some(format!("bytes={}-{}", r.start, r.end - 1)),
            _ => None,
        };

        let resp = self.send(&path, "", range_header.as_deref()).map_err(|e| match e {
            SourceError::Rejected { status, message } => {
                SourceError::unreadable(self.object_url(key), format!("{} ({})", message, status))
            }
            other => other,
        })?;
        let bytes = resp
            .bytes()
            .map_err(|e| SourceError::unreadable(self.object_url(key), e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn signed_headers(&self, path: &str, query: &str, range: Option<&str>) -> Vec<(String, String)> {
        let amz_date = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();

        let mut headers = vec![
            ("host".to_string(), self.host.clone()),
            ("x-amz-content-sha256".to_string(), EMPTY_PAYLOAD_SHA256.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(r) = range {
            headers.push(("range".to_string(), r.to_string()));
        }
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let (signed, signature) = sign(
            &SigningRequest {
                method: "GET",
                path,
                query,
                headers: headers.clone(),
                amz_date: &amz_date,
                region: &self.region,
            },
            &self.credentials.secret_access_key,
        );
        headers.push((
            "authorization".to_string(),
            format!(
                "AWS4-HMAC-SHA256 Credential={}/{}/{}/s3/aws4_request, SignedHeaders={}, Signature={}",
                self.credentials.access_key_id,
                &amz_date[..8],
                self.region,
                signed,
                signature
            ),
        ));
        // reqwest derives Host from the URL.
        headers.retain(|(k, _)| k != "host");
        headers
    }

    /// GET with retry + exponential backoff. Re-signs on every attempt.
    fn send(&self, path: &str, query: &str, range: Option<&str>) -> Result<Response, SourceError> {
        let url = if query.is_empty() {
            format!("{}{}", self.origin, path)
        } else {
            format!("{}{}?{}", self.origin, path, query)
        };
        let mut backoff = self.backoff;

        for attempt in 0..=MAX_RETRIES {
            let mut req = self.http.get(&url);
            for (name, value) in self.signed_headers(path, query, range) {
                req = req.header(name, value);
            }

            match req.send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if resp.status().is_success() {
                        return Ok(resp);
                    }

                    // Auth errors: fail immediately
                    if status == 401 || status == 403 {
                        let body = resp.text().unwrap_or_default();
                        return Err(SourceError::Auth(format!(
                            "S3 auth failed ({}): {}",
                            status,
                            error_message(&body, status)
                        )));
                    }

                    // Other 4xx (not 429): fail immediately
                    if (400..500).contains(&status) && status != 429 {
                        let body = resp.text().unwrap_or_default();
                        return Err(SourceError::Rejected {
                            status,
                            message: error_message(&body, status),
                        });
                    }

                    // Retryable: 429, 5xx
                    if attempt == MAX_RETRIES {
                        return Err(SourceError::Unavailable(format!(
                            "S3 {} after {} attempts ({})",
                            if status == 429 { "rate limited" } else { "upstream error" },
                            MAX_RETRIES + 1,
                            status
                        )));
                    }

                    // Respect Retry-After header for 429
                    let wait = if status == 429 {
                        resp.headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs)
                            .unwrap_or(backoff)
                    } else {
                        backoff
                    };
                    log::warn!(
                        "retry {}/{} in {:?} (HTTP {})",
                        attempt + 1,
                        MAX_RETRIES,
                        wait,
                        status
                    );
                    thread::sleep(wait);
                    backoff *= 2;
                }
                Err(e) => {
                    // Network/timeout errors: retry
                    if attempt == MAX_RETRIES {
                        return Err(SourceError::Unavailable(format!(
                            "S3 unreachable after {} attempts: {}",
                            MAX_RETRIES + 1,
                            e
                        )));
                    }
                    log::warn!("retry {}/{} in {:?} ({})", attempt + 1, MAX_RETRIES, backoff, e);
                    thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }

        Err(SourceError::Unavailable("retry loop exhausted".to_string()))
    }
}
