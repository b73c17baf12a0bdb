use std::collections::BTreeMap;
use std::time::Duration;

use log::error;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;

use crate::errors::{HybrikError, Result};

const DEFAULT_PORT: u16 = 443;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A decoded response body, keyed off the response `Content-Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// An `application/json` body. An empty body decodes to `Value::Null`.
    Json(serde_json::Value),
    /// A plain-text body.
    Text(String),
    /// Any other body, returned undecoded.
    Bytes(Vec<u8>),
}

impl Payload {
    /// The decoded JSON value, or `None` for text/byte payloads.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The decoded text, or `None` for JSON/byte payloads.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Raw status plus the decoded body of one request/response round trip.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub payload: Payload,
}

/// A minimal HTTP client bound to a single host.
///
/// Parses the base URL once at construction, merges default and per-call
/// headers and query parameters, and funnels every verb through one
/// transport that is reused for the client's lifetime. Not a general-purpose
/// HTTP library: it implements exactly the request/response conventions the
/// Hybrik API expects, including the trailing `?` on every built URL.
#[derive(Debug)]
pub struct HttpClient {
    scheme: String,
    host: String,
    port: u16,
    base_path: String,
    transport: reqwest::blocking::Client,
    output_curl: bool,
    default_headers: BTreeMap<String, String>,
    default_query: BTreeMap<String, String>,
}

impl HttpClient {
    /// Create a client for the given base URL.
    ///
    /// The URL is split into scheme, host, port (default 443), and base
    /// path. With `output_curl` set, every request first prints an
    /// equivalent `curl` command line to stdout.
    ///
    /// Returns [`HybrikError::Configuration`] if the URL cannot be parsed
    /// or carries no host.
    pub fn new(base_url: &str, output_curl: bool) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| HybrikError::Configuration {
            message: format!("invalid base URL {base_url:?}: {e}"),
        })?;

        let host = url
            .host_str()
            .ok_or_else(|| HybrikError::Configuration {
                message: format!("base URL {base_url:?} has no host"),
            })?
            .to_string();

        let transport = reqwest::blocking::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .pool_max_idle_per_host(1)
            .build()?;

        let mut default_headers = BTreeMap::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            base_path: url.path().trim_end_matches('/').to_string(),
            transport,
            output_curl,
            default_headers,
            default_query: BTreeMap::new(),
        })
    }

    /// The client's default headers, attached to every request unless
    /// overridden per call.
    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }

    /// Replace the default header map wholesale.
    pub fn set_default_headers(&mut self, headers: BTreeMap<String, String>) {
        self.default_headers = headers;
    }

    /// Insert or overwrite a single default header.
    pub fn insert_default_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.default_headers.insert(name.into(), value.into());
    }

    /// Merge a call-supplied map over defaults, key by key. `None` means
    /// "defaults verbatim".
    fn merge(
        defaults: &BTreeMap<String, String>,
        overrides: Option<&BTreeMap<String, String>>,
    ) -> BTreeMap<String, String> {
        match overrides {
            None => defaults.clone(),
            Some(overrides) => {
                let mut merged = defaults.clone();
                for (key, value) in overrides {
                    merged.insert(key.clone(), value.clone());
                }
                merged
            }
        }
    }

    fn build_query_string(&self, query: Option<&BTreeMap<String, String>>) -> String {
        Self::merge(&self.default_query, query)
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Build the request path: `<base_path>/<endpoint>?<query string>`.
    ///
    /// The `?` is appended even when the merged query is empty; the Hybrik
    /// API has always been called that way and accepts it.
    pub fn build_url(&self, endpoint: &str, query: Option<&BTreeMap<String, String>>) -> String {
        format!(
            "{}/{}?{}",
            self.base_path,
            endpoint,
            self.build_query_string(query)
        )
    }

    /// Issue a GET request.
    pub fn get(
        &self,
        endpoint: &str,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<ApiResponse> {
        self.execute(Method::GET, endpoint, None, query, headers)
    }

    /// Issue a DELETE request.
    pub fn delete(
        &self,
        endpoint: &str,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<ApiResponse> {
        self.execute(Method::DELETE, endpoint, None, query, headers)
    }

    /// Serialize `body` to JSON and POST it.
    ///
    /// No Content-Type is forced here; callers sending JSON rely on the
    /// default header map already carrying `application/json`.
    pub fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<ApiResponse> {
        let body = serde_json::to_string(body)?;
        self.execute(Method::POST, endpoint, Some(body), query, headers)
    }

    /// Serialize `body` to JSON and PUT it.
    pub fn put<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<ApiResponse> {
        let body = serde_json::to_string(body)?;
        self.execute(Method::PUT, endpoint, Some(body), query, headers)
    }

    fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
        query: Option<&BTreeMap<String, String>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<ApiResponse> {
        let path = self.build_url(endpoint, query);
        let headers = Self::merge(&self.default_headers, headers);

        if self.output_curl {
            println!("{}", self.to_curl(method.as_str(), &path, &headers, body.as_deref()));
        }

        let url = format!("{}://{}:{}{}", self.scheme, self.host, self.port, path);
        let mut request = self.transport.request(method, &url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send()?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response.bytes()?.to_vec();

        Ok(ApiResponse {
            status,
            payload: decode_payload(&content_type, bytes),
        })
    }

    /// Render a request as a shell-pasteable `curl` command line.
    fn to_curl(
        &self,
        method: &str,
        path: &str,
        headers: &BTreeMap<String, String>,
        body: Option<&str>,
    ) -> String {
        let header_str = headers
            .iter()
            .map(|(k, v)| format!("-H \"{k}: {v}\""))
            .collect::<Vec<_>>()
            .join(" ");
        let data_str = body.map(|b| format!("--data '{b}' ")).unwrap_or_default();
        format!(
            "curl -X {method} {header_str} {data_str}\"{}://{}:{}{path}\"",
            self.scheme, self.host, self.port
        )
    }
}

/// Split a `Content-Type` header into media type and charset.
///
/// Parameters after the first `;` are searched for `charset`; absent one,
/// `utf-8` is assumed. The media type is compared verbatim downstream, so
/// no trimming or case folding happens here.
fn parse_content_type(header: &str) -> (&str, &str) {
    match header.split_once(';') {
        Some((media_type, params)) => {
            let charset = params
                .split(',')
                .filter_map(|param| param.trim().split_once('='))
                .find(|(name, _)| *name == "charset")
                .map(|(_, value)| value.trim())
                .unwrap_or("utf-8");
            (media_type, charset)
        }
        None => (header, "utf-8"),
    }
}

fn is_utf8_compatible(charset: &str) -> bool {
    matches!(
        charset.to_ascii_lowercase().as_str(),
        "utf-8" | "utf8" | "us-ascii" | "ascii"
    )
}

/// Decode a response body according to its declared content type.
///
/// Never fails: undecodable bodies degrade to [`Payload::Bytes`] with an
/// error logged.
pub(crate) fn decode_payload(content_type: &str, bytes: Vec<u8>) -> Payload {
    let (media_type, charset) = parse_content_type(content_type);

    if !is_utf8_compatible(charset) {
        error!("unsupported response charset {charset:?}, returning raw bytes");
        return Payload::Bytes(bytes);
    }

    // The Hybrik API emits a malformed `text/plain:` media type (trailing
    // colon included) for plain-text bodies; match it verbatim. A correct
    // `text/plain` falls through to raw bytes.
    if media_type == "text/plain:" {
        return match String::from_utf8(bytes) {
            Ok(text) => Payload::Text(text),
            Err(e) => {
                error!("error decoding response text: {e}");
                Payload::Bytes(e.into_bytes())
            }
        };
    }

    if media_type == "application/json" {
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                error!("error decoding response text: {e}");
                return Payload::Bytes(e.into_bytes());
            }
        };
        if text.trim().is_empty() {
            return Payload::Json(serde_json::Value::Null);
        }
        return match serde_json::from_str(&text) {
            Ok(value) => Payload::Json(value),
            Err(e) => {
                error!("error decoding response: {e}");
                Payload::Bytes(text.into_bytes())
            }
        };
    }

    Payload::Bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> HttpClient {
        HttpClient::new("https://api-demo.hybrik.com/v1", false).unwrap()
    }

    #[test]
    fn parses_base_url_parts() {
        let client = client();
        assert_eq!(client.scheme, "https");
        assert_eq!(client.host, "api-demo.hybrik.com");
        assert_eq!(client.port, 443);
        assert_eq!(client.base_path, "/v1");
    }

    #[test]
    fn explicit_port_is_kept() {
        let client = HttpClient::new("https://example.com:8443/api", false).unwrap();
        assert_eq!(client.port, 8443);
    }

    #[test]
    fn rejects_url_without_host() {
        let err = HttpClient::new("not a url", false).unwrap_err();
        assert!(matches!(err, HybrikError::Configuration { .. }));
    }

    #[test]
    fn default_headers_start_as_json_content_type() {
        let client = client();
        assert_eq!(
            client.default_headers().get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn build_url_without_query_keeps_trailing_question_mark() {
        let client = client();
        assert_eq!(client.build_url("jobs", None), "/v1/jobs?");
    }

    #[test]
    fn build_url_encodes_merged_query() {
        let client = client();
        let mut query = BTreeMap::new();
        query.insert("sort_field".to_string(), "id".to_string());
        query.insert("take".to_string(), "10".to_string());
        assert_eq!(
            client.build_url("jobs/info", Some(&query)),
            "/v1/jobs/info?sort_field=id&take=10"
        );
    }

    #[test]
    fn build_url_percent_encodes_values() {
        let client = client();
        let mut query = BTreeMap::new();
        query.insert("order".to_string(), "a b".to_string());
        assert_eq!(client.build_url("jobs", Some(&query)), "/v1/jobs?order=a%20b");
    }

    #[test]
    fn merge_none_returns_defaults_verbatim() {
        let mut defaults = BTreeMap::new();
        defaults.insert("Content-Type".to_string(), "application/json".to_string());
        assert_eq!(HttpClient::merge(&defaults, None), defaults);
    }

    #[test]
    fn merge_overrides_key_by_key() {
        let mut defaults = BTreeMap::new();
        defaults.insert("Content-Type".to_string(), "application/json".to_string());
        defaults.insert("X-Keep".to_string(), "default".to_string());

        let mut overrides = BTreeMap::new();
        overrides.insert("Content-Type".to_string(), "text/xml".to_string());
        overrides.insert("X-New".to_string(), "added".to_string());

        let merged = HttpClient::merge(&defaults, Some(&overrides));
        assert_eq!(merged.get("Content-Type").map(String::as_str), Some("text/xml"));
        assert_eq!(merged.get("X-Keep").map(String::as_str), Some("default"));
        assert_eq!(merged.get("X-New").map(String::as_str), Some("added"));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn decodes_json_payload() {
        let payload = decode_payload("application/json", br#"{"token":"abc"}"#.to_vec());
        assert_eq!(payload, Payload::Json(json!({"token": "abc"})));
    }

    #[test]
    fn decodes_json_with_charset_parameter() {
        let payload = decode_payload("application/json; charset=utf-8", b"[1,2]".to_vec());
        assert_eq!(payload, Payload::Json(json!([1, 2])));
    }

    #[test]
    fn empty_json_body_decodes_to_null() {
        assert_eq!(
            decode_payload("application/json", b"".to_vec()),
            Payload::Json(serde_json::Value::Null)
        );
        assert_eq!(
            decode_payload("application/json", b"  \n".to_vec()),
            Payload::Json(serde_json::Value::Null)
        );
    }

    #[test]
    fn invalid_json_degrades_to_bytes() {
        let payload = decode_payload("application/json", b"{not json".to_vec());
        assert_eq!(payload, Payload::Bytes(b"{not json".to_vec()));
    }

    #[test]
    fn text_plain_with_trailing_colon_decodes_as_text() {
        let payload = decode_payload("text/plain:", b"job deleted".to_vec());
        assert_eq!(payload, Payload::Text("job deleted".to_string()));
    }

    #[test]
    fn text_plain_without_colon_falls_through_to_bytes() {
        let payload = decode_payload("text/plain", b"job deleted".to_vec());
        assert_eq!(payload, Payload::Bytes(b"job deleted".to_vec()));
    }

    #[test]
    fn unknown_content_type_returns_raw_bytes() {
        let payload = decode_payload("application/octet-stream", vec![0, 159, 146, 150]);
        assert_eq!(payload, Payload::Bytes(vec![0, 159, 146, 150]));
    }

    #[test]
    fn missing_content_type_returns_raw_bytes() {
        let payload = decode_payload("", b"whatever".to_vec());
        assert_eq!(payload, Payload::Bytes(b"whatever".to_vec()));
    }

    #[test]
    fn unsupported_charset_returns_raw_bytes() {
        let payload = decode_payload("application/json; charset=latin-1", b"{}".to_vec());
        assert_eq!(payload, Payload::Bytes(b"{}".to_vec()));
    }

    #[test]
    fn curl_line_includes_method_headers_body_and_url() {
        let client = client();
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let line = client.to_curl("POST", "/v1/jobs?", &headers, Some(r#"{"name":"x"}"#));
        assert_eq!(
            line,
            "curl -X POST -H \"Content-Type: application/json\" --data '{\"name\":\"x\"}' \"https://api-demo.hybrik.com:443/v1/jobs?\""
        );
    }
}
