use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Method;
use serde_json::Value;

use crate::errors::{HybrikError, Result};
use crate::http::{ApiResponse, HttpClient};
use crate::models::{CreateJobOptions, CreateJobRequest, ListJobsQuery, LoginRequest, Session, DEFAULT_SCHEMA};

const DEFAULT_API_URL: &str = "https://api-demo.hybrik.com/v1";
const DEFAULT_COMPLIANCE_DATE: &str = "20240228";

/// Builder for constructing a [`HybrikClient`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use hybrik::HybrikClientBuilder;
///
/// # fn example() -> hybrik::Result<()> {
/// let mut client = HybrikClientBuilder::new()
///     .oapi_key("org-key")
///     .oapi_secret("org-secret")
///     .auth_key("user@example.com")
///     .auth_secret("password")
///     .compliance_date("20240228")
///     .build()?;
/// client.connect()?;
/// # Ok(())
/// # }
/// ```
pub struct HybrikClientBuilder {
    api_url: String,
    oapi_key: Option<String>,
    oapi_secret: Option<String>,
    auth_key: Option<String>,
    auth_secret: Option<String>,
    compliance_date: String,
    output_curl: bool,
}

impl HybrikClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            oapi_key: None,
            oapi_secret: None,
            auth_key: None,
            auth_secret: None,
            compliance_date: DEFAULT_COMPLIANCE_DATE.to_string(),
            output_curl: false,
        }
    }

    /// Override the API base URL (defaults to the Hybrik demo endpoint).
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the organization-level OAPI key.
    pub fn oapi_key(mut self, key: impl Into<String>) -> Self {
        self.oapi_key = Some(key.into());
        self
    }

    /// Set the organization-level OAPI secret.
    pub fn oapi_secret(mut self, secret: impl Into<String>) -> Self {
        self.oapi_secret = Some(secret.into());
        self
    }

    /// Set the per-login auth key exchanged for a session token.
    pub fn auth_key(mut self, key: impl Into<String>) -> Self {
        self.auth_key = Some(key.into());
        self
    }

    /// Set the per-login auth secret exchanged for a session token.
    pub fn auth_secret(mut self, secret: impl Into<String>) -> Self {
        self.auth_secret = Some(secret.into());
        self
    }

    /// Set the `X-Hybrik-Compliance` date asserting which version of the
    /// API contract this client expects.
    pub fn compliance_date(mut self, date: impl Into<String>) -> Self {
        self.compliance_date = date.into();
        self
    }

    /// Print an equivalent `curl` command line for every request.
    pub fn output_curl(mut self, enabled: bool) -> Self {
        self.output_curl = enabled;
        self
    }

    /// Build the [`HybrikClient`].
    ///
    /// OAPI credentials not set on the builder are read from the
    /// `HYBRIK_OAPI_KEY` / `HYBRIK_OAPI_SECRET` environment variables, auth
    /// credentials from `HYBRIK_AUTH_KEY` / `HYBRIK_AUTH_SECRET`.
    ///
    /// Returns [`HybrikError::Configuration`] if the base URL is malformed
    /// or the OAPI credentials are missing. No login happens here; call
    /// [`HybrikClient::connect`] to obtain a session token.
    pub fn build(self) -> Result<HybrikClient> {
        let oapi_key = self
            .oapi_key
            .or_else(|| std::env::var("HYBRIK_OAPI_KEY").ok())
            .ok_or_else(|| HybrikError::Configuration {
                message: "OAPI key is required. Pass it to HybrikClientBuilder::oapi_key() \
                          or set the HYBRIK_OAPI_KEY environment variable."
                    .into(),
            })?;
        let oapi_secret = self
            .oapi_secret
            .or_else(|| std::env::var("HYBRIK_OAPI_SECRET").ok())
            .ok_or_else(|| HybrikError::Configuration {
                message: "OAPI secret is required. Pass it to HybrikClientBuilder::oapi_secret() \
                          or set the HYBRIK_OAPI_SECRET environment variable."
                    .into(),
            })?;
        let auth_key = self
            .auth_key
            .or_else(|| std::env::var("HYBRIK_AUTH_KEY").ok())
            .unwrap_or_default();
        let auth_secret = self
            .auth_secret
            .or_else(|| std::env::var("HYBRIK_AUTH_SECRET").ok())
            .unwrap_or_default();

        let mut http = HttpClient::new(&self.api_url, self.output_curl)?;

        // The Basic pair is encoded once here; only the session token is
        // added to headers after this point.
        let encoded = BASE64.encode(format!("{oapi_key}:{oapi_secret}"));
        let mut default_headers = BTreeMap::new();
        default_headers.insert("Authorization".to_string(), format!("Basic {encoded}"));
        default_headers.insert("X-Hybrik-Compliance".to_string(), self.compliance_date);
        http.set_default_headers(default_headers);

        Ok(HybrikClient {
            http,
            auth_key,
            auth_secret,
            session: None,
        })
    }
}

impl Default for HybrikClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the Hybrik transcoding API.
///
/// Wraps the generic [`HttpClient`] with the Hybrik authentication scheme:
/// a Basic-auth OAPI pair and compliance date on every call, plus a session
/// token obtained by [`connect`](Self::connect) and attached as
/// `X-Hybrik-Sapiauth` afterwards.
///
/// Each operation is a single blocking round trip on a connection reused
/// for the client's lifetime; callers sharing one instance across threads
/// must serialize access themselves.
///
/// # Example
///
/// ```no_run
/// use hybrik::{CreateJobOptions, HybrikClient};
/// use serde_json::json;
///
/// # fn example() -> hybrik::Result<()> {
/// let mut client = HybrikClient::new(
///     "https://api-demo.hybrik.com/v1",
///     "org-key",
///     "org-secret",
///     "user@example.com",
///     "password",
/// )?;
/// if !client.connect()? {
///     eprintln!("login rejected");
/// }
///
/// let payload = json!({"elements": []});
/// let response = client.create_job("nightly transcode", &payload, &CreateJobOptions::default())?;
/// println!("{:?}", response.payload);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HybrikClient {
    http: HttpClient,
    auth_key: String,
    auth_secret: String,
    session: Option<Session>,
}

impl HybrikClient {
    /// Create a client with the default compliance date.
    ///
    /// For full control (curl echo, compliance date, env-var credential
    /// fallback) use [`HybrikClientBuilder`].
    pub fn new(
        api_url: &str,
        oapi_key: &str,
        oapi_secret: &str,
        auth_key: &str,
        auth_secret: &str,
    ) -> Result<Self> {
        HybrikClientBuilder::new()
            .api_url(api_url)
            .oapi_key(oapi_key)
            .oapi_secret(oapi_secret)
            .auth_key(auth_key)
            .auth_secret(auth_secret)
            .build()
    }

    /// A builder with default settings, equivalent to
    /// [`HybrikClientBuilder::new`].
    pub fn builder() -> HybrikClientBuilder {
        HybrikClientBuilder::new()
    }

    /// Exchange the stored auth credentials for a session token.
    ///
    /// Returns `Ok(true)` when the login response contains a `token` field;
    /// the full response is retained as the session and the token rides
    /// along on every subsequent call. Any other response shape yields
    /// `Ok(false)` and leaves the client unauthenticated — domain calls
    /// still go out, but without a token the server will reject them.
    ///
    /// Transport failures propagate as [`HybrikError::Transport`].
    pub fn connect(&mut self) -> Result<bool> {
        let auth_key = self.auth_key.clone();
        let auth_secret = self.auth_secret.clone();
        let response = self.login(&auth_key, &auth_secret)?;

        let token = response
            .payload
            .as_json()
            .and_then(|value| value.get("token"))
            .map(|token| match token.as_str() {
                Some(token) => token.to_string(),
                None => token.to_string(),
            });

        match token {
            Some(token) => {
                let raw = response.payload.as_json().cloned().unwrap_or(Value::Null);
                self.session = Some(Session { token, raw });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The session established by [`connect`](Self::connect), if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// POST the login endpoint with the given credentials and return the
    /// raw decoded response. Most callers want [`connect`](Self::connect)
    /// instead, which also retains the session.
    pub fn login(&self, auth_key: &str, auth_secret: &str) -> Result<ApiResponse> {
        let body = serde_json::to_value(LoginRequest {
            auth_key,
            auth_secret,
        })?;
        self.call_api(Method::POST, "login", None, Some(&body))
    }

    /// Route one request through the generic client.
    ///
    /// Attaches the client's default headers, the session token when
    /// present, and a JSON Content-Type when a body is present. Methods
    /// other than GET/POST/PUT/DELETE are rejected with
    /// [`HybrikError::UnsupportedMethod`].
    pub fn call_api(
        &self,
        method: Method,
        path: &str,
        query: Option<&BTreeMap<String, String>>,
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let mut headers = self.http.default_headers().clone();
        if let Some(session) = &self.session {
            headers.insert("X-Hybrik-Sapiauth".to_string(), session.token.clone());
        }
        if body.is_some() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }

        match method.as_str() {
            "GET" => self.http.get(path, query, Some(&headers)),
            "POST" => self
                .http
                .post(path, body.unwrap_or(&Value::Null), query, Some(&headers)),
            "PUT" => self
                .http
                .put(path, body.unwrap_or(&Value::Null), query, Some(&headers)),
            "DELETE" => self.http.delete(path, query, Some(&headers)),
            other => Err(HybrikError::UnsupportedMethod {
                method: other.to_string(),
            }),
        }
    }

    /// Submit a new job.
    ///
    /// `payload` is the Hybrik job definition, passed through opaquely; the
    /// API validates it, not this client. Optional fields from `opts` are
    /// present on the wire only when set — see [`CreateJobOptions`].
    pub fn create_job(
        &self,
        name: &str,
        payload: &Value,
        opts: &CreateJobOptions,
    ) -> Result<ApiResponse> {
        let request = CreateJobRequest {
            name,
            payload,
            schema: opts.schema.as_deref().unwrap_or(DEFAULT_SCHEMA),
            expiration: opts.expiration,
            priority: opts.priority,
            task_tags: opts.task_tags.as_deref(),
            user_tag: opts.user_tag.as_deref(),
            task_retry_count: opts.task_retry_count,
            task_retry_delay_secs: opts.task_retry_delay_secs,
        };
        let body = serde_json::to_value(&request)?;
        self.call_api(Method::POST, "jobs", None, Some(&body))
    }

    /// List jobs, one page, with optional filtering and ordering.
    pub fn list_jobs(&self, query: &ListJobsQuery) -> Result<ApiResponse> {
        self.call_api(Method::GET, "jobs/info", Some(&query.to_query()), None)
    }

    /// Fetch the definition a job was submitted with.
    pub fn get_job_definition(&self, job_id: &str) -> Result<ApiResponse> {
        self.call_api(Method::GET, &format!("jobs/{job_id}/definition"), None, None)
    }

    /// Fetch the results of a job.
    pub fn get_job_results(&self, job_id: &str) -> Result<ApiResponse> {
        self.call_api(Method::GET, &format!("jobs/{job_id}/result"), None, None)
    }

    /// Fetch the task breakdown of a job.
    pub fn get_job_tasks(&self, job_id: &str) -> Result<ApiResponse> {
        self.call_api(Method::GET, &format!("jobs/{job_id}/tasks"), None, None)
    }

    /// Delete a job.
    pub fn delete_job(&self, job_id: &str) -> Result<ApiResponse> {
        self.call_api(Method::DELETE, &format!("jobs/{job_id}/delete"), None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HybrikClient {
        HybrikClientBuilder::new()
            .api_url("https://api-demo.hybrik.com/v1")
            .oapi_key("key")
            .oapi_secret("secret")
            .auth_key("user")
            .auth_secret("pass")
            .build()
            .unwrap()
    }

    #[test]
    fn build_rejects_malformed_api_url() {
        let err = HybrikClientBuilder::new()
            .api_url("::not-a-url::")
            .oapi_key("k")
            .oapi_secret("s")
            .build()
            .unwrap_err();
        assert!(matches!(err, HybrikError::Configuration { .. }));
    }

    #[test]
    fn default_headers_carry_basic_auth_and_compliance_date() {
        let client = client();
        let headers = client.http.default_headers();
        // base64("key:secret")
        assert_eq!(
            headers.get("Authorization").map(String::as_str),
            Some("Basic a2V5OnNlY3JldA==")
        );
        assert_eq!(
            headers.get("X-Hybrik-Compliance").map(String::as_str),
            Some(DEFAULT_COMPLIANCE_DATE)
        );
    }

    #[test]
    fn compliance_date_is_configurable() {
        let client = HybrikClientBuilder::new()
            .oapi_key("k")
            .oapi_secret("s")
            .compliance_date("20250101")
            .build()
            .unwrap();
        assert_eq!(
            client.http.default_headers().get("X-Hybrik-Compliance").map(String::as_str),
            Some("20250101")
        );
    }

    #[test]
    fn client_starts_unauthenticated() {
        assert!(client().session().is_none());
    }

    #[test]
    fn call_api_rejects_unsupported_methods() {
        let client = client();
        let err = client
            .call_api(Method::PATCH, "jobs", None, None)
            .unwrap_err();
        match err {
            HybrikError::UnsupportedMethod { method } => assert_eq!(method, "PATCH"),
            other => panic!("expected UnsupportedMethod, got {other:?}"),
        }
    }
}
