// # Route 53 Record Store
//
// This crate provides an AWS Route 53 implementation of `RecordStore` for the
// dnsagg reconciliation daemon.
//
// ## Behavior
//
// - One HTTP request per trait call: a filtered ListResourceRecordSets for
//   fetch, a single-change ChangeResourceRecordSets (UPSERT) for upsert
// - Full error propagation; retries happen on the next scheduler tick
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes and Route 53 error codes
// - Dry-run mode: fetches run, upserts are logged and skipped
// - Requests are signed with AWS Signature Version 4 (`sigv4`)
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs or Debug output
// - The store fails fast if either key is empty
//
// ## API Reference
//
// - List record sets: GET `/2013-04-01/hostedzone/{Id}/rrset?name=..&type=..&maxitems=1`
// - Change record sets: POST `/2013-04-01/hostedzone/{Id}/rrset/`

pub mod sigv4;
pub mod xml;

use async_trait::async_trait;
use dnsagg_core::config::ProviderConfig;
use dnsagg_core::traits::{RecordSet, RecordStore, RecordStoreFactory, UpsertResult, normalize_name};
use dnsagg_core::{Error, RecordType, Result, StoreRegistry};
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, info, warn};

pub use sigv4::Credentials;
use sigv4::{Signer, SigningRequest};

/// Public Route 53 endpoint
pub const ROUTE53_ENDPOINT: &str = "https://route53.amazonaws.com";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const API_VERSION: &str = "2013-04-01";

const CHANGE_COMMENT: &str = "dnsagg: sync target with source records";

/// Route 53 record store
///
/// Stateless between calls: every fetch and upsert is a fresh request.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform the ListResourceRecordSets request
/// - Log the intended ChangeResourceRecordSets payload
/// - **NOT** modify any record set
pub struct Route53RecordStore {
    /// Request signer, owns the credentials
    /// ⚠️ NEVER log this value
    signer: Signer,

    /// Scheme and authority, without a trailing slash
    base_url: String,

    /// Path prefix of the endpoint, usually empty
    base_path: String,

    /// Host header value, signed into every request
    host: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, fetch but skip upserts
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for Route53RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53RecordStore")
            .field("credentials", &"<REDACTED>")
            .field("endpoint", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53RecordStore {
    /// Create a new Route 53 record store
    ///
    /// # Parameters
    ///
    /// - `credentials`: Access key pair, optionally with a session token
    /// - `region`: Signing region (`us-east-1` for the public endpoint)
    /// - `endpoint`: Endpoint override, [`ROUTE53_ENDPOINT`] when `None`
    /// - `dry_run`: If true, fetch but skip upserts
    pub fn new(
        credentials: Credentials,
        region: impl Into<String>,
        endpoint: Option<&str>,
        dry_run: bool,
    ) -> Result<Self> {
        if credentials.access_key_id.is_empty() || credentials.secret_access_key.is_empty() {
            return Err(Error::config("Route 53 credentials cannot be empty"));
        }

        let endpoint = endpoint.unwrap_or(ROUTE53_ENDPOINT);
        let url = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid Route 53 endpoint '{}': {}", endpoint, e)))?;
        let host_name = url
            .host_str()
            .ok_or_else(|| Error::config(format!("Route 53 endpoint has no host: {}", endpoint)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host_name, port),
            None => host_name.to_string(),
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            signer: Signer::new(credentials, region, "route53"),
            base_url: format!("{}://{}", url.scheme(), host),
            base_path: url.path().trim_end_matches('/').to_string(),
            host,
            client,
            dry_run,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Path of the record set collection of a zone
    ///
    /// Accepts both `Z123` and the `/hostedzone/Z123` form the API returns.
    fn rrset_path(&self, zone_id: &str) -> String {
        let zone_id = zone_id.trim_start_matches("/hostedzone/");
        format!("{}/{}/hostedzone/{}/rrset", self.base_path, API_VERSION, zone_id)
    }

    /// Send one signed request and buffer the response body
    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<(StatusCode, String)> {
        let query = sigv4::canonical_query(params);
        let payload = body.unwrap_or_default();

        let mut url = format!("{}{}", self.base_url, sigv4::uri_encode(path, false));
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let headers = self.signer.sign(
            &SigningRequest {
                method: method.as_str(),
                host: &self.host,
                path,
                query: &query,
                payload: payload.as_bytes(),
            },
            chrono::Utc::now(),
        )?;

        let mut request = self.client.request(method, &url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if !payload.is_empty() {
            request = request.header("content-type", "text/xml").body(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("Route 53 request failed: {}", e)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());

        Ok((status, text))
    }

    /// Map a non-2xx response to an error
    fn map_error(status: StatusCode, body: &str, context: &str) -> Error {
        let api_error = xml::parse_error(body);
        let code = api_error.as_ref().map(|e| e.code.as_str()).unwrap_or_default();
        let detail = match &api_error {
            Some(e) => format!("{} ({}): {}", status, e.code, e.message),
            None => format!("{} - {}", status, body.trim()),
        };

        match (status.as_u16(), code) {
            (_, "NoSuchHostedZone") | (404, _) => {
                Error::not_found(format!("{}: {}", context, detail))
            }
            (_, "Throttling") | (_, "PriorRequestNotComplete") | (429, _) => {
                Error::rate_limited(format!("Route 53 throttled the request. {}", detail))
            }
            (401 | 403, _) => Error::auth(format!(
                "Invalid AWS credentials or insufficient permissions. {}",
                detail
            )),
            (500..=599, _) => {
                Error::provider("route53", format!("Route 53 server error (transient): {}", detail))
            }
            _ => Error::provider("route53", format!("{} failed: {}", context, detail)),
        }
    }
}

/// Fully qualified form of a record name
fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

#[async_trait]
impl RecordStore for Route53RecordStore {
    /// Fetch the record set named `name` of type `record_type`
    ///
    /// ListResourceRecordSets returns the first record set at or after the
    /// requested name/type in zone order, so the result is checked against
    /// the request; a different record set means the requested one is absent.
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /2013-04-01/hostedzone/{Id}/rrset?maxitems=1&name=all.example.com.&type=A
    /// ```
    async fn fetch_record_set(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<RecordSet> {
        let path = self.rrset_path(zone_id);
        let name = fqdn(name);
        debug!("Fetching Route 53 record set: {} (type: {})", name, record_type);

        let (status, body) = self
            .send(
                Method::GET,
                &path,
                &[("maxitems", "1"), ("name", &name), ("type", record_type.as_str())],
                None,
            )
            .await?;

        if !status.is_success() {
            return Err(Self::map_error(status, &body, "Record set lookup"));
        }

        let first = xml::parse_record_sets(&body)?.into_iter().next();
        match first {
            Some(set)
                if normalize_name(set.name()) == normalize_name(&name)
                    && set.type_name().eq_ignore_ascii_case(record_type.as_str()) =>
            {
                set.into_record_set()
            }
            _ => Err(Error::not_found(format!(
                "{} (type: {}) in hosted zone {}",
                name, record_type, zone_id
            ))),
        }
    }

    /// Replace the record set in a single UPSERT change
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /2013-04-01/hostedzone/{Id}/rrset/
    /// <ChangeResourceRecordSetsRequest>...<Action>UPSERT</Action>...
    /// ```
    async fn upsert_record_set(&self, zone_id: &str, record_set: &RecordSet) -> Result<UpsertResult> {
        let path = format!("{}/", self.rrset_path(zone_id));
        let payload = xml::upsert_request(record_set, CHANGE_COMMENT)?;

        debug!(
            "{} Route 53 record set: {} {} -> {:?} [mode: {}]",
            if self.dry_run { "Would upsert" } else { "Upserting" },
            record_set.name,
            record_set.record_type,
            record_set.values,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            info!("[DRY-RUN] Would send POST request to {} with payload: {}", path, payload);
            return Ok(UpsertResult::DryRun);
        }

        let (status, body) = self.send(Method::POST, &path, &[], Some(payload)).await?;

        if !status.is_success() {
            return Err(Self::map_error(status, &body, "Record set change"));
        }

        let change_id = match xml::parse_change_id(&body) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Change accepted but response was unreadable: {}", e);
                None
            }
        };

        Ok(UpsertResult::Submitted { change_id })
    }

    fn store_name(&self) -> &'static str {
        "route53"
    }
}

/// Factory for creating Route 53 record stores
pub struct Route53Factory;

impl RecordStoreFactory for Route53Factory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>> {
        match config {
            ProviderConfig::Route53 {
                access_key_id,
                secret_access_key,
                session_token,
                region,
                endpoint,
                dry_run,
            } => {
                if *dry_run {
                    warn!("Route 53 store running in DRY-RUN mode - no changes will be made");
                }

                let credentials = Credentials {
                    access_key_id: access_key_id.clone(),
                    secret_access_key: secret_access_key.clone(),
                    session_token: session_token.clone(),
                };

                Ok(Box::new(Route53RecordStore::new(
                    credentials,
                    region.clone(),
                    endpoint.as_deref(),
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Route 53 record store")),
        }
    }
}

/// Register the Route 53 store with a registry
///
/// # Example
///
/// ```rust
/// use dnsagg_core::StoreRegistry;
///
/// let registry = StoreRegistry::with_builtin();
/// dnsagg_provider_route53::register(&registry);
/// assert!(registry.has_store("route53"));
/// ```
pub fn register(registry: &StoreRegistry) {
    registry.register_store("route53", Box::new(Route53Factory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret_key_12345".to_string(),
            session_token: None,
        }
    }

    fn route53_config(access_key_id: &str) -> ProviderConfig {
        ProviderConfig::Route53 {
            access_key_id: access_key_id.to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_factory_creation() {
        let store = Route53Factory.create(&route53_config("AKID")).unwrap();
        assert_eq!(store.store_name(), "route53");
    }

    #[test]
    fn test_factory_missing_key() {
        assert!(Route53Factory.create(&route53_config("")).is_err());
        assert!(Route53Factory.create(&ProviderConfig::Memory).is_err());
    }

    #[test]
    fn test_register() {
        let registry = StoreRegistry::with_builtin();
        register(&registry);
        assert_eq!(registry.list_stores(), vec!["memory", "route53"]);
    }

    #[test]
    fn test_endpoint_host_and_path() {
        let store = Route53RecordStore::new(credentials(), "us-east-1", None, false).unwrap();
        assert_eq!(store.host, "route53.amazonaws.com");
        assert_eq!(store.base_url, "https://route53.amazonaws.com");
        assert_eq!(
            store.rrset_path("/hostedzone/Z123"),
            "/2013-04-01/hostedzone/Z123/rrset"
        );

        let local = Route53RecordStore::new(credentials(), "us-east-1", Some("http://127.0.0.1:4566/"), true)
            .unwrap();
        assert_eq!(local.host, "127.0.0.1:4566");
        assert_eq!(local.rrset_path("Z9"), "/2013-04-01/hostedzone/Z9/rrset");
        assert!(local.is_dry_run());
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = Route53RecordStore::new(credentials(), "us-east-1", Some("not a url"), false).unwrap_err();
        assert_eq!(err.kind(), dnsagg_core::ErrorKind::Config);
    }

    #[test]
    fn test_error_mapping() {
        use dnsagg_core::ErrorKind;

        let no_zone = "<ErrorResponse><Error><Code>NoSuchHostedZone</Code><Message>nope</Message></Error></ErrorResponse>";
        let throttled = "<ErrorResponse><Error><Code>Throttling</Code><Message>Rate exceeded</Message></Error></ErrorResponse>";

        let err = Route53RecordStore::map_error(StatusCode::BAD_REQUEST, no_zone, "lookup");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = Route53RecordStore::map_error(StatusCode::BAD_REQUEST, throttled, "lookup");
        assert!(matches!(err, Error::RateLimited(_)));

        let err = Route53RecordStore::map_error(StatusCode::FORBIDDEN, "", "lookup");
        assert!(matches!(err, Error::Authentication(_)));

        let err = Route53RecordStore::map_error(StatusCode::SERVICE_UNAVAILABLE, "busy", "lookup");
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert!(err.to_string().contains("transient"));
    }

    #[test]
    fn test_fqdn() {
        assert_eq!(fqdn("all.example.com"), "all.example.com.");
        assert_eq!(fqdn("all.example.com."), "all.example.com.");
    }

    #[test]
    fn test_credentials_not_exposed_in_debug() {
        let store = Route53RecordStore::new(credentials(), "us-east-1", None, false).unwrap();

        let debug_str = format!("{:?}", store);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(!debug_str.contains("AKIDEXAMPLE"));
        assert!(debug_str.contains("Route53RecordStore"));
    }
}
