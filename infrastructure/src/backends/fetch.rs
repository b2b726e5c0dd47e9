//! URL fetch backend: `POST /fetch_url {url, params?, timeout?}`
//!
//! Only public http(s) targets are fetched. The host is checked before any
//! outbound request: `localhost` names and internal address literals are
//! refused, names are resolved once and refused if any answer is internal,
//! and the request is pinned to the checked addresses. Every other name the
//! client resolves, which means every redirect hop, goes through
//! [`PublicOnlyResolver`], so a public name that answers with an internal
//! address is refused wherever it appears in the chain.

use super::error::BackendApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use relay_domain::codes;
use relay_domain::tool::builtin::FETCH_ENDPOINT;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::{Host, Url};

const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub default_timeout: Duration,
    pub max_timeout: Duration,
    pub max_content_chars: usize,
    pub user_agent: String,
    /// Skip the internal-target checks. Never set from configuration.
    pub allow_internal: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(8),
            max_timeout: Duration::from_secs(30),
            max_content_chars: 2000,
            user_agent: format!("plan-relay/{}", env!("CARGO_PKG_VERSION")),
            allow_internal: false,
        }
    }
}

impl FetchSettings {
    /// Requested seconds, clamped to `max_timeout`; the default when absent or not positive.
    pub fn effective_timeout(&self, requested: Option<f64>) -> Duration {
        match requested {
            Some(secs) if secs.is_finite() && secs > 0.0 => {
                Duration::from_secs_f64(secs).min(self.max_timeout)
            }
            _ => self.default_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub timeout: Option<f64>,
}

pub fn router(settings: FetchSettings) -> Router {
    Router::new()
        .route(FETCH_ENDPOINT, post(fetch_url))
        .with_state(Arc::new(settings))
}

async fn fetch_url(
    State(settings): State<Arc<FetchSettings>>,
    payload: Result<Json<FetchRequest>, JsonRejection>,
) -> Result<Json<Value>, BackendApiError> {
    let Json(request) = payload?;
    Ok(Json(fetch(&request, &settings).await?))
}

pub async fn fetch(request: &FetchRequest, settings: &FetchSettings) -> Result<Value, BackendApiError> {
    let url = Url::parse(request.url.trim())
        .map_err(|e| BackendApiError::invalid_request(format!("invalid url: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BackendApiError::invalid_request(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let mut client = client_builder(settings);

    if !settings.allow_internal {
        if is_forbidden_url(&url) {
            warn!("fetch: refused internal target {}", url);
            return Err(forbidden(&url));
        }
        if let Some(Host::Domain(domain)) = url.host() {
            let addrs = resolve(domain, url.port_or_known_default().unwrap_or(80)).await?;
            if addrs.iter().any(|addr| is_internal_ip(addr.ip())) {
                warn!("fetch: {} resolves to an internal address", domain);
                return Err(forbidden(&url));
            }
            client = client.resolve_to_addrs(domain, &addrs);
        }
    }

    let client = client
        .build()
        .map_err(|e| BackendApiError::internal(format!("failed to build client: {}", e)))?;

    let params: Vec<(String, String)> = request
        .params
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect();

    let timeout = settings.effective_timeout(request.timeout);
    debug!("fetch: GET {} ({:?} timeout)", url, timeout);

    let response = client
        .get(url.clone())
        .query(&params)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| request_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BackendApiError::bad_gateway(
            codes::REMOTE_HTTP_ERROR,
            format!("remote answered {}", status),
        )
        .with_remote_status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let text = response.text().await.map_err(|e| request_error(e, timeout))?;
    let content: String = text.chars().take(settings.max_content_chars).collect();

    info!("fetch: {} -> {} ({} chars)", url, status.as_u16(), content.chars().count());

    Ok(json!({
        "status": "success",
        "url": request.url,
        "status_code": status.as_u16(),
        "content_type": content_type,
        "content": content,
    }))
}

fn forbidden(url: &Url) -> BackendApiError {
    BackendApiError::forbidden(
        codes::FORBIDDEN_TARGET,
        format!(
            "access to local network resources is forbidden: {}",
            url.host_str().unwrap_or_default()
        ),
    )
}

async fn resolve(domain: &str, port: u16) -> Result<Vec<SocketAddr>, BackendApiError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((domain, port))
        .await
        .map_err(|e| {
            BackendApiError::bad_gateway(
                codes::NETWORK_ERROR,
                format!("could not resolve {}: {}", domain, e),
            )
        })?
        .collect();
    if addrs.is_empty() {
        return Err(BackendApiError::bad_gateway(
            codes::NETWORK_ERROR,
            format!("{} has no addresses", domain),
        ));
    }
    Ok(addrs)
}

fn client_builder(settings: &FetchSettings) -> reqwest::ClientBuilder {
    let builder = reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .redirect(redirect_policy(settings.allow_internal));
    if settings.allow_internal {
        builder
    } else {
        builder.dns_resolver(Arc::new(PublicOnlyResolver))
    }
}

/// Name resolution that fails when any answer is an internal address.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(lookup_public(name.as_str().to_string()))
    }
}

async fn lookup_public(host: String) -> Result<Addrs, Box<dyn std::error::Error + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
    if addrs.is_empty() {
        return Err(format!("{} has no addresses", host).into());
    }
    if addrs.iter().any(|addr| is_internal_ip(addr.ip())) {
        warn!("fetch: {} resolves to an internal address", host);
        return Err(Box::new(InternalTarget { host }));
    }
    Ok(Box::new(addrs.into_iter()))
}

#[derive(Debug)]
struct InternalTarget {
    host: String,
}

impl fmt::Display for InternalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} resolves to an internal address", self.host)
    }
}

impl std::error::Error for InternalTarget {}

fn refused_by_resolver(err: &reqwest::Error) -> Option<&InternalTarget> {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(target) = cause.downcast_ref::<InternalTarget>() {
            return Some(target);
        }
        source = cause.source();
    }
    None
}

fn redirect_policy(allow_internal: bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if !allow_internal && is_forbidden_url(attempt.url()) {
            attempt.error("redirect to an internal address refused")
        } else {
            attempt.follow()
        }
    })
}

fn request_error(err: reqwest::Error, timeout: Duration) -> BackendApiError {
    if err.is_timeout() {
        BackendApiError::timeout(format!(
            "external fetch timed out after {} seconds",
            timeout.as_secs_f64()
        ))
    } else if err.is_redirect() {
        BackendApiError::forbidden(codes::FORBIDDEN_TARGET, err.to_string())
    } else if let Some(target) = refused_by_resolver(&err) {
        BackendApiError::forbidden(
            codes::FORBIDDEN_TARGET,
            format!("access to local network resources is forbidden: {}", target),
        )
    } else {
        BackendApiError::bad_gateway(codes::NETWORK_ERROR, format!("external request error: {}", err))
    }
}

/// `localhost` names and internal address literals
pub fn is_forbidden_url(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_internal_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_internal_ip(IpAddr::V6(ip)),
        None => true,
    }
}

/// Loopback, private, link-local, unspecified, shared, broadcast and multicast ranges
pub fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => is_internal_v4(ip),
        IpAddr::V6(ip) => is_internal_v6(ip),
    }
}

fn is_internal_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || a == 0
        || (a == 100 && (b & 0xc0) == 64)
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || ip.to_ipv4_mapped().is_some_and(is_internal_v4)
}
