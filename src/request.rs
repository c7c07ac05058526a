use std::collections::HashMap;

use actix_web::http::header::HOST;
use actix_web::HttpRequest;
use log::debug;
use serde_json::Value;
use url::form_urlencoded;
use uuid::Uuid;

/// Headers carrying the language of the caller, by priority.
const LANGUAGE_HEADERS: [&str; 3] = ["x-lang-code", "x-language-code", "x-language"];

/// Resolves the identifier used to tag the log lines of a request.
pub trait RequestIdProvider: Send + Sync {
    fn request_id(&self, req: &HttpRequest) -> String;
}

/// Reads `X-Request-Id` or `X-Correlation-Id`, generates a uuid otherwise.
pub struct HeaderRequestIdProvider;

impl HeaderRequestIdProvider {
    const HEADERS: [&'static str; 2] = ["x-request-id", "x-correlation-id"];
}

impl RequestIdProvider for HeaderRequestIdProvider {
    fn request_id(&self, req: &HttpRequest) -> String {
        Self::HEADERS
            .iter()
            .filter_map(|name| req.headers().get(*name))
            .filter_map(|value| value.to_str().ok())
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

/// The parts of an HTTP request the guard decides on.
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    pub method: String,

    /// Path and query string, as requested.
    pub url: String,
    pub path: String,

    /// Without the port.
    pub hostname: Option<String>,
    pub ip: Option<String>,

    /// Keys are lower-cased.
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub params: HashMap<String, String>,

    pub body: Option<Value>,

    pub request_id: String,
    pub language: Option<String>,
}

impl AccessRequest {
    pub fn new(method: &str, url: &str) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, query),
            None => (url, ""),
        };
        Self {
            method: method.to_uppercase(),
            url: String::from(url),
            path: String::from(path),
            query: parse_query(query),
            request_id: Uuid::new_v4().to_string(),
            ..Default::default()
        }
    }

    pub fn from_http(req: &HttpRequest, trust_proxy: bool, ids: &dyn RequestIdProvider) -> Self {
        let url = match req.uri().path_and_query() {
            Some(pq) => pq.as_str().to_string(),
            None => req.path().to_string(),
        };

        let mut headers = HashMap::new();
        for (key, value) in req.headers() {
            let value = match value.to_str() {
                Ok(value) => value.to_string(),
                Err(_) => continue,
            };
            headers.insert(key.as_str().to_lowercase(), value);
        }

        let (host, addr) = if trust_proxy {
            let info = req.connection_info();
            (
                Some(info.host().to_string()),
                info.realip_remote_addr().map(String::from),
            )
        } else {
            let host = headers
                .get(HOST.as_str())
                .cloned()
                .or_else(|| req.uri().host().map(String::from));
            (host, req.peer_addr().map(|addr| addr.ip().to_string()))
        };

        let params = req
            .match_info()
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        let language = LANGUAGE_HEADERS
            .iter()
            .filter_map(|name| headers.get(*name))
            .find(|value| !value.is_empty())
            .cloned();

        let parsed = Self {
            method: req.method().as_str().to_string(),
            url,
            path: req.path().to_string(),
            hostname: host.as_deref().map(strip_port).map(String::from),
            ip: addr.as_deref().map(strip_port).map(String::from),
            headers,
            query: parse_query(req.query_string()),
            params,
            body: None,
            request_id: ids.request_id(req),
            language,
        };
        debug!(
            "Req[{}] - {} {}, hostname: {:?}, ip: {:?}",
            parsed.request_id, parsed.method, parsed.url, parsed.hostname, parsed.ip
        );
        parsed
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_lowercase(), String::from(value));
        if LANGUAGE_HEADERS.contains(&name.to_lowercase().as_str()) && self.language.is_none() {
            self.language = Some(String::from(value));
        }
        self
    }

    pub fn with_origin(mut self, hostname: Option<&str>, ip: Option<&str>) -> Self {
        self.hostname = hostname.map(String::from);
        self.ip = ip.map(String::from);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Removes the port from `host:port`, `[v6]:port` and bare `[v6]` forms.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        // A bare IPv6 address contains several colons.
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}
