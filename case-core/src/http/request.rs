use crate::error::ClientError;
use crate::observability::correlation_headers;
use reqwest::{Client, RequestBuilder, Url};
use secrecy::{ExposeSecret, Secret};
use serde_json::{Map, Value};
use std::fmt;

/// Field name → value map sent with a request.
pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// GET and DELETE carry their payload as query parameters.
    pub fn sends_query(self) -> bool {
        matches!(self, Method::Get | Method::Delete)
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One API call: method, path relative to the base URL, optional payload.
///
/// Kept whole so the call can be replayed after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub payload: Option<Payload>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn url(&self, base_url: &Url) -> Result<Url, ClientError> {
        base_url
            .join(self.path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidPath(format!("{}: {}", self.path, e)))
    }

    pub(crate) fn build(
        &self,
        client: &Client,
        base_url: &Url,
        access_token: &Secret<String>,
        request_id: &str,
    ) -> Result<RequestBuilder, ClientError> {
        let mut request = client
            .request(self.method.to_reqwest(), self.url(base_url)?)
            .bearer_auth(access_token.expose_secret())
            .headers(correlation_headers(request_id));

        if let Some(payload) = &self.payload {
            request = if self.method.sends_query() {
                request.query(&query_pairs(payload))
            } else {
                request.json(payload)
            };
        }

        Ok(request)
    }
}

/// Flatten a payload into query pairs. Arrays repeat the key; nulls are dropped.
fn query_pairs(payload: &Payload) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(payload.len());
    for (key, value) in payload {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(rendered) = query_value(item) {
                        pairs.push((key.clone(), rendered));
                    }
                }
            }
            other => {
                if let Some(rendered) = query_value(other) {
                    pairs.push((key.clone(), rendered));
                }
            }
        }
    }
    pairs
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse a configured base URL, making sure relative paths join beneath it.
pub fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| ClientError::InvalidPath(format!("{}: {}", raw, e)))
}

/// Turn a JSON object into a payload; anything else is not a payload.
pub fn into_payload(value: Value) -> Option<Payload> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let base = parse_base_url("http://localhost:8000/api").unwrap();
        assert_eq!(base.as_str(), "http://localhost:8000/api/");

        let descriptor = RequestDescriptor::new(Method::Get, "/investigation/search/");
        assert_eq!(
            descriptor.url(&base).unwrap().as_str(),
            "http://localhost:8000/api/investigation/search/"
        );
    }

    #[test]
    fn test_query_pairs_flatten_payload() {
        let payload = into_payload(json!({
            "status": "open",
            "page": 2,
            "officer": null,
            "tag": ["a", "b"],
        }))
        .unwrap();

        let mut pairs = query_pairs(&payload);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "2".to_string()),
                ("status".to_string(), "open".to_string()),
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_attaches_bearer_and_request_id() {
        let base = parse_base_url("http://localhost:8000/api/").unwrap();
        let descriptor = RequestDescriptor::new(Method::Post, "investigation/seizure/")
            .with_payload(into_payload(json!({ "value": 1200 })).unwrap());

        let request = descriptor
            .build(
                &Client::new(),
                &base,
                &Secret::new("T1".to_string()),
                "req-1",
            )
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.method(), &reqwest::Method::POST);
        assert_eq!(request.headers()["authorization"], "Bearer T1");
        assert_eq!(request.headers()["x-request-id"], "req-1");
        assert_eq!(
            request.url().as_str(),
            "http://localhost:8000/api/investigation/seizure/"
        );
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(serde_json::from_slice::<Value>(body).unwrap(), json!({ "value": 1200 }));
    }

    #[test]
    fn test_get_sends_payload_as_query() {
        let base = parse_base_url("http://localhost:8000/api/").unwrap();
        let descriptor = RequestDescriptor::new(Method::Get, "investigation/summons/")
            .with_payload(into_payload(json!({ "status": "issued" })).unwrap());

        let request = descriptor
            .build(&Client::new(), &base, &Secret::new("T1".to_string()), "req-2")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.url().query(), Some("status=issued"));
        assert!(request.body().is_none());
    }

    #[test]
    fn test_into_payload_rejects_non_objects() {
        assert!(into_payload(json!([1, 2])).is_none());
        assert!(into_payload(json!("text")).is_none());
    }
}
