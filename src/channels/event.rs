//! Inbound webhook events

use bytes::Bytes;
use std::collections::HashMap;

/// Parameters, headers and raw body of one webhook request
#[derive(Debug, Clone, Default)]
pub struct InboundEvent {
    url: String,
    headers: HashMap<String, String>,
    params: Vec<(String, String)>,
    body: Bytes,
}

impl InboundEvent {
    /// Build an event from a raw HTTP request.
    ///
    /// Form-encoded bodies are decoded into parameters; JSON object bodies
    /// contribute their top-level string, number and boolean fields.
    /// Header names are lowercased.
    pub fn from_request(
        url: impl Into<String>,
        headers: impl IntoIterator<Item = (String, String)>,
        body: Bytes,
    ) -> Self {
        let headers: HashMap<String, String> = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();

        let is_json = headers
            .get("content-type")
            .is_some_and(|ct| ct.starts_with("application/json"));
        let params = if is_json {
            json_params(&body)
        } else {
            url::form_urlencoded::parse(&body).into_owned().collect()
        };

        Self {
            url: url.into(),
            headers,
            params,
            body,
        }
    }

    /// Build a form-encoded event from parameters; the body is re-encoded
    pub fn from_params<K, V>(url: impl Into<String>, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();

        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );

        Self {
            url: url.into(),
            headers,
            params,
            body: Bytes::from(body),
        }
    }

    /// Add or replace a header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Full request URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Header by lowercase name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// All headers (lowercase keys)
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Whether a parameter is present
    pub fn has(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    /// First value of a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All parameters in request order
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Raw request body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parameters as a JSON object; repeated names keep the first value
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (k, v) in &self.params {
            map.entry(k.clone())
                .or_insert_with(|| serde_json::Value::String(v.clone()));
        }
        serde_json::Value::Object(map)
    }
}

fn json_params(body: &[u8]) -> Vec<(String, String)> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body) else {
        return Vec::new();
    };
    map.into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            serde_json::Value::Number(n) => Some((k, n.to_string())),
            serde_json::Value::Bool(b) => Some((k, b.to_string())),
            _ => None,
        })
        .collect()
}
