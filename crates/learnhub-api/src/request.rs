// LearnHub
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Request context handed to middleware and handlers

use crate::auth::Claims;
use crate::error::{ApiError, ApiResult};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{HeaderMap, Method, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Form field that carries the overridden method
pub const METHOD_FIELD: &str = "_method";

/// A buffered request with everything the router extracted from it
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Effective method after any override
    pub method: Method,
    /// Method on the wire
    pub original_method: Method,
    /// Normalised path
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Decoded `application/x-www-form-urlencoded` fields
    pub form: HashMap<String, String>,
    /// Decoded path parameters of the matched route
    pub params: HashMap<String, String>,
    /// Set by the `auth` middleware
    pub claims: Option<Claims>,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str, query: Option<&str>, headers: HeaderMap, body: Bytes) -> Self {
        let mut request = Self {
            original_method: method.clone(),
            method,
            path: path.to_string(),
            query: query.map(parse_urlencoded).unwrap_or_default(),
            headers,
            body,
            form: HashMap::new(),
            params: HashMap::new(),
            claims: None,
        };
        if request.is_form() {
            request.form = parse_urlencoded(&String::from_utf8_lossy(&request.body));
        }
        request
    }

    /// Essence of the Content-Type header, e.g. `application/json`
    pub fn content_type(&self) -> Option<mime::Mime> {
        self.headers.get(header::CONTENT_TYPE)?.to_str().ok()?.parse().ok()
    }

    pub fn is_json(&self) -> bool {
        self.content_type().is_some_and(|m| m.essence_str() == mime::APPLICATION_JSON.essence_str() || m.suffix() == Some(mime::JSON))
    }

    pub fn is_form(&self) -> bool {
        self.content_type().is_some_and(|m| m.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
    }

    /// Path parameter captured by the route template
    pub fn param(&self, name: &str) -> ApiResult<&str> {
        self.params.get(name).map(String::as_str).ok_or_else(|| ApiError::InternalServerError {
            message: format!("Route has no parameter '{}'", name),
        })
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Authenticated caller
    pub fn claims(&self) -> ApiResult<&Claims> {
        self.claims.as_ref().ok_or_else(|| ApiError::Unauthorized {
            message: "No authentication information found".to_string(),
        })
    }

    /// Deserialize a JSON body
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        if self.body.is_empty() {
            return Err(ApiError::bad_request("Request body is required"));
        }
        serde_json::from_slice(&self.body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
    }

    /// Deserialize a JSON or form body. Form values are tried as plain strings
    /// first, then with numbers and booleans recognised.
    pub fn input<T: DeserializeOwned>(&self) -> ApiResult<T> {
        if !self.is_form() {
            return self.json();
        }
        serde_json::from_value(form_to_json(&self.form, false))
            .or_else(|_| serde_json::from_value(form_to_json(&self.form, true)))
            .map_err(|e| ApiError::bad_request(format!("Invalid form body: {}", e)))
    }

    /// Like [`ApiRequest::input`], but an empty body yields the default value
    pub fn input_or_default<T: DeserializeOwned + Default>(&self) -> ApiResult<T> {
        if self.body.is_empty() { Ok(T::default()) } else { self.input() }
    }
}

/// Decode `a=1&b=two` pairs; later keys win
pub fn parse_urlencoded(input: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(input.as_bytes()).into_owned().collect()
}

fn form_to_json(form: &HashMap<String, String>, typed: bool) -> serde_json::Value {
    let map = form
        .iter()
        .filter(|(key, _)| key.as_str() != METHOD_FIELD)
        .map(|(key, value)| {
            let value = if typed {
                if let Ok(n) = value.parse::<i64>() {
                    serde_json::Value::from(n)
                } else if let Ok(f) = value.parse::<f64>() {
                    serde_json::Value::from(f)
                } else if let Ok(b) = value.parse::<bool>() {
                    serde_json::Value::from(b)
                } else {
                    serde_json::Value::from(value.clone())
                }
            } else {
                serde_json::Value::from(value.clone())
            };
            (key.clone(), value)
        })
        .collect();
    serde_json::Value::Object(map)
}

/// JSON response with the given status
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> ApiResult<Response<Full<Bytes>>> {
    let response_json = serde_json::to_string(body)?;

    Ok(Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(response_json)))?)
}

/// 204 with an empty body
pub fn no_content() -> ApiResult<Response<Full<Bytes>>> {
    Ok(Response::builder().status(StatusCode::NO_CONTENT).body(Full::new(Bytes::new()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use serde::Deserialize;

    fn form_request(body: &str) -> ApiRequest {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"));
        ApiRequest::new(Method::POST, "/x", Some("q=rust+basics&page=2"), headers, Bytes::from(body.to_string()))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Heartbeat {
        seconds: u64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Rename {
        title: String,
    }

    #[test]
    fn test_query_and_form_are_decoded() {
        let request = form_request("_method=PUT&title=Caf%C3%A9+101");
        assert_eq!(request.query_param("q"), Some("rust basics"));
        assert_eq!(request.query_param("page"), Some("2"));
        assert_eq!(request.form.get(METHOD_FIELD).map(String::as_str), Some("PUT"));
        assert_eq!(request.form.get("title").map(String::as_str), Some("Café 101"));
    }

    #[test]
    fn test_form_input_coerces_numbers_only_when_needed() {
        assert_eq!(form_request("seconds=30").input::<Heartbeat>().unwrap(), Heartbeat { seconds: 30 });
        assert_eq!(form_request("title=2024").input::<Rename>().unwrap(), Rename { title: "2024".into() });
    }

    #[test]
    fn test_json_body_errors_are_bad_requests() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let request = ApiRequest::new(Method::POST, "/x", None, headers, Bytes::from_static(b"{not json"));
        assert!(request.is_json());
        assert!(matches!(request.json::<Heartbeat>(), Err(ApiError::BadRequest { .. })));
    }
}
