use std::io::Read;

use http::method::InvalidMethod;
use http::Method;
use may_minihttp::Request;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::dispatcher::{parse_query, DispatchRequest, HeaderVec};
use crate::ids::{RequestId, REQUEST_ID_HEADER};

/// Decode a request body by content type.
///
/// Form bodies become a JSON object of strings (repeated keys: last wins); anything
/// else is parsed as JSON. Bodies that are neither yield `None`.
pub fn decode_body(content_type: &str, raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if mime == "application/x-www-form-urlencoded" {
        let fields: Map<String, Value> = url::form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        return Some(Value::Object(fields));
    }
    serde_json::from_str(raw).ok()
}

/// Convert a `may_minihttp::Request` into a [`DispatchRequest`].
///
/// # Errors
///
/// Fails when the request line carries a verb `http::Method` rejects.
pub fn parse_request(req: Request) -> Result<DispatchRequest, InvalidMethod> {
    let method = Method::from_bytes(req.method().as_bytes())?;
    let raw_path = req.path().to_string();
    let (path, query) = raw_path.split_once('?').unwrap_or((raw_path.as_str(), ""));

    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase()),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();
    let header_value = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    };
    let request_id = RequestId::from_header_or_new(header_value(REQUEST_ID_HEADER));
    let content_type = header_value("content-type").unwrap_or("").to_string();

    debug!(
        request_id = %request_id,
        header_count = headers.len(),
        "Headers extracted"
    );

    let query_params = parse_query(query);

    let mut raw_body = String::new();
    let body = match req.body().read_to_string(&mut raw_body) {
        Ok(size) if size > 0 => {
            let decoded = decode_body(&content_type, &raw_body);
            debug!(
                request_id = %request_id,
                body_size_bytes = size,
                content_type = %content_type,
                decoded = decoded.is_some(),
                "Request body read"
            );
            decoded
        }
        _ => None,
    };

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        query_param_count = query_params.len(),
        "HTTP request parsed"
    );

    Ok(DispatchRequest {
        request_id,
        method,
        path: path.to_string(),
        query_params,
        headers,
        body,
    })
}
