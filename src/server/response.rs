use std::collections::HashSet;
use std::sync::Mutex;

use may_minihttp::Response;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::dispatcher::HandlerResponse;

/// Upper bound on distinct header lines kept for the process lifetime.
const MAX_INTERNED_HEADERS: usize = 4096;

/// `may_minihttp` only accepts `&'static str` header lines. Header lines are
/// interned here so each distinct line is leaked once.
static HEADER_LINES: Lazy<Mutex<HashSet<&'static str>>> = Lazy::new(|| Mutex::new(HashSet::new()));

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Canonical `Name: value` line for a header, title-cased like the wire convention.
fn header_line(name: &str, value: &str) -> String {
    let name: Vec<String> = name
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    format!("{}: {}", name.join("-"), value)
}

fn intern(line: String) -> Option<&'static str> {
    let mut lines = HEADER_LINES
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(existing) = lines.get(line.as_str()) {
        return Some(*existing);
    }
    if lines.len() >= MAX_INTERNED_HEADERS {
        return None;
    }
    let leaked: &'static str = Box::leak(line.into_boxed_str());
    lines.insert(leaked);
    Some(leaked)
}

/// Write a dispatcher response onto the wire.
pub fn write_handler_response(res: &mut Response, resp: HandlerResponse) {
    res.status_code(resp.status as usize, status_reason(resp.status));
    for (name, value) in &resp.headers {
        let line = header_line(name, value);
        match intern(line) {
            Some(line) => {
                res.header(line);
            }
            None => warn!(header = %name, "Header dropped: interned header limit reached"),
        }
    }
    res.body_vec(resp.body);
}

pub fn write_json_error(res: &mut Response, status: u16, message: &str) {
    write_handler_response(res, HandlerResponse::error(status, message));
}
