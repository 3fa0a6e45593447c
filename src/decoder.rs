//! Intent Decoder - Model Reply → Validated Intent
//!
//! Turns the inference service's free-form reply into an [`Intent`].
//!
//! Extraction is lenient: models wrap JSON in markdown fences or prose, so we
//! dig the object out wherever it is. Authorization is strict: only an action
//! from the closed [`Action`] set ever leaves this module as a syscall.
//! Everything else becomes [`Intent::Unknown`] with a short reason.
//!
//! No I/O, no shared state.

use crate::inference::InferenceError;
use crate::types::{Action, Intent, Params};
use regex::Regex;
use serde_json::{Map, Value};
use std::ops::Range;
use std::sync::OnceLock;

pub const MALFORMED_PAYLOAD: &str = "malformed payload";
pub const MISSING_ACTION: &str = "missing action";
pub const INFERENCE_TIMEOUT: &str = "inference timeout";

const MODEL_DECLINED: &str = "model could not map the request";

/// Longest slice of an offending action name echoed back in a reason
const MAX_REASON_ACTION_CHARS: usize = 40;

/// Field names models use instead of the canonical parameter keys.
///
/// Applied inside `params` in table order. An alias is renamed to its
/// canonical key only when that key is absent.
pub const PARAM_ALIASES: &[(&str, &str)] = &[
    ("filename", "path"),
    ("file_name", "path"),
    ("file_path", "path"),
    ("filepath", "path"),
    ("file", "path"),
    ("file_content", "content"),
    ("contents", "content"),
    ("body", "content"),
    ("text", "content"),
    ("website", "url"),
    ("site", "url"),
    ("address", "url"),
    ("link", "url"),
    ("app", "name"),
    ("app_name", "name"),
    ("application", "name"),
];

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z][A-Za-z0-9_+.-]*)?(.*?)```")
            .expect("fence pattern compiles")
    })
}

/// Decode a raw model reply into an intent. Never panics, never fails.
pub fn decode(raw: &str) -> Intent {
    let Some(candidate) = extract_payload(raw) else {
        return Intent::unknown(MALFORMED_PAYLOAD);
    };

    let object = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => object,
        Ok(_) | Err(_) => return Intent::unknown(MALFORMED_PAYLOAD),
    };

    if object.is_empty() {
        return Intent::unknown(MALFORMED_PAYLOAD);
    }

    validate(normalize(object))
}

/// Decode the outcome of an inference call; transport failures become `Unknown`.
pub fn decode_reply(reply: Result<String, InferenceError>) -> Intent {
    match reply {
        Ok(raw) => decode(&raw),
        Err(InferenceError::Timeout) => Intent::unknown(INFERENCE_TIMEOUT),
        Err(e) => Intent::unknown(format!("inference unavailable: {e}")),
    }
}

/// Locate the JSON object candidate inside a reply.
///
/// A fenced block wins over bare text, and a `json`-tagged fence wins over
/// any other fence. The object is read with a JSON-aware scan from the first
/// `{` after the fence opener, so backticks inside string values never close
/// the fence early. A fence that sits inside a string of a bare object is not
/// a fence at all; the bare object is taken instead. Returns `None` when no
/// object can be present.
pub fn extract_payload(raw: &str) -> Option<&str> {
    let text = raw.trim();
    let bare = leading_object(text);

    if let Some(fence) = chosen_fence(text) {
        let nested = bare
            .as_ref()
            .is_some_and(|span| span.start < fence.start && fence.start < span.end);

        if !nested {
            let after_opener = &text[fence.body_start..];
            if let Some(span) = leading_object(after_opener) {
                return Some(&after_opener[span]);
            }
            let body = fence.body.trim();
            return Some(object_span(body).unwrap_or(body));
        }
    }

    match bare {
        Some(span) => Some(&text[span]),
        None => object_span(text),
    }
}

struct Fence<'a> {
    start: usize,
    body_start: usize,
    body: &'a str,
}

fn chosen_fence(text: &str) -> Option<Fence<'_>> {
    let mut first = None;
    for caps in fence_pattern().captures_iter(text) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let fence = Fence {
            start: whole.start(),
            body_start: body.start(),
            body: body.as_str(),
        };

        if caps
            .get(1)
            .is_some_and(|tag| tag.as_str().eq_ignore_ascii_case("json"))
        {
            return Some(fence);
        }
        first.get_or_insert(fence);
    }
    first
}

/// Byte range of the complete JSON object opening at the first `{`.
fn leading_object(text: &str) -> Option<Range<usize>> {
    let start = text.find('{')?;
    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Object(_))) => Some(start..start + stream.byte_offset()),
        _ => None,
    }
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Normalize key aliases. Idempotent.
///
/// - `intent` is copied to `action` when `action` is absent
/// - missing `params` is synthesized from the other top-level fields
/// - [`PARAM_ALIASES`] are applied inside `params`
pub fn normalize(mut object: Map<String, Value>) -> Map<String, Value> {
    if !object.contains_key("action") {
        if let Some(intent) = object.get("intent").cloned() {
            object.insert("action".to_string(), intent);
        }
    }

    match object.get("params") {
        None => {
            let params: Map<String, Value> = object
                .iter()
                .filter(|(key, _)| key.as_str() != "action" && key.as_str() != "intent")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            object.insert("params".to_string(), Value::Object(params));
        }
        Some(Value::Null) => {
            object.insert("params".to_string(), Value::Object(Map::new()));
        }
        Some(_) => {}
    }

    if let Some(Value::Object(params)) = object.get_mut("params") {
        apply_aliases(params);
    }

    object
}

fn apply_aliases(params: &mut Map<String, Value>) {
    for (alias, canonical) in PARAM_ALIASES {
        if params.contains_key(*canonical) {
            continue;
        }
        if let Some(value) = params.remove(*alias) {
            params.insert((*canonical).to_string(), value);
        }
    }
}

fn validate(object: Map<String, Value>) -> Intent {
    let name = match object.get("action") {
        None | Some(Value::Null) => return Intent::unknown(MISSING_ACTION),
        Some(Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
    };

    if name == "unknown" {
        let reason = object
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(MODEL_DECLINED);
        return Intent::unknown(reason);
    }

    let Some(action) = Action::from_name(&name) else {
        return Intent::unknown(format!("unsupported action: {}", printable(&name)));
    };

    let params = match object.get("params") {
        Some(Value::Object(params)) => params
            .iter()
            .filter_map(|(key, value)| param_text(value).map(|text| (key.clone(), text)))
            .collect::<Params>(),
        _ => return Intent::unknown(MALFORMED_PAYLOAD),
    };

    Intent::syscall(action, params)
}

fn param_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}

/// Short, single-line rendition of an untrusted action name.
fn printable(name: &str) -> String {
    let mut out: String = name
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_REASON_ACTION_CHARS)
        .collect();
    if name.chars().count() > MAX_REASON_ACTION_CHARS {
        out.push('…');
    }
    out
}
