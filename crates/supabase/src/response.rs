//! Response Normalizer: best-effort decoding of PostgREST bodies.
//!
//! The body is tried as an array of objects, then as a single object.
//! Anything else is kept as raw text and reported through `tracing`; it is
//! never an error.

use serde_json::Value;
use tracing::{debug, warn};

use crate::request::{header, Headers, OperationKind, Row};

/// What the transport handed back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    /// `None` when the transport produced no body at all.
    pub body: Option<Vec<u8>>,
}

impl RawResponse {
    /// Convenience constructor with a UTF-8 body and no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Some(body.into().into_bytes()),
        }
    }

    /// Same response with one more header value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }
}

/// Outcome of decoding a body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// No body, or only whitespace.
    Empty,
    /// An array of objects, or a single object wrapped in a list.
    Rows(Vec<Row>),
    /// Present but neither shape; holds the decoder's message.
    Unparsed(String),
}

impl ParsedBody {
    /// Decoded rows; empty unless this is [`ParsedBody::Rows`].
    pub fn rows(&self) -> &[Row] {
        match self {
            ParsedBody::Rows(rows) => rows,
            ParsedBody::Empty | ParsedBody::Unparsed(_) => &[],
        }
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(self, ParsedBody::Unparsed(_))
    }
}

/// Decode `text` as rows, falling back from array to object.
pub fn parse_rows(text: &str) -> ParsedBody {
    if text.trim().is_empty() {
        return ParsedBody::Empty;
    }

    let array_err = match serde_json::from_str::<Vec<Row>>(text) {
        Ok(rows) => return ParsedBody::Rows(rows),
        Err(e) => e,
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(row)) => ParsedBody::Rows(vec![row]),
        Ok(_) => ParsedBody::Unparsed(array_err.to_string()),
        Err(e) => ParsedBody::Unparsed(e.to_string()),
    }
}

/// Decoded body plus everything derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub body: ParsedBody,
    /// Body text exactly as received; `None` only when there was no body.
    pub raw_body: Option<String>,
    pub count: usize,
}

/// Decode `response` for an operation of `kind`.
///
/// With `decode_rows` false the body is kept raw but no rows are produced.
/// For deletes a numeric `Content-Range` total overrides the row count.
pub fn normalize(kind: OperationKind, decode_rows: bool, response: &RawResponse) -> NormalizedResponse {
    let raw_body = response
        .body
        .as_deref()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());

    let body = match raw_body.as_deref() {
        Some(text) if decode_rows => parse_rows(text),
        _ => ParsedBody::Empty,
    };

    if let ParsedBody::Unparsed(reason) = &body {
        warn!(operation = %kind, status = response.status, "failed to parse response as JSON: {reason}");
    }

    let mut count = body.rows().len();
    if kind == OperationKind::Delete {
        if let Some(total) = content_range_total(&response.headers) {
            count = total;
        }
    }

    NormalizedResponse { body, raw_body, count }
}

/// Total from a `Content-Range: <range>/<total>` header.
///
/// `None` when the header is absent, the total is `*`, or it is not a number.
pub fn content_range_total(headers: &Headers) -> Option<usize> {
    let range = header_value(headers, header::CONTENT_RANGE)?;
    let (_, total) = range.split_once('/')?;
    let total = total.trim();
    if total == "*" {
        return None;
    }
    match total.parse() {
        Ok(n) => Some(n),
        Err(e) => {
            debug!("could not parse Content-Range header '{range}': {e}");
            None
        }
    }
}

fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}
