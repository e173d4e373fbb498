//! Data responses: JSON, XML, raw bytes, bare statuses and redirects

use axum::http::{
    header::{CONTENT_TYPE, LOCATION},
    HeaderValue, Method, StatusCode,
};
use serde::Serialize;
use std::sync::Arc;

use super::Render;
use crate::{
    error::RenderError,
    response::{write_error, ResponseWriter, CONTENT_BINARY, CONTENT_HTML, CONTENT_JSON, CONTENT_XML},
    template::helpers::escape_attr,
};

const REDIRECT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

impl<W: ResponseWriter> Render<W> {
    /// Write `value` as JSON
    ///
    /// Pretty-printed when `indent_json` is set. The configured JSON prefix is
    /// written between the status and the body. A serialization failure
    /// becomes a 500 response carrying the error text.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        match self.marshal_json(value) {
            Ok(body) => {
                let options = Arc::clone(&self.renderer.options);
                self.write_payload(status, CONTENT_JSON, &options.prefix_json, &body);
            }
            Err(err) => self.fail(&err),
        }
    }

    /// Serialize `value` as JSON without writing anything
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Json`] when `value` cannot be serialized.
    pub fn json_string<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, RenderError> {
        let body = self.marshal_json(value)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Write `value` as XML
    ///
    /// Same flow as [`Render::json`] with `indent_xml` and `prefix_xml`.
    pub fn xml<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        match self.marshal_xml(value) {
            Ok(body) => {
                let options = Arc::clone(&self.renderer.options);
                self.write_payload(status, CONTENT_XML, &options.prefix_xml, body.as_bytes());
            }
            Err(err) => self.fail(&err),
        }
    }

    /// Write raw bytes, `application/octet-stream` unless a content type is set
    pub fn raw_data(&mut self, status: StatusCode, bytes: &[u8]) {
        self.data(status, CONTENT_BINARY, bytes);
    }

    /// Write pre-rendered HTML bytes, `text/html` unless a content type is set
    pub fn render_data(&mut self, status: StatusCode, bytes: &[u8]) {
        self.data(status, CONTENT_HTML, bytes);
    }

    /// Write `status`, then `message` as the body if given
    pub fn error(&mut self, status: StatusCode, message: Option<&str>) {
        self.writer.write_status(status);
        if let Some(message) = message {
            self.writer.write(message.as_bytes());
        }
    }

    /// Write `status` only
    pub fn status(&mut self, status: StatusCode) {
        self.writer.write_status(status);
    }

    /// Redirect to `location`, with `302 Found` unless `status` is given
    ///
    /// A location without scheme or host is resolved against the request
    /// path and cleaned. `GET` and `HEAD` requests get an HTML content type
    /// if none is set, and `GET` requests a short HTML body with the link.
    pub fn redirect(&mut self, location: &str, status: Option<StatusCode>) {
        let status = status.unwrap_or(StatusCode::FOUND);
        let location = if is_absolute_url(location) {
            location.to_string()
        } else {
            resolve_location(self.uri.path(), location)
        };

        match HeaderValue::from_str(&location) {
            Ok(value) => {
                self.writer.headers_mut().insert(LOCATION, value);
            }
            Err(err) => {
                tracing::warn!(location = %location, error = %err, "invalid redirect location");
            }
        }

        let is_get = self.method == Method::GET;
        if (is_get || self.method == Method::HEAD) && !self.writer.headers().contains_key(CONTENT_TYPE) {
            self.writer
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(REDIRECT_CONTENT_TYPE));
        }
        self.writer.write_status(status);

        if is_get {
            let body = format!(
                "<a href=\"{}\">{}</a>.\n",
                escape_attr(&location),
                status.canonical_reason().unwrap_or_default()
            );
            self.writer.write(body.as_bytes());
        }
    }

    fn marshal_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, RenderError> {
        let body = if self.renderer.options.indent_json {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(body)
    }

    fn marshal_xml<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, RenderError> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut body);
        if self.renderer.options.indent_xml {
            serializer.indent(' ', 2);
        }
        value.serialize(serializer)?;
        Ok(body)
    }

    fn write_payload(&mut self, status: StatusCode, media_type: &str, prefix: &[u8], body: &[u8]) {
        self.set_content_type(media_type);
        self.writer.write_status(status);
        if !prefix.is_empty() {
            self.writer.write(prefix);
        }
        self.writer.write(body);
    }

    fn data(&mut self, status: StatusCode, default_type: &'static str, bytes: &[u8]) {
        let has_type = self
            .writer
            .headers()
            .get(CONTENT_TYPE)
            .is_some_and(|value| !value.is_empty());
        if !has_type {
            self.writer
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(default_type));
        }
        self.writer.write_status(status);
        self.writer.write(bytes);
    }

    /// Set `media_type` plus the charset suffix as the content type
    pub(super) fn set_content_type(&mut self, media_type: &str) {
        let value = format!("{media_type}{}", self.renderer.charset);
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                self.writer.headers_mut().insert(CONTENT_TYPE, value);
            }
            Err(err) => {
                tracing::warn!(content_type = %value, error = %err, "invalid content type");
            }
        }
    }

    /// Log a per-request failure and answer with a 500
    pub(super) fn fail(&mut self, err: &RenderError) {
        tracing::error!(
            method = %self.method,
            uri = %self.uri,
            error = %err,
            "render failed"
        );
        write_error(&mut self.writer, StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
    }
}

/// Whether `location` carries a scheme or a host
fn is_absolute_url(location: &str) -> bool {
    if location.starts_with("//") {
        return true;
    }
    let Some(colon) = location.find(':') else {
        return false;
    };
    let scheme = &location[..colon];
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resolve a relative redirect target against the request path
///
/// The query string is kept as is, a trailing slash survives cleaning.
fn resolve_location(request_path: &str, location: &str) -> String {
    let request_path = if request_path.is_empty() { "/" } else { request_path };

    let joined = if location.starts_with('/') {
        location.to_string()
    } else {
        let dir = request_path.rfind('/').map_or("", |i| &request_path[..=i]);
        format!("{dir}{location}")
    };

    let (path, query) = joined
        .find('?')
        .map_or((joined.as_str(), ""), |i| joined.split_at(i));

    let mut cleaned = clean_path(path);
    if path.ends_with('/') && !cleaned.ends_with('/') {
        cleaned.push('/');
    }
    cleaned.push_str(query);
    cleaned
}

/// Lexically normalize a slash-separated path
///
/// Collapses repeated slashes, drops `.` segments and resolves `..` against
/// the preceding segment. `..` never climbs above a rooted path.
fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            _ => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
