//! Output sinks for rendered responses
//!
//! The renderer writes through the [`ResponseWriter`] trait: header mutation,
//! a single status write, and body writes. [`ResponseBuffer`] is the sink used
//! with axum; it collects everything and converts into a [`Response`].

use axum::{
    body::Body,
    http::{
        header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};

/// `Content-Type` header name
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// `Content-Length` header name
pub const CONTENT_LENGTH_HEADER: &str = "Content-Length";

/// Media type of raw binary payloads
pub const CONTENT_BINARY: &str = "application/octet-stream";

/// Media type of JSON payloads
pub const CONTENT_JSON: &str = "application/json";

/// Media type of HTML payloads
pub const CONTENT_HTML: &str = "text/html";

/// Media type of XHTML payloads
pub const CONTENT_XHTML: &str = "application/xhtml+xml";

/// Media type of XML payloads
pub const CONTENT_XML: &str = "text/xml";

/// Content type used for plain-text error bodies
pub const CONTENT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Sink a request renderer writes its response into
pub trait ResponseWriter {
    /// Response headers
    fn headers(&self) -> &HeaderMap;

    /// Mutable response headers
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Write the status line
    ///
    /// Only the first status write takes effect.
    fn write_status(&mut self, status: StatusCode);

    /// Append bytes to the body
    ///
    /// Writing before any status implies `200 OK`.
    fn write(&mut self, bytes: &[u8]);
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers(&self) -> &HeaderMap {
        (**self).headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        (**self).write_status(status);
    }

    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes);
    }
}

/// In-memory response sink
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status written so far, `200 OK` if none was written
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Whether a status has been written
    #[must_use]
    pub const fn status_written(&self) -> bool {
        self.status.is_some()
    }

    /// Body bytes written so far
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Value of the `Content-Type` header, if set and valid UTF-8
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

impl ResponseWriter for ResponseBuffer {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        match self.status {
            Some(written) => {
                tracing::warn!(
                    written = written.as_u16(),
                    ignored = status.as_u16(),
                    "superfluous status write"
                );
            }
            None => self.status = Some(status),
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }
}

impl IntoResponse for ResponseBuffer {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

/// Write a plain-text error response
///
/// Sets a plain-text content type, disables sniffing, writes the status and
/// then the message followed by a newline.
pub fn write_error<W: ResponseWriter + ?Sized>(writer: &mut W, status: StatusCode, message: &str) {
    let headers = writer.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_PLAIN_UTF8));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    writer.write_status(status);
    writer.write(message.as_bytes());
    writer.write(b"\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_status_wins() {
        let mut buf = ResponseBuffer::new();
        buf.write_status(StatusCode::CREATED);
        buf.write_status(StatusCode::NOT_FOUND);
        assert_eq!(buf.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_write_implies_ok() {
        let mut buf = ResponseBuffer::new();
        buf.write(b"body");
        assert!(buf.status_written());
        buf.write_status(StatusCode::ACCEPTED);
        assert_eq!(buf.status(), StatusCode::OK);
        assert_eq!(buf.body(), b"body");
    }

    #[test]
    fn test_write_error() {
        let mut buf = ResponseBuffer::new();
        write_error(&mut buf, StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(buf.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(buf.content_type(), Some(CONTENT_PLAIN_UTF8));
        assert_eq!(buf.body(), b"boom\n");
    }

    #[test]
    fn test_into_response_keeps_headers() {
        let mut buf = ResponseBuffer::new();
        buf.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_JSON));
        buf.write_status(StatusCode::CREATED);

        let response = buf.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), CONTENT_JSON);
    }

    #[test]
    fn test_into_response_without_content_type() {
        let response = ResponseBuffer::new().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }
}
