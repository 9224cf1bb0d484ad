//! Minimal HTTP/1.1 request-line parsing and response framing
//!
//! Only what the control surface needs: method and path from the request line,
//! and a `Connection: close` response with an explicit `Content-Length`.
//! Headers and bodies of requests are ignored.

use core::fmt::{self, Write};

use alloc::string::String;
use thiserror_no_std::Error;

/// Upper bound on a request head the control surface will buffer
pub const MAX_REQUEST_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Other,
}

impl Method {
    fn parse(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            _ => Self::Other,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    #[error("Request is not valid UTF-8")]
    NotUtf8,
    #[error("Request line is incomplete")]
    Incomplete,
    #[error("Request line is malformed")]
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: Method,
    /// Path with any query string removed
    pub path: &'a str,
}

impl<'a> Request<'a> {
    /// Parses the request line from a buffered request head.
    ///
    /// The request line must be terminated by CRLF (or a bare LF).
    pub fn parse(head: &'a [u8]) -> Result<Self, RequestError> {
        let line_end = head
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(RequestError::Incomplete)?;
        let line = core::str::from_utf8(&head[..line_end]).map_err(|_| RequestError::NotUtf8)?;
        let line = line.strip_suffix('\r').unwrap_or(line);

        let mut parts = line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(RequestError::Malformed);
        };

        if !version.starts_with("HTTP/1.") || !target.starts_with('/') {
            return Err(RequestError::Malformed);
        }

        let path = target.split(['?', '#']).next().unwrap_or(target);

        Ok(Self {
            method: Method::parse(method),
            path,
        })
    }
}

/// Whether a buffered request head is complete (blank line seen).
pub fn head_complete(buf: &[u8]) -> bool {
    buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.windows(2).any(|w| w == b"\n\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    ServiceUnavailable,
}

impl Status {
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotFound => 404,
            Self::ServiceUnavailable => 503,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "Not Found",
            Self::ServiceUnavailable => "Service Unavailable",
        }
    }
}

pub mod content_type {
    pub const HTML: &str = "text/html";
    pub const PLAIN: &str = "text/plain";
    pub const JSON: &str = "application/json";
    pub const CSV: &str = "text/csv";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Static(&'static str),
    Owned(String),
}

impl Body {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Static(s) => s,
            Self::Owned(s) => s.as_str(),
        }
    }
}

/// A complete response; the body is rendered before the head is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    /// File name offered for download, if any
    pub attachment: Option<&'static str>,
    pub body: Body,
}

impl Response {
    pub fn ok(content_type: &'static str, body: Body) -> Self {
        Self {
            status: Status::Ok,
            content_type,
            attachment: None,
            body,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            content_type: content_type::PLAIN,
            attachment: None,
            body: Body::Static("404: Not found"),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status: Status::ServiceUnavailable,
            content_type: content_type::PLAIN,
            attachment: None,
            body: Body::Static("503: Log too large to export"),
        }
    }

    pub fn with_attachment(mut self, file_name: &'static str) -> Self {
        self.attachment = Some(file_name);
        self
    }

    pub fn body(&self) -> &str {
        self.body.as_str()
    }

    pub fn write_head<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body().len()
        )?;
        if let Some(file_name) = self.attachment {
            write!(
                out,
                "Content-Disposition: attachment; filename={}\r\n",
                file_name
            )?;
        }
        out.write_str("Connection: close\r\n\r\n")
    }

    pub fn head(&self) -> String {
        let mut head = String::new();
        // Writing to a String cannot fail
        let _ = self.write_head(&mut head);
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_request() {
        let req = Request::parse(b"GET /data HTTP/1.1\r\nHost: 192.168.4.1\r\n\r\n").unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/data");
    }

    #[test]
    fn test_parse_strips_query() {
        let req = Request::parse(b"GET /download?t=17 HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(req.path, "/download");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Request::parse(b"GET /data"), Err(RequestError::Incomplete));
        assert_eq!(
            Request::parse(b"\xff\xfe / HTTP/1.1\r\n"),
            Err(RequestError::NotUtf8)
        );
        assert_eq!(
            Request::parse(b"GET data HTTP/1.1\r\n"),
            Err(RequestError::Malformed)
        );
        assert_eq!(
            Request::parse(b"GET / SPDY/3\r\n"),
            Err(RequestError::Malformed)
        );
        assert_eq!(Request::parse(b"\r\n"), Err(RequestError::Malformed));
    }

    #[test]
    fn test_head_complete() {
        assert!(!head_complete(b"GET / HTTP/1.1\r\nHost: x\r\n"));
        assert!(head_complete(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"));
    }

    #[test]
    fn test_response_head() {
        let response = Response::ok(content_type::CSV, Body::Owned("a,b\n".into()))
            .with_attachment("thrust_data.csv");
        assert_eq!(
            response.head(),
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/csv\r\n\
             Content-Length: 4\r\n\
             Content-Disposition: attachment; filename=thrust_data.csv\r\n\
             Connection: close\r\n\r\n"
        );
    }

    #[test]
    fn test_not_found_response() {
        let response = Response::not_found();
        assert_eq!(response.status.code(), 404);
        assert_eq!(response.body(), "404: Not found");
        assert!(response.head().starts_with("HTTP/1.1 404 Not Found\r\n"));
    }
}
