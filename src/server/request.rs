//! Request-line and query-string parsing for the line-based protocol.
//!
//! One request per connection: `METHOD PATH VERSION`, headers until a blank
//! line, no body. Query values keep their submit order so repeated names
//! can collapse to the first occurrence downstream.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    EmptyRequest,
    InvalidRequestLine,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyRequest => write!(f, "empty request"),
            ParseError::InvalidRequestLine => write!(f, "invalid request line"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub version: String,
}

impl Request {
    /// Parse a request line of the form `GET /jobs/status?id=abc HTTP/1.0`.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        if line.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let (path, query) = match parts[1].split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (parts[1].to_string(), Vec::new()),
        };

        Ok(Self {
            method: parts[0].to_string(),
            path,
            query,
            version: parts[2].to_string(),
        })
    }

    /// First value for a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (url_decode(key), url_decode(value)),
            None => (url_decode(pair), String::new()),
        })
        .collect()
}

/// Minimal percent-decoding: `+` and `%XX` escapes; malformed escapes pass
/// through untouched.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = [bytes[i + 1], bytes[i + 2]];
                match std::str::from_utf8(&hex)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
