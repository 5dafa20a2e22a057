//! Response builder for the line-based protocol: status line, fixed
//! headers, JSON body, connection closed after one response.

pub fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

pub fn build(code: u16, body: &str, request_id: &str) -> String {
    format!(
        "HTTP/1.0 {} {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         X-Request-Id: {}\r\n\
         \r\n\
         {}",
        code,
        status_text(code),
        body.len(),
        request_id,
        body
    )
}
