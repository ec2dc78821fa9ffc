//! Human readable messages shown next to each status code.

/// Message for a status code, with a generic fallback for unmapped codes.
pub fn status_message(code: u16) -> String {
    let message = match code {
        200 => "Request successful",
        201 => "Created successfully",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found (Redirect)",
        304 => "Not Modified",
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => return format!("Status code {code}"),
    };
    message.to_string()
}
