//! HTTP utility functions for extracting request information.

use actix_web::HttpRequest;

/// Extract client IP address from request headers
///
/// Attempts to extract the real client IP from various proxy headers,
/// falling back to the connection remote address.
pub fn extract_client_ip(req: &HttpRequest) -> String {
    let ip_headers = [
        "X-Forwarded-For",
        "X-Real-IP",
        "CF-Connecting-IP",
        "X-Cluster-Client-IP",
    ];

    for header_name in &ip_headers {
        let Some(header_str) = req.headers().get(*header_name).and_then(|h| h.to_str().ok())
        else {
            continue;
        };
        // X-Forwarded-For can carry a chain, the first hop is the client
        let ip = header_str.split(',').next().unwrap_or(header_str).trim();
        if !ip.is_empty() {
            return ip.to_string();
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}
