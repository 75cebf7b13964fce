//! Route pattern extraction utilities.

use actix_web::HttpRequest;

/// Label used for requests that did not match any registered resource.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Extract the registered route pattern for a request
///
/// Uses the resource map so `/users/42` and `/users/7` share the `/users/{user_id}`
/// label, keeping metric and rate-limit key cardinality bounded.
pub fn extract_route_pattern(req: &HttpRequest) -> String {
    req.match_pattern()
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}
