// ABOUTME: CORS middleware configuration for the gateway's HTTP endpoints
// ABOUTME: Permits all origins, headers, and methods at the response-header level
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

use tower_http::cors::{Any, CorsLayer};

/// Configure permissive CORS response headers
///
/// All origins, headers, and methods are permitted. Access control is the
/// job of the stricter origin allowlist filter, which runs independently of
/// these response headers.
#[must_use]
pub fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any)
}
