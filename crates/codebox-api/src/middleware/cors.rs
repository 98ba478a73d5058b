//! CORS layer built from [`CorsPolicy`].
//!
//! A wildcard list entry becomes `*` on the wire, except when credentials
//! are allowed: browsers reject `*` alongside
//! `Access-Control-Allow-Credentials: true`, so the request's own origin,
//! method, and headers are mirrored back instead. The effective policy is
//! identical, with every origin, method, and header accepted.

use std::time::Duration;

use codebox_core::CorsPolicy;
use http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer, ExposeHeaders};

use crate::error::{Error, Result};

/// Build a [`CorsLayer`] for `policy`.
pub fn cors_layer(policy: &CorsPolicy) -> Result<CorsLayer> {
    let credentials = policy.allow_credentials;

    let origins = if CorsPolicy::is_wildcard(&policy.allow_origins) {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::from(Any)
        }
    } else {
        AllowOrigin::list(parse_all(&policy.allow_origins, parse_origin)?)
    };

    let methods = if CorsPolicy::is_wildcard(&policy.allow_methods) {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::from(Any)
        }
    } else {
        AllowMethods::list(parse_all(&policy.allow_methods, parse_method)?)
    };

    let headers = if CorsPolicy::is_wildcard(&policy.allow_headers) {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::from(Any)
        }
    } else {
        AllowHeaders::list(parse_all(&policy.allow_headers, parse_header)?)
    };

    let expose = if CorsPolicy::is_wildcard(&policy.expose_headers) {
        if credentials {
            return Err(Error::InvalidCors(
                "expose_headers cannot be '*' when credentials are allowed".into(),
            ));
        }
        ExposeHeaders::from(Any)
    } else {
        ExposeHeaders::list(parse_all(&policy.expose_headers, parse_header)?)
    };

    tracing::debug!(
        origins = ?policy.allow_origins,
        methods = ?policy.allow_methods,
        headers = ?policy.allow_headers,
        credentials,
        "Configured CORS policy"
    );

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(expose)
        .allow_credentials(credentials)
        .max_age(Duration::from_secs(policy.max_age_secs)))
}

fn parse_all<T>(values: &[String], parse: fn(&str) -> Result<T>) -> Result<Vec<T>> {
    values.iter().map(|v| parse(v.trim())).collect()
}

fn parse_origin(s: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(s).map_err(|_| Error::InvalidCors(format!("origin '{s}'")))
}

fn parse_method(s: &str) -> Result<Method> {
    Method::from_bytes(s.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidCors(format!("method '{s}'")))
}

fn parse_header(s: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(s.as_bytes()).map_err(|_| Error::InvalidCors(format!("header '{s}'")))
}
