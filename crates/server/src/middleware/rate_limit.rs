//! Per-client rate limiting using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: sign-up, login and OAuth endpoints (~10/min)
//! - `api_rate_limiter`: everything else under `/api` (~100/min, burst 100)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

const AUTH_REPLENISH: Duration = Duration::from_secs(6);
const AUTH_BURST: u32 = 5;
const API_REPLENISH: Duration = Duration::from_millis(600);
const API_BURST: u32 = 100;

/// Proxy headers consulted for the client address, in order of trust.
const CLIENT_IP_HEADERS: [&str; 2] = ["x-forwarded-for", "x-real-ip"];

/// Key extractor for deployments behind a reverse proxy.
///
/// Uses the first address in `X-Forwarded-For`, then `X-Real-IP`, then the
/// peer address of the TCP connection when the server was started with
/// connect info.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

fn ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        ip_from_headers(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_every: Duration, burst: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .period(replenish_every)
        .burst_size(burst)
        .finish()
        .expect("rate limiter periods and burst sizes are non-zero constants");
    GovernorLayer::new(Arc::new(config))
}

/// Rate limiter for credential endpoints: one token every 6 seconds, burst of 5.
///
/// # Panics
///
/// Does not panic; both parameters are non-zero.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    limiter(AUTH_REPLENISH, AUTH_BURST)
}

/// Rate limiter for the general API: one token every 600 ms, burst of 100.
///
/// # Panics
///
/// Does not panic; both parameters are non-zero.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(API_REPLENISH, API_BURST)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request_with(headers: &[(&'static str, &'static str)]) -> Request<()> {
        let mut request = Request::new(());
        for (name, value) in headers {
            request
                .headers_mut()
                .insert(*name, HeaderValue::from_static(value));
        }
        request
    }

    #[test]
    fn test_forwarded_for_uses_first_hop() {
        let request = request_with(&[("x-forwarded-for", "203.0.113.9, 10.0.0.1")]);
        let ip = ClientIpKeyExtractor.extract(&request).unwrap();
        assert_eq!(ip, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_falls_back_to_real_ip_then_peer() {
        let request = request_with(&[("x-forwarded-for", "garbage"), ("x-real-ip", "::1")]);
        let ip = ClientIpKeyExtractor.extract(&request).unwrap();
        assert_eq!(ip, "::1".parse::<IpAddr>().unwrap());

        let mut request = request_with(&[]);
        let peer: SocketAddr = "192.0.2.4:5123".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(ClientIpKeyExtractor.extract(&request).unwrap(), peer.ip());
    }

    fn per_minute(replenish: Duration) -> u128 {
        Duration::from_secs(60).as_millis() / replenish.as_millis()
    }

    #[test]
    fn test_sustained_rates() {
        assert_eq!(per_minute(AUTH_REPLENISH), 10);
        assert_eq!(per_minute(API_REPLENISH), 100);
        assert!(AUTH_BURST < API_BURST);

        // Both layers build from these constants.
        let _ = auth_rate_limiter();
        let _ = api_rate_limiter();
    }

    #[test]
    fn test_no_address_is_an_error() {
        let request = request_with(&[]);
        assert!(ClientIpKeyExtractor.extract(&request).is_err());
    }
}
