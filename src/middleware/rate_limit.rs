// src/middleware/rate_limit.rs

use std::{net::SocketAddr, num::NonZeroU32};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::{common::error::AppError, config::AppState};

// Contador por IP, só em memória (reinicia com o processo)
pub type IpRateLimiter = DefaultKeyedRateLimiter<String>;

pub fn build_limiter(per_minute: u32) -> IpRateLimiter {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    RateLimiter::keyed(Quota::per_minute(per_minute))
}

// Primeiro IP do X-Forwarded-For, senão o peer, senão "?"
fn client_key(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "?".to_string())
}

pub async fn rate_limit_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(&request);

    if app_state.rate_limiter.check_key(&key).is_err() {
        tracing::warn!("🚦 Limite de requisições excedido para {}", key);
        return Err(AppError::TooManyRequests);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(forwarded: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/v1/clients");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn key_prefers_first_forwarded_address() {
        assert_eq!(client_key(&request_with(Some("203.0.113.7, 10.0.0.1"))), "203.0.113.7");
    }

    #[test]
    fn key_falls_back_to_peer_then_placeholder() {
        let mut request = request_with(None);
        assert_eq!(client_key(&request), "?");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 51000))));
        assert_eq!(client_key(&request), "192.0.2.10");
    }

    #[test]
    fn limiter_blocks_after_quota() {
        let limiter = build_limiter(2);
        let key = "198.51.100.1".to_string();

        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_err());
        // Outro IP tem o próprio balde
        assert!(limiter.check_key(&"198.51.100.2".to_string()).is_ok());
    }
}
