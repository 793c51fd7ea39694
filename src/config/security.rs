use axum::http::{HeaderName, HeaderValue, Request, Response};
use std::{
    env,
    task::{Context, Poll},
};
use tower::{Layer, Service};

const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Headers applied to every response. The service is a JSON API scanned
/// from staff devices, so the CSP locks everything down.
fn baseline_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ),
        (
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ),
        (
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ),
        (
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ),
    ]
}

#[derive(Clone)]
pub struct SecurityHeadersLayer {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeadersLayer {
    pub fn new(include_hsts: bool) -> Self {
        let mut headers = baseline_headers();
        if include_hsts {
            headers.push((
                HeaderName::from_static("strict-transport-security"),
                HeaderValue::from_static(HSTS_VALUE),
            ));
        }

        Self { headers }
    }

    /// HSTS only makes sense behind TLS, so it is keyed off production mode.
    pub fn from_env() -> Self {
        let is_production = env::var("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        if is_production {
            tracing::info!("Security: HSTS header enabled (production mode)");
        } else {
            tracing::info!("Security: HSTS header disabled (development mode)");
        }

        Self::new(is_production)
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            headers: self.headers.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecurityHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = SecurityHeadersFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        SecurityHeadersFuture {
            future: self.inner.call(request),
            headers: self.headers.clone(),
        }
    }
}

#[pin_project::pin_project]
pub struct SecurityHeadersFuture<F> {
    #[pin]
    future: F,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl<F, ResBody, E> std::future::Future for SecurityHeadersFuture<F>
where
    F: std::future::Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.future.poll(cx) {
            Poll::Ready(Ok(mut response)) => {
                for (name, value) in this.headers.iter() {
                    response.headers_mut().insert(name.clone(), value.clone());
                }

                Poll::Ready(Ok(response))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub fn create_security_headers_layer() -> SecurityHeadersLayer {
    SecurityHeadersLayer::from_env()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsts_included_only_when_requested() {
        let without = SecurityHeadersLayer::new(false);
        assert!(!without
            .headers
            .iter()
            .any(|(name, _)| name == "strict-transport-security"));

        let with = SecurityHeadersLayer::new(true);
        assert!(with
            .headers
            .iter()
            .any(|(name, _)| name == "strict-transport-security"));
    }

    #[test]
    fn baseline_always_disables_sniffing_and_framing() {
        let layer = SecurityHeadersLayer::new(false);
        for expected in ["x-content-type-options", "x-frame-options"] {
            assert!(
                layer.headers.iter().any(|(name, _)| name == expected),
                "missing {expected}"
            );
        }
    }
}
