//! Admission gate for throttled actions.
//!
//! Derives the caller key from the identity headers set by the authenticating
//! proxy, asks the limiter for a permit, and answers `429 Too Many Requests`
//! without forwarding when the bucket is empty.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use anyhow::Context as _;
use axum::{Extension, Json, body::Body};
use config::GateConfig;
use http::{
    HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode,
    header::{CONTENT_TYPE, RETRY_AFTER},
};
use rate_limit::{Decision, KeyError, RateLimitKey, RateLimiter};
use serde::Serialize;
use tower::Layer;

/// A granted permit, handed to the route handler through request extensions.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Permit {
    action: String,
    remaining: u32,
}

/// Answers an admitted permit request.
pub(crate) async fn permit(Extension(permit): Extension<Permit>) -> Json<Permit> {
    Json(permit)
}

struct Gate {
    limiter: Arc<RateLimiter>,
    organization_header: HeaderName,
    user_header: HeaderName,
    action: String,
}

impl Gate {
    fn key(&self, headers: &HeaderMap) -> Result<RateLimitKey, KeyError> {
        let mut builder = RateLimitKey::builder().action(self.action.as_str());

        if let Some(organization) = header_str(headers, &self.organization_header) {
            builder = builder.organization(organization);
        }

        if let Some(user) = header_str(headers, &self.user_header) {
            builder = builder.user(user);
        }

        builder.build()
    }
}

#[derive(Clone)]
pub(crate) struct GateLayer(Arc<Gate>);

impl GateLayer {
    pub fn new(limiter: Arc<RateLimiter>, config: &GateConfig, action: &str) -> anyhow::Result<Self> {
        let organization_header = HeaderName::from_bytes(config.organization_header.as_bytes())
            .with_context(|| format!("Invalid organization header '{}'", config.organization_header))?;

        let user_header = HeaderName::from_bytes(config.user_header.as_bytes())
            .with_context(|| format!("Invalid user header '{}'", config.user_header))?;

        Ok(Self(Arc::new(Gate {
            limiter,
            organization_header,
            user_header,
            action: action.to_string(),
        })))
    }
}

impl<Service> Layer<Service> for GateLayer
where
    Service: Send + Clone,
{
    type Service = GateService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        GateService {
            next,
            gate: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct GateService<Service> {
    next: Service,
    gate: Arc<Gate>,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for GateService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();
        let gate = self.gate.clone();

        Box::pin(async move {
            let key = match gate.key(req.headers()) {
                Ok(key) => key,
                Err(err) => {
                    log::debug!("Rejecting '{}' request without a usable identity: {err}", gate.action);
                    return Ok(plain_response(StatusCode::BAD_REQUEST, "Missing or invalid caller identity"));
                }
            };

            match gate.limiter.check(key.as_str()) {
                Decision::Admitted { remaining } => {
                    req.extensions_mut().insert(Permit {
                        action: gate.action.clone(),
                        remaining,
                    });

                    next.call(req).await
                }
                Decision::Rejected { retry_after } => {
                    log::debug!("Request rejected due to rate limit for key '{key}'");

                    let mut response = plain_response(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
                    response
                        .headers_mut()
                        .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));

                    Ok(response)
                }
            }
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name)?.to_str().ok().map(str::trim)
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));

    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

    response
}

/// Whole seconds, rounded up and at least one.
fn retry_after_secs(retry_after: Duration) -> u64 {
    retry_after.as_secs_f64().ceil().max(1.0) as u64
}
