//! Tower middleware that performs the token translation per request.
//!
//! The service sequences the pipeline: locate a credential, gate on length,
//! exchange it, rewrite the outbound headers. Requests without a credential
//! pass through untouched; a failed exchange short-circuits with
//! `403 Not allowed`. The underlying failure cause is logged server-side
//! and never echoed to the caller.

use std::task::{Context, Poll};

use axum::body::Body;
use futures::future::BoxFuture;
use http::header::AUTHORIZATION;
use http::{HeaderName, HeaderValue, Request, Response, StatusCode};

use crate::config::Config;
use crate::exchange::{http_client, TokenExchanger};
use crate::extract::extract_authorization;
use crate::validate::ACCESS_TOKEN_LEN;

/// Header carrying the raw access token to downstream consumers
/// (`accessToken` on the wire; header names are case-insensitive).
pub const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("accesstoken");

/// Fixed rejection body; internal failure detail stays out of the response.
const REJECTION_BODY: &str = "Not allowed";

/// Tower [`Layer`](tower::Layer) that applies [`TokenTranslatorService`].
#[derive(Clone)]
pub struct TokenTranslatorLayer {
    exchanger: TokenExchanger,
    strict: bool,
}

impl TokenTranslatorLayer {
    /// Build the layer with its own tuned HTTP client.
    ///
    /// Fails only if the client cannot be constructed (TLS backend
    /// initialization).
    pub fn new(config: Config) -> reqwest::Result<Self> {
        let client = http_client(config.http_timeout())?;
        Ok(Self::with_client(config, client))
    }

    /// Build the layer around an externally constructed client.
    ///
    /// The client is shared by reference with every request in flight; this
    /// is also the injection seam tests use.
    pub fn with_client(config: Config, client: reqwest::Client) -> Self {
        Self {
            exchanger: TokenExchanger::new(&config, client),
            strict: config.strict(),
        }
    }
}

impl<S> tower::Layer<S> for TokenTranslatorLayer {
    type Service = TokenTranslatorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenTranslatorService {
            exchanger: self.exchanger.clone(),
            strict: self.strict,
            inner,
        }
    }
}

/// Tower service that translates tokens before forwarding requests.
#[derive(Clone)]
pub struct TokenTranslatorService<S> {
    exchanger: TokenExchanger,
    strict: bool,
    inner: S,
}

impl<S, B> tower::Service<Request<B>> for TokenTranslatorService<S>
where
    S: tower::Service<Request<B>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let exchanger = self.exchanger.clone();
        let strict = self.strict;
        let mut inner = self.inner.clone();
        // swap to ensure poll_ready state is preserved
        std::mem::swap(&mut self.inner, &mut inner);

        Box::pin(async move {
            let candidate = match extract_authorization(req.headers()) {
                Ok(candidate) => candidate,
                Err(e) => {
                    tracing::warn!(error = %e, "could not extract authorization from request");
                    None
                }
            };

            let access_token = match candidate {
                None => return inner.call(req).await,
                Some(token) if token.len() == ACCESS_TOKEN_LEN => token,
                Some(token) => {
                    // Cannot even be attempted: strict mode rejects it,
                    // permissive mode forwards the request untouched.
                    if strict {
                        tracing::warn!(
                            candidate_len = token.len(),
                            "rejecting credential with unexpected length"
                        );
                        return Ok(forbidden());
                    }
                    return inner.call(req).await;
                }
            };

            match exchanger.fetch_user_token(&access_token).await {
                Ok(jwt) => {
                    let bearer = match HeaderValue::from_str(&format!("Bearer {}", jwt)) {
                        Ok(value) => value,
                        Err(e) => {
                            tracing::warn!(error = %e, "exchanged token is not a valid header value");
                            return Ok(forbidden());
                        }
                    };
                    let raw = match HeaderValue::from_str(&access_token) {
                        Ok(value) => value,
                        Err(e) => {
                            tracing::warn!(error = %e, "access token is not a valid header value");
                            return Ok(forbidden());
                        }
                    };
                    req.headers_mut().insert(ACCESS_TOKEN_HEADER, raw);
                    req.headers_mut().insert(AUTHORIZATION, bearer);
                    tracing::debug!("access token exchanged, forwarding request");
                    inner.call(req).await
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed fetching jwt token");
                    Ok(forbidden())
                }
            }
        })
    }
}

fn forbidden() -> Response<Body> {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .body(Body::from(REJECTION_BODY))
        .expect("valid response")
}
