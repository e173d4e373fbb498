//! axum integration
//!
//! [`Render`] is an extractor for any router state that can produce a
//! [`Renderer`], and a response once the handler has written into it.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;

use super::{Render, Renderer};
use crate::response::ResponseBuffer;

impl<S> FromRequestParts<S> for Render
where
    S: Send + Sync,
    Renderer: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let renderer = Renderer::from_ref(state);
        Ok(renderer.render(
            ResponseBuffer::new(),
            parts.method.clone(),
            parts.uri.clone(),
        ))
    }
}

impl IntoResponse for Render<ResponseBuffer> {
    /// Convert the collected output into a response
    ///
    /// The request's [`LoadTimes`](super::LoadTimes) travel along as a response extension.
    fn into_response(self) -> Response {
        let elapsed = self.load_times.elapsed();
        if !elapsed.is_empty() {
            tracing::debug!(
                method = %self.method,
                uri = %self.uri,
                elapsed = %elapsed,
                "template rendered"
            );
        }

        let load_times = self.load_times.clone();
        let mut response = self.into_writer().into_response();
        response.extensions_mut().insert(load_times);
        response
    }
}
