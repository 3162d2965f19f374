//! Shared request execution for the RAG HTTP clients

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::rag::error::RagError;

/// Send `request` and return the body if `accept` approves the status
pub(crate) async fn execute_text(
    request: RequestBuilder,
    accept: impl Fn(StatusCode) -> bool,
) -> Result<String, RagError> {
    let response = request.send().await?;

    let status = response.status();
    let body = response.text().await?;

    if accept(status) {
        Ok(body)
    } else {
        error!(status = status.as_u16(), body = %body, "API error");
        Err(RagError::Api {
            status_code: status.as_u16(),
            message: body,
        })
    }
}

/// Send `request`, require `200 OK` and decode the JSON body
pub(crate) async fn execute_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RagError> {
    let body = execute_text(request, |status| status == StatusCode::OK).await?;
    serde_json::from_str(&body).map_err(|e| {
        error!("Failed to parse response: {}", e);
        RagError::Json(e)
    })
}
