//! Remote CRUD boundary for one entity collection.

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use shared::{
    domain::EntityId,
    error::{ApiError, ErrorCode},
    protocol::MutationResponse,
};
use tracing::debug;

use crate::{
    attachment::{Encoding, TransportPayload},
    error::GatewayError,
    record::ListRecord,
};

#[async_trait]
pub trait RemoteEntityGateway<R: ListRecord>: Send + Sync {
    async fn list(&self) -> Result<Vec<R>, GatewayError>;
    async fn create(&self, payload: TransportPayload)
        -> Result<MutationResponse<R>, GatewayError>;
    async fn submit_update(
        &self,
        id: EntityId,
        payload: TransportPayload,
    ) -> Result<MutationResponse<R>, GatewayError>;
    async fn delete(&self, id: EntityId) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateVerb {
    Put,
    /// POST carrying `_method=PUT`, for backends that cannot read multipart
    /// bodies on PUT.
    #[default]
    PostWithOverride,
}

pub struct HttpEntityGateway<R> {
    http: Client,
    base_url: String,
    update_verb: UpdateVerb,
    _record: PhantomData<fn() -> R>,
}

impl<R: ListRecord> HttpEntityGateway<R> {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            update_verb: UpdateVerb::default(),
            _record: PhantomData,
        }
    }

    pub fn with_update_verb(mut self, update_verb: UpdateVerb) -> Self {
        self.update_verb = update_verb;
        self
    }

    fn collection_url(&self) -> String {
        format!("{}/api/{}", self.base_url, R::COLLECTION)
    }

    fn attach(
        &self,
        request: RequestBuilder,
        payload: &TransportPayload,
    ) -> Result<RequestBuilder, GatewayError> {
        Ok(match payload.encoding {
            Encoding::Multipart => request.multipart(payload.to_form()?),
            Encoding::Json => request.json(&payload.to_json()),
        })
    }
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let api_error = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
        ApiError::new(
            ErrorCode::from_status(status.as_u16()),
            status.canonical_reason().unwrap_or("request failed"),
        )
    });
    debug!(status = status.as_u16(), code = ?api_error.code, "backend rejected request");
    Err(GatewayError::Status {
        status: status.as_u16(),
        message: api_error.message,
    })
}

async fn read_mutation<R: ListRecord>(
    response: Response,
) -> Result<MutationResponse<R>, GatewayError> {
    let bytes = check_status(response).await?.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(MutationResponse::Ack(serde_json::Value::Null));
    }
    serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
}

#[async_trait]
impl<R: ListRecord> RemoteEntityGateway<R> for HttpEntityGateway<R> {
    async fn list(&self) -> Result<Vec<R>, GatewayError> {
        let response = self.http.get(self.collection_url()).send().await?;
        let bytes = check_status(response).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
    }

    async fn create(
        &self,
        payload: TransportPayload,
    ) -> Result<MutationResponse<R>, GatewayError> {
        let url = format!("{}/create", self.collection_url());
        debug!(%url, encoding = ?payload.encoding, "submitting create");
        let request = self.attach(self.http.post(url), &payload)?;
        read_mutation(request.send().await?).await
    }

    async fn submit_update(
        &self,
        id: EntityId,
        payload: TransportPayload,
    ) -> Result<MutationResponse<R>, GatewayError> {
        let url = format!("{}/update/{id}", self.collection_url());
        debug!(%url, verb = ?self.update_verb, "submitting update");
        let request = match self.update_verb {
            UpdateVerb::Put => self.attach(self.http.put(url), &payload)?,
            UpdateVerb::PostWithOverride => {
                let payload = payload.with_field("_method", "PUT");
                self.attach(self.http.post(url), &payload)?
            }
        };
        read_mutation(request.send().await?).await
    }

    async fn delete(&self, id: EntityId) -> Result<(), GatewayError> {
        let url = format!("{}/delete/{id}", self.collection_url());
        let response = self.http.delete(url).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
