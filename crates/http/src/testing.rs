//! In-process transport for unit tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;

use crate::error::TransportError;
use crate::transport::{Transport, TransportRequest, TransportResponse};

type Handler =
    Box<dyn Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync>;

/// Transport answering from a closure after a fixed delay, recording every request
pub(crate) struct FakeTransport {
    handler: Handler,
    delay: Duration,
    requests: Mutex<Vec<TransportRequest>>,
}

impl FakeTransport {
    pub(crate) fn new(
        handler: impl Fn(&TransportRequest) -> Result<TransportResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: Duration::from_millis(50),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requests_to(&self, url: &str) -> Vec<TransportRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url == url)
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = (self.handler)(&request);
        tokio::time::sleep(self.delay).await;
        reply
    }
}

pub(crate) fn reply(status: u16, body: &'static str) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse::new(
        StatusCode::from_u16(status).unwrap(),
        body,
    ))
}
