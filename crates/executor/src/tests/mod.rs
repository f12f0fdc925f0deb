//! Test modules for the executor crate.


use std::sync::Arc;

use parking_lot::Mutex;
use quiver_core::ClientConfig;

use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::Client;

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// Transport that records every request and answers from a closure.
pub struct MockTransport {
    handler: Handler,
    seen: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Always answer `status` with `body`.
    pub fn fixed(status: u16, body: &str) -> Arc<Self> {
        let body = body.to_string();
        Self::new(move |_| Ok(HttpResponse::new(status, body.clone())))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.seen.lock().len()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().push(request.clone());
        (self.handler)(request)
    }
}

/// Client over `transport` with a small pool.
pub fn client_with(transport: &Arc<MockTransport>, config: ClientConfig) -> Client {
    let transport: Arc<dyn Transport> = Arc::clone(transport) as Arc<dyn Transport>;
    Client::with_transport(config.io_threads(2), transport).unwrap()
}

pub fn client(transport: &Arc<MockTransport>) -> Client {
    client_with(transport, ClientConfig::new())
}
