//! Fakes shared by the controller tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use crate::Error;
use crate::cache::{CacheStorage, CachedEntry, MemoryStorage, Request, Response, ResponseType};
use crate::config::AppConfig;
use crate::controller::OfflineController;
use crate::network::Network;

const ORIGIN: &str = "http://localhost:4321";

/// A URL on the default test origin.
pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// A controller for the default config over the given fakes.
pub fn controller_with(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> OfflineController {
    OfflineController::new(&AppConfig::default(), storage, network).unwrap()
}

enum Scripted {
    Respond(u16, ResponseType, &'static str),
    Fail,
    TooLarge,
    Reject,
}

/// Network that answers from a script and counts calls.
///
/// Unscripted paths answer 404.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Scripted>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, path: &str, status: u16, response_type: ResponseType, body: &'static str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Scripted::Respond(status, response_type, body));
    }

    pub fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Scripted::Fail);
    }

    pub fn too_large(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Scripted::TooLarge);
    }

    /// Fail the way a request the transport refuses to send would.
    pub fn reject(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Scripted::Reject);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        let routes = self.routes.lock().unwrap();
        match routes.get(request.url.path()) {
            Some(Scripted::Respond(status, response_type, body)) => {
                Ok(Response::new(request.url.clone(), *status, *response_type).with_body(*body))
            }
            Some(Scripted::Fail) => Err(Error::Network(format!("connection reset: {}", request.url))),
            Some(Scripted::TooLarge) => Err(Error::FetchTooLarge(format!("body of {} exceeds limit", request.url))),
            Some(Scripted::Reject) => Err(Error::InvalidInput(format!("invalid request for {}", request.url))),
            None => Ok(Response::new(request.url.clone(), 404, ResponseType::Basic)),
        }
    }
}

/// Memory storage whose writes and deletes can be made to fail.
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_in(name, request).await
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::Storage("quota exceeded".into()));
        }
        self.inner.put(name, request, response).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn entries(&self, name: &str) -> Result<Vec<CachedEntry>, Error> {
        self.inner.entries(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::Storage("disk I/O error".into()));
        }
        self.inner.delete(name).await
    }
}
