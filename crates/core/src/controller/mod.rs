//! The offline cache controller.
//!
//! Sits between the site's pages and the network. Every same-origin GET is
//! answered by one of two strategies:
//!
//! - **Network-first** for documents: fetch, store a copy, fall back to the
//!   cache when the network is unreachable.
//! - **Cache-first** for everything else (fonts, images, scripts, styles):
//!   serve a stored copy without touching the network, fetch and store on a
//!   miss.
//!
//! Anything else (other methods, other origins, or a controller that is not
//! active yet) passes through untouched.
//!
//! Copies are written to the runtime partition by detached tasks. The caller
//! never waits for them and their failures are only logged. There is no
//! ordering between a delivered response and its background write, so two
//! concurrent misses for one key may both fetch and both store; the second
//! write simply overwrites the first.

mod lifecycle;
mod strategy;

use std::sync::{Arc, Mutex, PoisonError};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

pub use lifecycle::ControllerState;

use crate::Error;
use crate::cache::{CacheStorage, Request, Response};
use crate::config::AppConfig;
use crate::generation::{CurrentNames, GenerationManager};
use crate::network::Network;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServedFrom {
    Network,
    Cache,
}

/// A response produced by [`OfflineController::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: ServedFrom,
}

impl Served {
    fn network(response: Response) -> Self {
        Self { response, source: ServedFrom::Network }
    }

    fn cache(response: Response) -> Self {
        Self { response, source: ServedFrom::Cache }
    }
}

/// Outcome of offering a request to the controller.
#[derive(Debug)]
pub enum Intercept {
    /// The controller answered the request.
    Respond(Served),
    /// Not ours: the caller should perform an ordinary fetch, uncached.
    PassThrough(Request),
}

/// Published to open clients when a version takes control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerChange {
    pub precache: String,
    pub runtime: String,
}

/// Routes intercepted requests to the cache strategies and owns the
/// install/activate lifecycle of one controller version.
pub struct OfflineController {
    origin: Url,
    critical_assets: Vec<Url>,
    generations: GenerationManager,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: Mutex<ControllerState>,
    clients: watch::Sender<Option<ControllerChange>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl OfflineController {
    /// Build an uninstalled controller for the configured version.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin or a critical asset path
    /// does not resolve to a URL.
    pub fn new(config: &AppConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let critical_assets = config
            .critical_assets
            .iter()
            .map(|path| origin.join(path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        let (clients, _) = watch::channel(None);

        Ok(Self {
            origin,
            critical_assets,
            generations: GenerationManager::from_config(config),
            storage,
            network,
            state: Mutex::new(ControllerState::Uninstalled),
            clients,
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn names(&self) -> &CurrentNames {
        self.generations.current_names()
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ControllerState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let from = *state;
        if from != next {
            tracing::info!(from = %from, to = %next, "controller state changed");
            *state = next;
        }
    }

    /// Receive a [`ControllerChange`] whenever a version claims clients.
    pub fn subscribe(&self) -> watch::Receiver<Option<ControllerChange>> {
        self.clients.subscribe()
    }

    /// Whether `request` is one this controller may answer.
    pub fn accepts(&self, request: &Request) -> bool {
        request.is_get() && request.url.origin() == self.origin.origin()
    }

    /// Offer a request to the controller.
    ///
    /// Only an active controller answers, and only same-origin GETs; every
    /// other request comes back as [`Intercept::PassThrough`] without any
    /// cache lookup or write.
    pub async fn intercept(&self, request: Request) -> Result<Intercept, Error> {
        if self.state() != ControllerState::Active || !self.accepts(&request) {
            tracing::trace!(method = %request.method, url = %request.url, "passing request through");
            return Ok(Intercept::PassThrough(request));
        }
        self.handle(&request).await.map(Intercept::Respond)
    }

    /// Answer a same-origin GET: documents network-first, the rest cache-first.
    pub async fn handle(&self, request: &Request) -> Result<Served, Error> {
        if !self.accepts(request) {
            return Err(Error::InvalidInput(format!(
                "{} {} is not a same-origin GET",
                request.method, request.url
            )));
        }

        if request.destination.is_document() {
            self.network_first(request).await
        } else {
            self.cache_first(request).await
        }
    }

    /// Store a copy in the runtime partition on a detached task.
    fn store_in_background(&self, request: &Request, response: &Response) {
        let storage = Arc::clone(&self.storage);
        let partition = self.names().runtime.clone();
        let request = request.clone();
        let response = response.clone();

        let handle = tokio::spawn(async move {
            match storage.put(&partition, &request, &response).await {
                Ok(()) => tracing::debug!(url = %request.url, partition = %partition, "stored runtime copy"),
                Err(e) => tracing::warn!(url = %request.url, partition = %partition, error = %e, "background cache write failed"),
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every background write started so far.
    ///
    /// Never called on the response path; used at shutdown and in tests.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "background cache write task aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Destination, MemoryStorage, ResponseType};
    use crate::testing::{FakeNetwork, controller_with, url};

    async fn active_controller(storage: Arc<MemoryStorage>, network: Arc<FakeNetwork>) -> OfflineController {
        network.serve("/", 200, ResponseType::Basic, "home");
        network.serve("/fonts/Urbanist-Variable.woff2", 200, ResponseType::Basic, "font");
        network.serve("/favicon.svg", 200, ResponseType::Basic, "<svg/>");
        let controller = controller_with(storage, network.clone());
        controller.start().await.unwrap();
        network.reset_calls();
        controller
    }

    #[test]
    fn test_new_resolves_critical_assets() {
        let controller = controller_with(Arc::new(MemoryStorage::new()), Arc::new(FakeNetwork::new()));
        let assets: Vec<&str> = controller.critical_assets.iter().map(Url::as_str).collect();
        assert_eq!(
            assets,
            vec![
                "http://localhost:4321/",
                "http://localhost:4321/fonts/Urbanist-Variable.woff2",
                "http://localhost:4321/favicon.svg",
            ]
        );
    }

    #[test]
    fn test_new_rejects_bad_origin() {
        let config = AppConfig { origin: "nope".into(), ..Default::default() };
        let result = OfflineController::new(&config, Arc::new(MemoryStorage::new()), Arc::new(FakeNetwork::new()));
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_accepts_same_origin_get_only() {
        let controller = controller_with(Arc::new(MemoryStorage::new()), Arc::new(FakeNetwork::new()));
        assert!(controller.accepts(&Request::get(url("/style.css"))));
        assert!(!controller.accepts(&Request::new("POST", url("/style.css"))));
        assert!(!controller.accepts(&Request::get(Url::parse("https://cdn.example.com/style.css").unwrap())));
        assert!(!controller.accepts(&Request::get(Url::parse("http://localhost:9999/").unwrap())));
    }

    #[tokio::test]
    async fn test_post_passes_through_untouched() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(FakeNetwork::new());
        let controller = active_controller(storage.clone(), network.clone()).await;
        let before = storage.keys().await.unwrap();

        let request = Request::new("POST", url("/")).with_destination(Destination::Document);
        let outcome = controller.intercept(request.clone()).await.unwrap();

        assert!(matches!(outcome, Intercept::PassThrough(ref r) if *r == request));
        controller.settle().await;
        assert_eq!(network.calls(), 0);
        assert_eq!(storage.keys().await.unwrap(), before);
        assert_eq!(storage.entries("fil25-runtime-v1").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_cross_origin_passes_through_untouched() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(FakeNetwork::new());
        let controller = active_controller(storage.clone(), network.clone()).await;

        let request = Request::get(Url::parse("https://fonts.example.com/a.woff2").unwrap())
            .with_destination(Destination::Font);
        let outcome = controller.intercept(request).await.unwrap();

        assert!(matches!(outcome, Intercept::PassThrough(_)));
        controller.settle().await;
        assert_eq!(network.calls(), 0);
        assert!(!storage.has("fil25-runtime-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_inactive_controller_passes_through() {
        let network = Arc::new(FakeNetwork::new());
        let controller = controller_with(Arc::new(MemoryStorage::new()), network.clone());
        let outcome = controller.intercept(Request::get(url("/style.css"))).await.unwrap();
        assert!(matches!(outcome, Intercept::PassThrough(_)));
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_handle_rejects_ineligible_without_io() {
        let network = Arc::new(FakeNetwork::new());
        let controller = controller_with(Arc::new(MemoryStorage::new()), network.clone());
        let result = controller.handle(&Request::new("PUT", url("/"))).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_intercept_answers_when_active() {
        let storage = Arc::new(MemoryStorage::new());
        let network = Arc::new(FakeNetwork::new());
        let controller = active_controller(storage, network.clone()).await;

        let outcome = controller.intercept(Request::get(url("/favicon.svg"))).await.unwrap();
        match outcome {
            Intercept::Respond(served) => {
                assert_eq!(served.source, ServedFrom::Cache);
                assert_eq!(served.response.body.as_ref(), b"<svg/>");
            }
            Intercept::PassThrough(_) => panic!("expected the controller to respond"),
        }
        assert_eq!(network.calls(), 0);
    }
}
