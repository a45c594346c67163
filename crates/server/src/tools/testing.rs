//! Stub network and controller helpers for the tool tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shelf_core::{AppConfig, Error, MemoryStorage, Network, OfflineController, Request, Response, ResponseType};

pub const ORIGIN: &str = "http://localhost:4321";

/// Answers scripted paths on the site origin; everything else is 404.
///
/// Responses for other origins come back as `cors`.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, (u16, &'static str)>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, path: &str, status: u16, body: &'static str) {
        self.routes.lock().unwrap().insert(path.to_string(), (status, body));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        let response_type =
            if request.url.as_str().starts_with(ORIGIN) { ResponseType::Basic } else { ResponseType::Cors };
        let routes = self.routes.lock().unwrap();
        let response = match routes.get(request.url.path()) {
            Some((status, body)) => Response::new(request.url.clone(), *status, response_type)
                .with_header("content-type", "text/html")
                .with_body(*body),
            None => Response::new(request.url.clone(), 404, response_type),
        };
        Ok(response)
    }
}

/// An uninstalled controller over fresh in-memory storage.
pub fn controller(network: Arc<StubNetwork>) -> OfflineController {
    OfflineController::new(&AppConfig::default(), Arc::new(MemoryStorage::new()), network).unwrap()
}

/// A controller that has precached the default critical assets and is active.
pub async fn active_controller(network: Arc<StubNetwork>) -> OfflineController {
    network.serve("/", 200, "<html>home</html>");
    network.serve("/fonts/Urbanist-Variable.woff2", 200, "woff2");
    network.serve("/favicon.svg", 200, "<svg/>");
    let controller = controller(network);
    controller.start().await.unwrap();
    controller
}
