//! Install and activation of a controller version.
//!
//! ```text
//! uninstalled → installing → installed → activating → active
//!                    └──(precache failed)──→ redundant
//! ```
//!
//! A version skips the waiting phase: `start` activates as soon as the
//! install succeeds.

use std::fmt;
use std::sync::PoisonError;

use futures_util::future::try_join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ControllerChange, OfflineController};
use crate::Error;
use crate::cache::{Request, Response};

/// Lifecycle state of one controller version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
    /// Install failed; this version never serves traffic.
    Redundant,
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Uninstalled => "uninstalled",
            ControllerState::Installing => "installing",
            ControllerState::Installed => "installed",
            ControllerState::Activating => "activating",
            ControllerState::Active => "active",
            ControllerState::Redundant => "redundant",
        }
    }

    /// Installing again before activation is allowed and idempotent.
    fn can_install(&self) -> bool {
        matches!(self, ControllerState::Uninstalled | ControllerState::Installed | ControllerState::Redundant)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OfflineController {
    /// Move from a state accepted by `allowed` to `next` under one lock.
    ///
    /// Returns the state that was left.
    fn transition(
        &self, allowed: fn(&ControllerState) -> bool, next: ControllerState, step: &str,
    ) -> Result<ControllerState, Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let from = *state;
        if !allowed(&from) {
            return Err(Error::InvalidState(format!("cannot {step} while {from}")));
        }
        tracing::info!(from = %from, to = %next, "controller state changed");
        *state = next;
        Ok(from)
    }

    /// Populate the precache partition with every critical asset.
    ///
    /// A precache that already holds every asset (same version, earlier
    /// process) is reused without touching the network. Otherwise all assets
    /// are fetched before anything is written. If any fetch fails or returns
    /// a non-2xx status the version becomes redundant and nothing is stored.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition(ControllerState::can_install, ControllerState::Installing, "install")?;

        let outcome = match self.precache_complete().await {
            Ok(true) => {
                tracing::info!(partition = %self.names().precache, "precache already complete, skipping fetch");
                Ok(self.critical_assets.len())
            }
            Ok(false) => self.precache().await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(count) => {
                tracing::info!(partition = %self.names().precache, assets = count, "precache populated");
                self.set_state(ControllerState::Installed);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "install failed, version will not activate");
                self.set_state(ControllerState::Redundant);
                Err(err)
            }
        }
    }

    /// Whether this version's precache already answers every critical asset.
    async fn precache_complete(&self) -> Result<bool, Error> {
        let precache = &self.names().precache;
        if !self.storage.has(precache).await? {
            return Ok(false);
        }
        for asset in &self.critical_assets {
            if self.storage.match_in(precache, &Request::get(asset.clone())).await?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn precache(&self) -> Result<usize, Error> {
        let requests: Vec<Request> = self.critical_assets.iter().cloned().map(Request::get).collect();

        let fetched: Vec<Response> = try_join_all(requests.iter().map(|request| async move {
            let asset = request.url.path().to_string();
            let response = match self.network.fetch(request).await {
                Ok(response) => response,
                Err(e) => return Err(Error::InstallFailed { asset, reason: e.to_string() }),
            };
            if !response.is_ok() {
                return Err(Error::InstallFailed { asset, reason: format!("status {}", response.status) });
            }
            Ok(response)
        }))
        .await?;

        let precache = &self.names().precache;
        let existed = self.storage.has(precache).await?;
        if let Err(e) = self.write_precache(&requests, &fetched).await {
            if !existed {
                self.discard_precache().await;
            }
            return Err(Error::InstallFailed { asset: precache.clone(), reason: format!("precache write failed: {e}") });
        }

        Ok(fetched.len())
    }

    async fn write_precache(&self, requests: &[Request], responses: &[Response]) -> Result<(), Error> {
        let precache = &self.names().precache;
        self.storage.open(precache).await?;
        for (request, response) in requests.iter().zip(responses) {
            self.storage.put(precache, request, response).await?;
        }
        Ok(())
    }

    /// Drop a precache partition this install created but could not fill.
    async fn discard_precache(&self) {
        let precache = &self.names().precache;
        if let Err(e) = self.storage.delete(precache).await {
            tracing::warn!(partition = %precache, error = %e, "could not remove partial precache");
        }
    }

    /// Evict stale generations, then take control of open clients.
    ///
    /// The version only becomes active once every stale partition is gone.
    /// A failed eviction leaves it installed so activation can be retried.
    /// Returns the evicted partition names.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.transition(|s| *s == ControllerState::Installed, ControllerState::Activating, "activate")?;

        let evicted = match self.generations.evict(self.storage.as_ref()).await {
            Ok(evicted) => evicted,
            Err(err) => {
                tracing::warn!(error = %err, "activation rejected, stale partitions remain");
                self.set_state(ControllerState::Installed);
                return Err(err);
            }
        };

        self.set_state(ControllerState::Active);
        self.claim_clients();
        Ok(evicted)
    }

    /// Install, then activate immediately.
    pub async fn start(&self) -> Result<Vec<String>, Error> {
        self.install().await?;
        self.activate().await
    }

    fn claim_clients(&self) {
        let names = self.names();
        let change = ControllerChange { precache: names.precache.clone(), runtime: names.runtime.clone() };
        tracing::info!(precache = %change.precache, runtime = %change.runtime, "claimed open clients");
        self.clients.send_replace(Some(change));
    }
}
