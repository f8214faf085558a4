//! Periodic self-announcement to peer proxies.
//!
//! # Responsibilities
//! - On every tick, register this proxy with each configured peer
//! - Keep running through peer failures (logged and counted, never fatal)
//! - Stop cleanly when the owning handle is stopped or dropped

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{header, Method, Request};
use futures_util::future::join_all;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use url::Url;

use crate::admin::handlers::{PATH_PARAM, REVERSE_URI_PARAM};
use crate::config::ProxyConfig;
use crate::http::server::build_client;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::presence::PresenceError;
use crate::resilience::timeouts;
use crate::routing::segments;

const USER_AGENT: &str = "registry-proxy-presence";

/// Announces this proxy to every configured peer on a fixed interval.
pub struct ProxyNotifier {
    settings: Arc<ArcSwap<ProxyConfig>>,
    client: Client<HttpConnector, Body>,
}

/// Owns a running notifier task. Dropping the handle stops the loop.
pub struct NotifierHandle {
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
}

impl NotifierHandle {
    /// Signal the loop to stop and wait for it to exit.
    ///
    /// An announcement already in flight is allowed to finish.
    pub async fn stop(mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Presence notifier task failed");
            }
        }
    }
}

impl Drop for NotifierHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

impl ProxyNotifier {
    /// Settings are re-read on every tick, so peer lists follow config reloads.
    pub fn new(settings: Arc<ArcSwap<ProxyConfig>>) -> Self {
        let client = build_client(&settings.load().timeouts);
        Self { settings, client }
    }

    /// Spawn the announcement loop.
    pub fn start(self) -> NotifierHandle {
        let shutdown = Shutdown::new();
        let stop = shutdown.subscribe();
        let task = tokio::spawn(self.run(stop));
        NotifierHandle {
            shutdown,
            task: Some(task),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut period = self.period();
        tracing::info!(interval = ?period, "Presence notifier starting");

        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;

                    let current = self.period();
                    if current != period {
                        period = current;
                        ticker = time::interval_at(Instant::now() + period, period);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Presence notifier stopping");
                    break;
                }
            }
        }
    }

    fn period(&self) -> Duration {
        Duration::from_secs(self.settings.load().presence.interval_secs.max(1))
    }

    /// Announce to every peer concurrently.
    ///
    /// Returns the number of successful announcements, or `None` when
    /// presence is not configured (no base URI or no peers).
    pub async fn tick(&self) -> Option<usize> {
        let settings = self.settings.load_full();
        let presence = &settings.presence;
        let base_uri = presence.base_uri.as_deref()?;
        if presence.peers.is_empty() {
            return None;
        }

        let self_uri = self_uri(base_uri, &settings.listener.path_base);
        let limit = timeouts::heartbeat(&settings.timeouts);
        let announcements = presence
            .peers
            .iter()
            .map(|peer| self.announce(peer, &self_uri, &settings.registry.admin_path, limit));

        let succeeded = join_all(announcements)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();
        tracing::debug!(
            peers = presence.peers.len(),
            succeeded,
            "Presence announcements sent"
        );
        Some(succeeded)
    }

    async fn announce(&self, peer: &str, self_uri: &str, admin_path: &str, limit: Duration) -> bool {
        let ok = match self.try_announce(peer, self_uri, admin_path, limit).await {
            Ok(()) => {
                tracing::trace!(peer = %peer, "Announced to peer");
                true
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Presence announcement failed");
                false
            }
        };
        metrics::record_heartbeat(ok);
        ok
    }

    async fn try_announce(
        &self,
        peer: &str,
        self_uri: &str,
        admin_path: &str,
        limit: Duration,
    ) -> Result<(), PresenceError> {
        let uri = announcement_uri(peer, self_uri, admin_path)?;
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri.as_str())
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())?;

        let response = timeouts::within(limit, self.client.request(request))
            .await
            .map_err(|_| PresenceError::Timeout(limit))??;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PresenceError::Rejected(response.status()))
        }
    }
}

/// This proxy's own public URI: the base URI plus the path base.
pub fn self_uri(base_uri: &str, path_base: &str) -> String {
    let base = base_uri.trim_end_matches('/');
    let path_base = path_base.trim_matches('/');
    if path_base.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{path_base}/")
    }
}

/// Registration URI for one peer.
///
/// The peer URI's path is the prefix this proxy is registered under on that
/// peer; the registry endpoint itself lives at the peer's root.
pub fn announcement_uri(peer: &str, self_uri: &str, admin_path: &str) -> Result<Url, PresenceError> {
    let invalid = |reason: String| PresenceError::InvalidPeer {
        peer: peer.to_string(),
        reason,
    };

    let peer_url = Url::parse(peer).map_err(|e| invalid(e.to_string()))?;
    if !matches!(peer_url.scheme(), "http" | "https") || !peer_url.has_host() {
        return Err(invalid("expected an absolute http(s) URI".into()));
    }
    let path = segments::normalize(peer_url.path())
        .ok_or_else(|| invalid(format!("unusable path '{}'", peer_url.path())))?;

    let mut uri = peer_url
        .join(admin_path)
        .map_err(|e| invalid(e.to_string()))?;
    uri.set_fragment(None);
    uri.query_pairs_mut()
        .clear()
        .append_pair(PATH_PARAM, &path)
        .append_pair(REVERSE_URI_PARAM, self_uri);
    Ok(uri)
}
