//! Loopback HTTP server that receives the provider redirect
//!
//! Listens on the host and port of the registered redirect URI and hands the
//! first redirect carrying `code`, `state` or `error` to the caller. State
//! validation is left to the callback handler.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use spoticizr_common::auth::AuthorizationRedirect;
use spoticizr_domain::{Result, SpoticizrError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::{Host, Url};

type RedirectSlot = Arc<Mutex<Option<oneshot::Sender<AuthorizationRedirect>>>>;

const RECEIVED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Received</title></head>
<body><h1>Authorization Received</h1><p>You can close this window and return to the terminal.</p></body>
</html>"#;

const DENIED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Failed</title></head>
<body><h1>Authorization Failed</h1><p>The provider did not grant access. Check the terminal for details.</p></body>
</html>"#;

const WAITING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Waiting for Authorization</title></head>
<body><h1>Waiting for Authorization</h1><p>No authorization parameters in this request.</p></body>
</html>"#;

/// Loopback receiver for one authorization redirect
pub struct RedirectReceiver {
    local_addr: SocketAddr,
    redirect: Option<oneshot::Receiver<AuthorizationRedirect>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RedirectReceiver {
    /// Start listening on the host, port and path of `redirect_uri`
    ///
    /// Port `0` binds an ephemeral port (useful in tests).
    ///
    /// # Errors
    /// Returns `SpoticizrError::Config` for a redirect URI that is not a
    /// plain `http` loopback address, and `SpoticizrError::Network` when the
    /// port cannot be bound.
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = Url::parse(redirect_uri)
            .map_err(|e| SpoticizrError::Config(format!("invalid redirect URI: {e}")))?;
        if url.scheme() != "http" {
            return Err(SpoticizrError::Config(format!(
                "redirect URI must use http for the loopback receiver: {redirect_uri}"
            )));
        }
        let port = url.port_or_known_default().unwrap_or(80);
        let target = match url.host() {
            Some(Host::Ipv4(ip)) => SocketAddr::from((ip, port)).to_string(),
            Some(Host::Ipv6(ip)) => SocketAddr::from((ip, port)).to_string(),
            Some(Host::Domain("localhost")) | None => {
                SocketAddr::from((Ipv4Addr::LOCALHOST, port)).to_string()
            }
            Some(Host::Domain(domain)) => format!("{domain}:{port}"),
        };

        let listener = TcpListener::bind(target.as_str()).await.map_err(|err| {
            SpoticizrError::Network(format!("failed to bind redirect receiver on {target}: {err}"))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| SpoticizrError::Network(format!("failed to determine port: {err}")))?;

        let (redirect_tx, redirect_rx) = oneshot::channel();
        let slot: RedirectSlot = Arc::new(Mutex::new(Some(redirect_tx)));

        let app = Router::new().route(
            url.path(),
            get(move |query: Query<HashMap<String, String>>| handle_redirect(query, slot.clone())),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("Redirect receiver error: {}", err);
            }
        });

        info!(addr = %local_addr, path = url.path(), "Waiting for authorization redirect");
        Ok(Self {
            local_addr,
            redirect: Some(redirect_rx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Address the receiver is listening on
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Await the redirect with a timeout
    ///
    /// # Errors
    /// Returns `SpoticizrError::Network` on timeout and
    /// `SpoticizrError::Internal` if called twice or the server died.
    pub async fn wait(&mut self, timeout: Duration) -> Result<AuthorizationRedirect> {
        let receiver = self.redirect.take().ok_or_else(|| {
            SpoticizrError::Internal("authorization redirect already consumed".to_string())
        })?;

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(redirect)) => Ok(redirect),
            Ok(Err(_)) => Err(SpoticizrError::Internal(
                "redirect receiver stopped before a redirect arrived".to_string(),
            )),
            Err(_) => Err(SpoticizrError::Network(format!(
                "timed out after {}s waiting for the authorization redirect",
                timeout.as_secs()
            ))),
        }
    }

    /// Shut down the loopback server gracefully.
    ///
    /// # Errors
    /// Returns error if the server task panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    return Err(SpoticizrError::Internal(format!(
                        "redirect receiver panicked: {err}"
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Drop for RedirectReceiver {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_redirect(
    Query(params): Query<HashMap<String, String>>,
    slot: RedirectSlot,
) -> Html<&'static str> {
    let redirect = AuthorizationRedirect {
        code: params.get("code").cloned(),
        state: params.get("state").cloned(),
        error: params.get("error").cloned(),
    };

    if redirect.is_empty() {
        debug!("Ignoring request without authorization parameters");
        return Html(WAITING_PAGE);
    }

    let denied = redirect.error.is_some();
    let Some(sender) = slot.lock().take() else {
        debug!("Ignoring repeated authorization redirect");
        return Html(RECEIVED_PAGE);
    };
    let _ = sender.send(redirect);

    if denied {
        Html(DENIED_PAGE)
    } else {
        Html(RECEIVED_PAGE)
    }
}
