use episode_sync_models::Credentials;
use episode_sync_sources::{AuthTicket, PollStatus, RemoteService};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::AuthError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.\-+]+@[\w.-]+\.[\w]+$").unwrap());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Progress of the background confirmation poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Pending { attempt: u32 },
    Confirmed(Credentials),
    Failed(String),
    Cancelled,
}

impl PollEvent {
    fn into_outcome(self) -> Option<AuthOutcome> {
        match self {
            PollEvent::Pending { .. } => None,
            PollEvent::Confirmed(credentials) => Some(AuthOutcome::Confirmed(credentials)),
            PollEvent::Failed(message) => Some(AuthOutcome::Failed(message)),
            PollEvent::Cancelled => Some(AuthOutcome::Cancelled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Confirmed(Credentials),
    Failed(String),
    Cancelled,
}

/// Two-phase TVmaze authorization: start with an e-mail, then poll until the user confirms
#[derive(Clone)]
pub struct AuthorizationFlow {
    remote: Arc<dyn RemoteService>,
    poll_interval: Duration,
}

impl AuthorizationFlow {
    pub fn new(remote: Arc<dyn RemoteService>, poll_interval: Duration) -> Self {
        Self {
            remote,
            poll_interval,
        }
    }

    /// Validate the e-mail and request a confirmation token
    pub async fn start(&self, email: &str) -> Result<AuthTicket, AuthError> {
        let email = email.trim();
        if !is_valid_email(email) {
            error!(email, "Invalid email");
            return Err(AuthError::InvalidEmail(email.to_string()));
        }
        let ticket = self.remote.start_auth(email).await.map_err(|e| {
            error!(error = %e, "TVmaze authorization error");
            AuthError::from(e)
        })?;
        info!(confirm_url = %ticket.redacted_url(), "Authorization started");
        Ok(ticket)
    }

    /// Spawn the confirmation poll. The returned handle owns the task.
    pub fn confirm(&self, ticket: &AuthTicket) -> PendingConfirmation {
        let cancel = CancellationToken::new();
        let (events_tx, events) = mpsc::channel(16);
        let handle = tokio::spawn(poll_until_confirmed(
            self.remote.clone(),
            ticket.token.clone(),
            self.poll_interval,
            cancel.clone(),
            events_tx,
        ));
        PendingConfirmation {
            cancel,
            events,
            handle,
        }
    }
}

async fn poll_until_confirmed(
    remote: Arc<dyn RemoteService>,
    token: String,
    interval: Duration,
    cancel: CancellationToken,
    events: mpsc::Sender<PollEvent>,
) {
    let mut attempt = 0u32;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = remote.poll_auth(&token) => result,
        };

        let event = match result {
            Ok(PollStatus::Pending) => {
                debug!(attempt, "Authorization pending");
                PollEvent::Pending { attempt }
            }
            Ok(PollStatus::Confirmed(credentials)) => {
                info!(username = %credentials.username, "Authorization confirmed");
                PollEvent::Confirmed(credentials)
            }
            Err(e) => {
                error!(error = %e, "Confirmation error");
                PollEvent::Failed(e.to_string())
            }
        };
        let terminal = !matches!(event, PollEvent::Pending { .. });
        if events.send(event).await.is_err() || terminal {
            return;
        }
    }

    info!("Authorization polling cancelled");
    let _ = events.send(PollEvent::Cancelled).await;
}

/// A confirmation poll running in the background
pub struct PendingConfirmation {
    cancel: CancellationToken,
    events: mpsc::Receiver<PollEvent>,
    handle: JoinHandle<()>,
}

impl PendingConfirmation {
    /// Token that stops the poll when cancelled, e.g. from a Ctrl-C handler
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    /// Wait for a terminal state and join the poll task
    pub async fn wait(self) -> AuthOutcome {
        self.wait_with(|_| {}).await
    }

    /// Like `wait`, reporting every event on the way
    pub async fn wait_with(mut self, mut on_event: impl FnMut(&PollEvent)) -> AuthOutcome {
        let outcome = loop {
            match self.events.recv().await {
                Some(event) => {
                    on_event(&event);
                    if let Some(outcome) = event.into_outcome() {
                        break outcome;
                    }
                }
                None => break AuthOutcome::Failed("authorization poll stopped unexpectedly".to_string()),
            }
        };

        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Authorization poll task did not finish cleanly");
        }
        outcome
    }
}
