//! Admin session
//!
//! An [`AdminSession`] holds the bearer token from a login and a timer task
//! that expires the session when the token's `exp` passes. Observers learn
//! about expiry or logout through a `watch` channel. Logging out or
//! dropping the session cancels the timer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::LoginSession;
use crate::notice::Notice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Expired,
    LoggedOut,
}

impl SessionStatus {
    /// What to tell the admin when the session ends on its own
    pub fn notice(self) -> Option<Notice> {
        match self {
            SessionStatus::Expired => Some(Notice::info("Your session has expired. Please log in again.")),
            SessionStatus::Active | SessionStatus::LoggedOut => None,
        }
    }
}

#[derive(Debug)]
pub struct AdminSession {
    login: LoginSession,
    status: Arc<watch::Sender<SessionStatus>>,
    expiry: JoinHandle<()>,
}

impl AdminSession {
    /// Starts the session and its expiry timer
    ///
    /// Must be called from within a tokio runtime. A token that is already
    /// past its expiry ends the session on the timer's first poll.
    pub fn start(login: LoginSession) -> Self {
        let remaining = u64::try_from(login.expires_at - Utc::now().timestamp()).unwrap_or(0);
        let (tx, _) = watch::channel(SessionStatus::Active);
        let status = Arc::new(tx);

        let timer_status = Arc::clone(&status);
        let email = login.user.email.clone();
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(remaining)).await;
            timer_status.send_replace(SessionStatus::Expired);
            tracing::info!(%email, "Admin session expired");
        });

        tracing::debug!(email = %login.user.email, seconds = remaining, "Admin session started");
        Self {
            login,
            status,
            expiry,
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.status() == SessionStatus::Active
    }

    /// The bearer token, only while the session is active
    pub fn token(&self) -> Option<&str> {
        self.is_active().then_some(self.login.token.as_str())
    }

    pub fn email(&self) -> &str {
        &self.login.user.email
    }

    /// Receives every status change
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Ends the session now and cancels the expiry timer
    pub fn logout(&mut self) {
        self.expiry.abort();
        if self.is_active() {
            self.status.send_replace(SessionStatus::LoggedOut);
            tracing::info!(email = %self.login.user.email, "Admin logged out");
        }
    }
}

impl Drop for AdminSession {
    fn drop(&mut self) {
        self.expiry.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SessionUser;
    use crate::notice::NoticeKind;

    fn login(valid_for_secs: i64) -> LoginSession {
        LoginSession {
            token: "token-abc".to_string(),
            expires_at: Utc::now().timestamp() + valid_for_secs,
            user: SessionUser {
                email: "admin@rentmycam.com".to_string(),
                role: "admin".to_string(),
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expires_with_token() {
        let session = AdminSession::start(login(60));
        let mut rx = session.subscribe();
        assert_eq!(session.token(), Some("token-abc"));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionStatus::Expired);
        assert!(!session.is_active());
        assert!(session.token().is_none());

        let notice = session.status().notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Info);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_cancels_timer() {
        let mut session = AdminSession::start(login(60));
        session.logout();
        assert_eq!(session.status(), SessionStatus::LoggedOut);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(session.status(), SessionStatus::LoggedOut);
        assert!(session.status().notice().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let session = AdminSession::start(login(60));
        let mut rx = session.subscribe();
        drop(session);

        // Sender side is gone once the aborted task has been dropped
        assert!(rx.changed().await.is_err());
        assert_eq!(*rx.borrow(), SessionStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_expired_token() {
        let session = AdminSession::start(login(-5));
        let mut rx = session.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Expired);
    }
}
