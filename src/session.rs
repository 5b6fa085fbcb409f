// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Session store: who is logged in.
//!
//! A session is the bearer token, the user id and the username handed out by
//! `/login`. It is persisted through a [`KeyValueStore`] and restored on
//! startup without contacting the service; a revoked token only shows up as
//! an authorization error on the next request. Sessions never expire on
//! their own, only [`SessionStore::logout`] ends one.

use std::sync::Arc;

use crate::history::CHAT_HISTORY_KEY;
use crate::storage::{KeyValueStore, StoreError};
use crate::utils::mask_sensitive;

pub const TOKEN_KEY: &str = "token";
pub const USER_ID_KEY: &str = "userId";
pub const USERNAME_KEY: &str = "username";

/// Every key cleared by logout.
pub const SESSION_KEYS: [&str; 4] = [TOKEN_KEY, USER_ID_KEY, USERNAME_KEY, CHAT_HISTORY_KEY];

/// Name shown when the service did not return a username.
const ANONYMOUS_NAME: &str = "User";

/// Authenticated identity. Token and user id are either both set or both
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user_id: Option<String>,
    username: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user_id.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(ANONYMOUS_NAME)
    }

    /// Token and user id together, when logged in.
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        match (self.token.as_deref(), self.user_id.as_deref()) {
            (Some(token), Some(user_id)) => Some(Credentials { token, user_id }),
            _ => None,
        }
    }
}

/// What an authenticated request needs.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub token: &'a str,
    pub user_id: &'a str,
}

/// Session state plus the store it is persisted in.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    session: Session,
}

impl SessionStore {
    /// Restore whatever session was persisted by a previous run.
    ///
    /// A half-written session (token without user id or the reverse) is
    /// discarded and its keys removed.
    pub fn init(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let token = store.get(TOKEN_KEY)?;
        let user_id = store.get(USER_ID_KEY)?;
        let username = store.get(USERNAME_KEY)?;

        let session = match (token, user_id) {
            (Some(token), Some(user_id)) => {
                tracing::info!("SESSION_RESTORED | user_id={}", user_id);
                Session {
                    token: Some(token),
                    user_id: Some(user_id),
                    username,
                }
            }
            (None, None) => Session::default(),
            (token, user_id) => {
                tracing::warn!(
                    "SESSION_PARTIAL | has_token={} has_user_id={} discarding",
                    token.is_some(),
                    user_id.is_some()
                );
                store.reset(&[TOKEN_KEY, USER_ID_KEY, USERNAME_KEY])?;
                Session::default()
            }
        };

        Ok(Self { store, session })
    }

    /// Persist a freshly issued session and mark it authenticated.
    pub fn login(
        &mut self,
        token: impl Into<String>,
        user_id: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<(), StoreError> {
        let token = token.into();
        let user_id = user_id.into();
        let username = username.into();

        self.store.set(TOKEN_KEY, &token)?;
        self.store.set(USER_ID_KEY, &user_id)?;
        self.store.set(USERNAME_KEY, &username)?;

        tracing::info!(
            "SESSION_LOGIN | user_id={} username={} token={}",
            user_id,
            username,
            mask_sensitive(&token, 6)
        );

        self.session = Session {
            token: Some(token),
            user_id: Some(user_id),
            username: Some(username),
        };
        Ok(())
    }

    /// Forget the session and the chat history, in storage and in memory.
    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.store.reset(&SESSION_KEYS)?;
        if let Some(user_id) = self.session.user_id() {
            tracing::info!("SESSION_LOGOUT | user_id={}", user_id);
        }
        self.session = Session::default();
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }
}
