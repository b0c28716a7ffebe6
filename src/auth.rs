//! Client authentication
//!
//! The datastore checks every data operation against an [`Authenticator`].
//! [`TokenAuthenticator`] is a local mock that hands out random tokens to
//! any client presenting a non-empty secret.

use std::collections::HashMap;

use log::{debug, info};
use uuid::Uuid;

use crate::core::errors::{Result, StoreError};

/// Credentials handed to a connected client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub token: String,
}

/// Issues and checks client credentials
pub trait Authenticator {
    /// Open a session for `client_id`
    fn connect(&mut self, client_id: &str, secret: &str) -> Result<Credentials>;

    /// Close the session behind `credentials`
    fn disconnect(&mut self, credentials: &Credentials);

    /// Whether `credentials` belong to an open session
    fn authenticate(&self, credentials: &Credentials) -> bool;
}

/// Authenticator keeping open sessions in memory
#[derive(Debug, Default)]
pub struct TokenAuthenticator {
    sessions: HashMap<String, String>,
}

impl TokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open sessions
    pub fn sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl Authenticator for TokenAuthenticator {
    fn connect(&mut self, client_id: &str, secret: &str) -> Result<Credentials> {
        if client_id.is_empty() || secret.is_empty() {
            return Err(StoreError::Unauthorized(format!("'{}': no secret given", client_id)));
        }

        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), client_id.to_string());
        info!("Client {} connected", client_id);

        Ok(Credentials {
            client_id: client_id.to_string(),
            token,
        })
    }

    fn disconnect(&mut self, credentials: &Credentials) {
        if self.sessions.remove(&credentials.token).is_some() {
            info!("Client {} disconnected", credentials.client_id);
        }
    }

    fn authenticate(&self, credentials: &Credentials) -> bool {
        let valid = self
            .sessions
            .get(&credentials.token)
            .map_or(false, |client_id| client_id == &credentials.client_id);
        if !valid {
            debug!("Rejected credentials for client {}", credentials.client_id);
        }
        valid
    }
}
