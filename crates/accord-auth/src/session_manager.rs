//! Session storage indexed by local nonce, peer nonce, and identity key.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::AuthError;
use crate::types::PeerSession;

/// Storage for peer sessions.
///
/// One session must be reachable through any of its three keys: the
/// local `session_nonce`, the `peer_nonce` once learned, and the peer's
/// identity key once learned.
pub trait SessionManager: Send + Sync {
    /// Insert a session. The `session_nonce` must be non-empty.
    fn add_session(&self, session: PeerSession) -> Result<(), AuthError>;
    /// Replace an existing session, re-indexing any changed keys.
    fn update_session(&self, session: PeerSession);
    /// Look up by session nonce, peer nonce, or identity-key hex.
    fn get_session(&self, identifier: &str) -> Option<PeerSession>;
    /// Drop a session from all indices. Missing entries are ignored.
    fn remove_session(&self, session: &PeerSession);
    /// True when any index holds the identifier.
    fn has_session(&self, identifier: &str) -> bool;
}

/// In-memory session manager.
///
/// Sessions are owned by the map keyed on `session_nonce` (always present
/// and unique); the peer-nonce and identity indices point back at that
/// key. An identity key can accumulate several sessions; lookups prefer
/// authenticated ones, newest first.
#[derive(Default)]
pub struct DefaultSessionManager {
    sessions: RwLock<HashMap<String, PeerSession>>,
    peer_nonce_index: RwLock<HashMap<String, String>>,
    identity_index: RwLock<HashMap<String, Vec<String>>>,
}

impl DefaultSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_keys(&self, session: &PeerSession) {
        if let Some(peer_nonce) = &session.peer_nonce {
            self.peer_nonce_index
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(peer_nonce.clone(), session.session_nonce.clone());
        }
        if let Some(key) = &session.peer_identity_key {
            let mut index = self
                .identity_index
                .write()
                .unwrap_or_else(|e| e.into_inner());
            let nonces = index.entry(key.to_hex()).or_default();
            if !nonces.contains(&session.session_nonce) {
                nonces.push(session.session_nonce.clone());
            }
        }
    }

    fn best_for_identity(&self, identity_hex: &str) -> Option<PeerSession> {
        let nonces = self
            .identity_index
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(identity_hex)
            .cloned()?;

        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        let mut best: Option<&PeerSession> = None;
        for nonce in &nonces {
            let Some(candidate) = sessions.get(nonce) else {
                continue;
            };
            best = match best {
                None => Some(candidate),
                Some(current) => {
                    // Authenticated beats pending; ties go to the newest.
                    let candidate_rank = (candidate.is_authenticated, candidate.last_update);
                    let current_rank = (current.is_authenticated, current.last_update);
                    if candidate_rank > current_rank {
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best.cloned()
    }
}

impl SessionManager for DefaultSessionManager {
    fn add_session(&self, session: PeerSession) -> Result<(), AuthError> {
        if session.session_nonce.is_empty() {
            return Err(AuthError::SessionIncomplete("session_nonce is required"));
        }

        self.index_keys(&session);
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session.session_nonce.clone(), session);
        Ok(())
    }

    fn update_session(&self, session: PeerSession) {
        // Unindex the stored version first; its keys may differ from the
        // replacement's (a pending session learns peer nonce and
        // identity when the handshake completes).
        let stored = {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            sessions.get(&session.session_nonce).cloned()
        };
        if let Some(stored) = stored {
            self.remove_session(&stored);
        }
        let _ = self.add_session(session);
    }

    fn get_session(&self, identifier: &str) -> Option<PeerSession> {
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            if let Some(session) = sessions.get(identifier) {
                return Some(session.clone());
            }
        }

        let by_peer_nonce = self
            .peer_nonce_index
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(identifier)
            .cloned();
        if let Some(session_nonce) = by_peer_nonce {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            if let Some(session) = sessions.get(&session_nonce) {
                return Some(session.clone());
            }
        }

        self.best_for_identity(identifier)
    }

    fn remove_session(&self, session: &PeerSession) {
        if !session.session_nonce.is_empty() {
            self.sessions
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&session.session_nonce);
        }
        if let Some(peer_nonce) = &session.peer_nonce {
            self.peer_nonce_index
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(peer_nonce);
        }
        if let Some(key) = &session.peer_identity_key {
            let mut index = self
                .identity_index
                .write()
                .unwrap_or_else(|e| e.into_inner());
            let hex = key.to_hex();
            if let Some(nonces) = index.get_mut(&hex) {
                nonces.retain(|n| n != &session.session_nonce);
                if nonces.is_empty() {
                    index.remove(&hex);
                }
            }
        }
    }

    fn has_session(&self, identifier: &str) -> bool {
        self.get_session(identifier).is_some()
    }
}
