//! Peer — mutual authentication, session lifecycle, certificate exchange.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Duration;

use accord_primitives::ec::{PublicKey, Signature};
use accord_wallet::types::{
    Counterparty, CreateSignatureArgs, DerivationArgs, GetPublicKeyArgs, VerifySignatureArgs,
};
use accord_wallet::Wallet;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::certificates::{
    get_verifiable_certificates, validate_certificates, CertificateStore, MemoryCertificateStore,
    VerifiableCertificate,
};
use crate::codec;
use crate::error::AuthError;
use crate::nonce;
use crate::session_manager::{DefaultSessionManager, SessionManager};
use crate::transport::Transport;
use crate::types::{
    signing_protocol, AuthMessage, MessageType, PeerSession, RequestedCertificateSet, AUTH_VERSION,
};

/// Invoked for each authenticated general message: sender identity key
/// and payload.
pub type OnGeneralMessage = Box<dyn Fn(&PublicKey, &[u8]) -> Result<(), AuthError> + Send + Sync>;
/// Invoked when validated certificates arrive from a peer.
pub type OnCertificatesReceived =
    Box<dyn Fn(&PublicKey, &[VerifiableCertificate]) -> Result<(), AuthError> + Send + Sync>;
/// Invoked when a peer asks for certificates. Registering any handler of
/// this kind disables the automatic certificate response.
pub type OnCertificatesRequested =
    Box<dyn Fn(&PublicKey, &RequestedCertificateSet) -> Result<(), AuthError> + Send + Sync>;

/// How long a handshake waits for the initial response by default.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// A caller blocked in `initiate_handshake`, keyed by the session nonce
/// its initial request carried.
struct ResponseWaiter {
    session_nonce: String,
    signal: Arc<(Mutex<bool>, Condvar)>,
}

/// Configuration for a new [`Peer`].
pub struct PeerOptions {
    /// Wallet holding the identity key; signs and verifies everything.
    pub wallet: Arc<dyn Wallet>,
    /// Message carrier to the counterparty.
    pub transport: Arc<dyn Transport>,
    /// Certificates to request from peers during the handshake.
    pub certificates_to_request: Option<RequestedCertificateSet>,
    /// Certificates this peer can disclose when asked.
    pub certificate_store: Option<Arc<dyn CertificateStore>>,
    /// Session storage (defaults to the in-memory manager).
    pub session_manager: Option<Arc<dyn SessionManager>>,
    /// Remember the last peer and let `to_peer(None)` reuse it
    /// (defaults to true).
    pub auto_persist_last_session: Option<bool>,
}

/// One side of the mutual-authentication protocol.
///
/// Inbound messages arrive through the transport handler registered at
/// construction; outbound APIs acquire an authenticated session (running
/// the handshake when needed) before sending.
pub struct Peer {
    wallet: Arc<dyn Wallet>,
    transport: Arc<dyn Transport>,
    session_manager: Arc<dyn SessionManager>,
    certificate_store: Arc<dyn CertificateStore>,
    certificates_to_request: RequestedCertificateSet,
    general_message_callbacks: RwLock<HashMap<i32, OnGeneralMessage>>,
    certificates_received_callbacks: RwLock<HashMap<i32, OnCertificatesReceived>>,
    certificates_requested_callbacks: RwLock<HashMap<i32, OnCertificatesRequested>>,
    initial_response_waiters: Mutex<HashMap<i32, ResponseWaiter>>,
    callback_counter: AtomicI32,
    auto_persist_last_session: bool,
    last_interacted_peer: RwLock<Option<PublicKey>>,
    // Serializes handshake initiation so concurrent callers for the same
    // peer reuse one handshake instead of racing several.
    handshake_lock: Mutex<()>,
}

impl Peer {
    /// Create a peer and register it for inbound messages.
    pub fn new(options: PeerOptions) -> Arc<Self> {
        let peer = Arc::new(Peer {
            wallet: options.wallet,
            transport: options.transport,
            session_manager: options
                .session_manager
                .unwrap_or_else(|| Arc::new(DefaultSessionManager::new())),
            certificate_store: options
                .certificate_store
                .unwrap_or_else(|| Arc::new(MemoryCertificateStore::new())),
            certificates_to_request: options.certificates_to_request.unwrap_or_default(),
            general_message_callbacks: RwLock::new(HashMap::new()),
            certificates_received_callbacks: RwLock::new(HashMap::new()),
            certificates_requested_callbacks: RwLock::new(HashMap::new()),
            initial_response_waiters: Mutex::new(HashMap::new()),
            callback_counter: AtomicI32::new(0),
            auto_persist_last_session: options.auto_persist_last_session.unwrap_or(true),
            last_interacted_peer: RwLock::new(None),
            handshake_lock: Mutex::new(()),
        });

        // The transport handler holds a weak reference so the transport
        // does not keep the peer alive in a cycle.
        let weak = Arc::downgrade(&peer);
        let registered = peer.transport.on_data(Box::new(move |message| {
            match weak.upgrade() {
                Some(peer) => peer.handle_incoming(message),
                None => Ok(()),
            }
        }));
        if let Err(e) = registered {
            tracing::error!(error = %e, "failed to register inbound message handler");
        }

        peer
    }

    fn next_callback_id(&self) -> i32 {
        self.callback_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn identity_key(&self) -> Result<PublicKey, AuthError> {
        Ok(self
            .wallet
            .get_public_key(GetPublicKeyArgs {
                identity_key: true,
                ..Default::default()
            })?
            .public_key)
    }

    fn now_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn key_id(prefix: &str, suffix: &str) -> String {
        format!("{} {}", prefix, suffix)
    }

    fn sign(
        &self,
        data: Vec<u8>,
        key_id: String,
        counterparty: &PublicKey,
    ) -> Result<Vec<u8>, AuthError> {
        let result = self.wallet.create_signature(CreateSignatureArgs {
            derivation: DerivationArgs {
                protocol: signing_protocol(),
                key_id,
                counterparty: Counterparty::Other(*counterparty),
            },
            data,
        })?;
        Ok(result.signature.to_bytes().to_vec())
    }

    fn verify(
        &self,
        data: Vec<u8>,
        signature: &[u8],
        key_id: String,
        counterparty: &PublicKey,
    ) -> Result<(), AuthError> {
        let signature =
            Signature::from_bytes(signature).map_err(|_| AuthError::SignatureInvalid)?;
        let result = self.wallet.verify_signature(VerifySignatureArgs {
            derivation: DerivationArgs {
                protocol: signing_protocol(),
                key_id,
                counterparty: Counterparty::Other(*counterparty),
            },
            data,
            signature,
            for_self: false,
        })?;
        if !result.valid {
            return Err(AuthError::SignatureInvalid);
        }
        Ok(())
    }

    fn remember_peer(&self, identity_key: &PublicKey) {
        if self.auto_persist_last_session {
            *self
                .last_interacted_peer
                .write()
                .unwrap_or_else(|e| e.into_inner()) = Some(*identity_key);
        }
    }

    // === Listener registration ===

    /// Register a general-message listener. Returns a listener ID.
    pub fn listen_for_general_messages(&self, callback: OnGeneralMessage) -> i32 {
        let id = self.next_callback_id();
        self.general_message_callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, callback);
        id
    }

    /// Remove a general-message listener. Unknown IDs are ignored.
    pub fn stop_listening_for_general_messages(&self, id: i32) {
        self.general_message_callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    /// Register a certificates-received listener. Returns a listener ID.
    pub fn listen_for_certificates_received(&self, callback: OnCertificatesReceived) -> i32 {
        let id = self.next_callback_id();
        self.certificates_received_callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, callback);
        id
    }

    /// Remove a certificates-received listener. Unknown IDs are ignored.
    pub fn stop_listening_for_certificates_received(&self, id: i32) {
        self.certificates_received_callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    /// Register a certificates-requested listener, taking over from the
    /// automatic certificate response. Returns a listener ID.
    pub fn listen_for_certificates_requested(&self, callback: OnCertificatesRequested) -> i32 {
        let id = self.next_callback_id();
        self.certificates_requested_callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, callback);
        id
    }

    /// Remove a certificates-requested listener. Unknown IDs are ignored.
    pub fn stop_listening_for_certificates_requested(&self, id: i32) {
        self.certificates_requested_callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    // === Outbound API ===

    /// Send an authenticated payload, running the handshake first if no
    /// authenticated session exists.
    ///
    /// With no `identity_key` the last interacted peer is used, when
    /// last-session persistence is enabled. `max_wait_time` bounds the
    /// handshake (default [`DEFAULT_HANDSHAKE_TIMEOUT`]).
    pub fn to_peer(
        &self,
        payload: &[u8],
        identity_key: Option<&PublicKey>,
        max_wait_time: Option<Duration>,
    ) -> Result<(), AuthError> {
        let identity_key = identity_key.copied().or_else(|| {
            if self.auto_persist_last_session {
                *self
                    .last_interacted_peer
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
            } else {
                None
            }
        });

        let session = self.get_authenticated_session(identity_key.as_ref(), max_wait_time)?;
        let peer_nonce = session
            .peer_nonce
            .clone()
            .ok_or(AuthError::SessionIncomplete("peer nonce"))?;
        let peer_identity = session
            .peer_identity_key
            .ok_or(AuthError::SessionIncomplete("peer identity key"))?;

        let request_nonce = nonce::random_base64(32);
        let mut message = AuthMessage::new(MessageType::General, self.identity_key()?);
        message.nonce = request_nonce.clone();
        message.your_nonce = peer_nonce.clone();
        message.payload = payload.to_vec();
        message.signature = self.sign(
            payload.to_vec(),
            Self::key_id(&request_nonce, &peer_nonce),
            &peer_identity,
        )?;

        let mut updated = session;
        updated.last_update = Self::now_ms();
        self.session_manager.update_session(updated);
        self.remember_peer(&peer_identity);

        self.transport.send(&message).map_err(|e| {
            AuthError::Transport(format!("sending general message to {}: {}", peer_identity, e))
        })
    }

    /// Ask a peer for certificates under an authenticated session.
    pub fn request_certificates(
        &self,
        identity_key: &PublicKey,
        requirements: RequestedCertificateSet,
        max_wait_time: Option<Duration>,
    ) -> Result<(), AuthError> {
        let session = self.get_authenticated_session(Some(identity_key), max_wait_time)?;
        let peer_nonce = session
            .peer_nonce
            .clone()
            .ok_or(AuthError::SessionIncomplete("peer nonce"))?;

        let request_nonce = nonce::random_base64(32);
        let mut message = AuthMessage::new(MessageType::CertificateRequest, self.identity_key()?);
        message.nonce = request_nonce.clone();
        message.your_nonce = peer_nonce.clone();
        message.requested_certificates = requirements.clone();
        message.signature = self.sign(
            serde_json::to_vec(&requirements)?,
            Self::key_id(&request_nonce, &peer_nonce),
            identity_key,
        )?;

        let mut updated = session;
        updated.last_update = Self::now_ms();
        self.session_manager.update_session(updated);
        self.remember_peer(identity_key);

        self.transport.send(&message).map_err(|e| {
            AuthError::Transport(format!(
                "sending certificate request to {}: {}",
                identity_key, e
            ))
        })
    }

    /// Send certificates to a peer under an authenticated session.
    pub fn send_certificate_response(
        &self,
        identity_key: &PublicKey,
        certificates: Vec<VerifiableCertificate>,
    ) -> Result<(), AuthError> {
        self.send_certificates(identity_key, certificates, RequestedCertificateSet::default())
    }

    fn send_certificates(
        &self,
        identity_key: &PublicKey,
        certificates: Vec<VerifiableCertificate>,
        answered_request: RequestedCertificateSet,
    ) -> Result<(), AuthError> {
        let session = self.get_authenticated_session(Some(identity_key), None)?;
        let peer_nonce = session
            .peer_nonce
            .clone()
            .ok_or(AuthError::SessionIncomplete("peer nonce"))?;

        let response_nonce = nonce::random_base64(32);
        let mut message = AuthMessage::new(MessageType::CertificateResponse, self.identity_key()?);
        message.nonce = response_nonce.clone();
        message.your_nonce = peer_nonce.clone();
        message.initial_nonce = session.session_nonce.clone();
        message.requested_certificates = answered_request;
        message.certificates = certificates;
        message.signature = self.sign(
            serde_json::to_vec(&message.certificates)?,
            Self::key_id(&response_nonce, &peer_nonce),
            identity_key,
        )?;

        let mut updated = session;
        updated.last_update = Self::now_ms();
        self.session_manager.update_session(updated);
        self.remember_peer(identity_key);

        self.transport.send(&message).map_err(|e| {
            AuthError::Transport(format!(
                "sending certificate response to {}: {}",
                identity_key, e
            ))
        })
    }

    /// Fetch the authenticated session for a peer, performing the
    /// handshake when none exists yet.
    pub fn get_authenticated_session(
        &self,
        identity_key: Option<&PublicKey>,
        max_wait_time: Option<Duration>,
    ) -> Result<PeerSession, AuthError> {
        if let (Some(identity_key), Some(session)) =
            (identity_key, self.authenticated_session_for(identity_key))
        {
            self.remember_peer(identity_key);
            return Ok(session);
        }

        let _guard = self.handshake_lock.lock().unwrap_or_else(|e| e.into_inner());

        // A concurrent caller may have completed the handshake while we
        // waited for the lock.
        if let Some(session) = self.authenticated_session_for(identity_key) {
            return Ok(session);
        }

        let session = self.initiate_handshake(
            identity_key,
            max_wait_time.unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT),
        )?;
        if !session.is_authenticated {
            return Err(AuthError::HandshakeFailed);
        }
        Ok(session)
    }

    fn authenticated_session_for(&self, identity_key: Option<&PublicKey>) -> Option<PeerSession> {
        let session = self.session_manager.get_session(&identity_key?.to_hex())?;
        session.is_authenticated.then_some(session)
    }

    fn initiate_handshake(
        &self,
        peer_identity_key: Option<&PublicKey>,
        max_wait: Duration,
    ) -> Result<PeerSession, AuthError> {
        let session_nonce = nonce::create_nonce(self.wallet.as_ref())?;
        self.session_manager.add_session(PeerSession {
            is_authenticated: false,
            session_nonce: session_nonce.clone(),
            peer_nonce: None,
            peer_identity_key: peer_identity_key.copied(),
            last_update: Self::now_ms(),
        })?;

        let mut request = AuthMessage::new(MessageType::InitialRequest, self.identity_key()?);
        request.initial_nonce = session_nonce.clone();
        request.requested_certificates = self.certificates_to_request.clone();

        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let waiter_id = self.next_callback_id();
        self.initial_response_waiters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                waiter_id,
                ResponseWaiter {
                    session_nonce: session_nonce.clone(),
                    signal: Arc::clone(&signal),
                },
            );

        if let Err(e) = self.transport.send(&request) {
            self.remove_waiter(waiter_id);
            if let Some(session) = self.session_manager.get_session(&session_nonce) {
                self.session_manager.remove_session(&session);
            }
            return Err(AuthError::Transport(format!(
                "sending initial request: {}",
                e
            )));
        }

        // With a synchronous transport the response has already been
        // processed by now and the wait returns immediately.
        let (flag, condvar) = &*signal;
        let responded = {
            let guard = flag.lock().unwrap_or_else(|e| e.into_inner());
            let (guard, _) = condvar
                .wait_timeout_while(guard, max_wait, |done| !*done)
                .unwrap_or_else(|e| e.into_inner());
            *guard
        };
        self.remove_waiter(waiter_id);

        let session = self.session_manager.get_session(&session_nonce);
        if responded {
            return session.ok_or(AuthError::SessionMissing);
        }
        match session {
            // The response landed between the deadline and cleanup.
            Some(session) if session.is_authenticated => Ok(session),
            Some(session) => {
                self.session_manager.remove_session(&session);
                Err(AuthError::HandshakeTimeout)
            }
            None => Err(AuthError::HandshakeTimeout),
        }
    }

    fn remove_waiter(&self, waiter_id: i32) {
        self.initial_response_waiters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&waiter_id);
    }

    // === Inbound dispatch ===

    fn handle_incoming(&self, message: &AuthMessage) -> Result<(), AuthError> {
        if message.version != AUTH_VERSION {
            tracing::error!(
                version = %message.version,
                expected = AUTH_VERSION,
                peer = %message.identity_key,
                "dropping message with unsupported auth version"
            );
            return Ok(());
        }

        let result = codec::validate(message).and_then(|_| match message.message_type {
            MessageType::InitialRequest => self.process_initial_request(message),
            MessageType::InitialResponse => self.process_initial_response(message),
            MessageType::CertificateRequest => self.process_certificate_request(message),
            MessageType::CertificateResponse => self.process_certificate_response(message),
            MessageType::General => self.process_general_message(message),
        });

        if let Err(e) = &result {
            tracing::warn!(
                kind = %message.message_type,
                peer = %message.identity_key,
                error = %e,
                "failed to process inbound message"
            );
        }
        result
    }

    /// A peer opened a handshake: mint our session nonce, record the
    /// session as live, and answer with a signed initial response that
    /// encloses any certificates the request asked for.
    fn process_initial_request(&self, message: &AuthMessage) -> Result<(), AuthError> {
        let session_nonce = nonce::create_nonce(self.wallet.as_ref())?;
        self.session_manager.add_session(PeerSession {
            is_authenticated: true,
            session_nonce: session_nonce.clone(),
            peer_nonce: Some(message.initial_nonce.clone()),
            peer_identity_key: Some(message.identity_key),
            last_update: Self::now_ms(),
        })?;

        if self.auto_persist_last_session {
            let mut last = self
                .last_interacted_peer
                .write()
                .unwrap_or_else(|e| e.into_inner());
            if last.is_none() {
                *last = Some(message.identity_key);
            }
        }

        let certificates = if message.requested_certificates.is_empty() {
            Vec::new()
        } else {
            get_verifiable_certificates(
                self.wallet.as_ref(),
                self.certificate_store.as_ref(),
                &message.requested_certificates,
                &message.identity_key,
            )?
        };

        let mut response = AuthMessage::new(MessageType::InitialResponse, self.identity_key()?);
        response.initial_nonce = session_nonce.clone();
        response.your_nonce = message.initial_nonce.clone();
        response.requested_certificates = self.certificates_to_request.clone();
        response.certificates = certificates;

        // The signature binds both contributed nonces.
        let mut data = BASE64.decode(&message.initial_nonce)?;
        data.extend_from_slice(&BASE64.decode(&session_nonce)?);
        response.signature = self.sign(
            data,
            Self::key_id(&message.initial_nonce, &session_nonce),
            &message.identity_key,
        )?;

        self.transport.send(&response).map_err(|e| {
            AuthError::Transport(format!(
                "sending initial response to {}: {}",
                message.identity_key, e
            ))
        })
    }

    /// The counterparty answered our handshake: check that `your_nonce`
    /// is really ours, verify the nonce-binding signature, promote the
    /// session, and wake whoever is waiting on it.
    fn process_initial_response(&self, message: &AuthMessage) -> Result<(), AuthError> {
        if !nonce::verify_nonce(&message.your_nonce, self.wallet.as_ref())? {
            return Err(AuthError::NonceRejected);
        }

        let session = self
            .session_manager
            .get_session(&message.your_nonce)
            .ok_or(AuthError::SessionMissing)?;

        let mut data = BASE64.decode(&session.session_nonce)?;
        data.extend_from_slice(&BASE64.decode(&message.initial_nonce)?);
        self.verify(
            data,
            &message.signature,
            Self::key_id(&session.session_nonce, &message.initial_nonce),
            &message.identity_key,
        )?;

        let mut updated = session.clone();
        updated.peer_nonce = Some(message.initial_nonce.clone());
        updated.peer_identity_key = Some(message.identity_key);
        updated.is_authenticated = true;
        updated.last_update = Self::now_ms();
        self.session_manager.update_session(updated);
        self.remember_peer(&message.identity_key);

        self.wake_handshake_waiters(&session.session_nonce);

        if !self.certificates_to_request.is_empty() && !message.certificates.is_empty() {
            validate_certificates(self.wallet.as_ref(), message, &self.certificates_to_request)?;
            self.notify_certificates_received(&message.identity_key, &message.certificates)?;
        }

        if !message.requested_certificates.is_empty() {
            self.answer_certificate_request(
                &message.identity_key,
                &message.requested_certificates,
            )?;
        }

        Ok(())
    }

    /// A peer asked for certificates mid-session.
    fn process_certificate_request(&self, message: &AuthMessage) -> Result<(), AuthError> {
        if !nonce::verify_nonce(&message.your_nonce, self.wallet.as_ref())? {
            return Err(AuthError::NonceRejected);
        }

        let session = self
            .session_manager
            .get_session(&message.your_nonce)
            .ok_or(AuthError::SessionMissing)?;
        let peer_identity = session
            .peer_identity_key
            .ok_or(AuthError::SessionIncomplete("peer identity key"))?;

        self.verify(
            serde_json::to_vec(&message.requested_certificates)?,
            &message.signature,
            Self::key_id(&message.nonce, &session.session_nonce),
            &peer_identity,
        )?;

        let mut updated = session;
        updated.last_update = Self::now_ms();
        self.session_manager.update_session(updated);

        self.answer_certificate_request(&peer_identity, &message.requested_certificates)
    }

    /// A peer answered a certificate request. The enclosed certificates
    /// are validated against the request set echoed in the response
    /// itself; a stricter deployment would track the outstanding request
    /// per session instead.
    fn process_certificate_response(&self, message: &AuthMessage) -> Result<(), AuthError> {
        if !nonce::verify_nonce(&message.your_nonce, self.wallet.as_ref())? {
            return Err(AuthError::NonceRejected);
        }

        let session = self
            .session_manager
            .get_session(&message.your_nonce)
            .ok_or(AuthError::SessionMissing)?;

        self.verify(
            serde_json::to_vec(&message.certificates)?,
            &message.signature,
            Self::key_id(&message.nonce, &session.session_nonce),
            &message.identity_key,
        )?;

        validate_certificates(
            self.wallet.as_ref(),
            message,
            &message.requested_certificates,
        )?;

        let mut updated = session;
        updated.last_update = Self::now_ms();
        self.session_manager.update_session(updated);

        self.notify_certificates_received(&message.identity_key, &message.certificates)
    }

    /// An application payload under an authenticated session.
    fn process_general_message(&self, message: &AuthMessage) -> Result<(), AuthError> {
        if !nonce::verify_nonce(&message.your_nonce, self.wallet.as_ref())? {
            return Err(AuthError::NonceRejected);
        }

        let session = self
            .session_manager
            .get_session(&message.your_nonce)
            .ok_or(AuthError::SessionMissing)?;
        if !session.is_authenticated {
            return Err(AuthError::SessionIncomplete("session is not authenticated"));
        }
        let peer_identity = session
            .peer_identity_key
            .ok_or(AuthError::SessionIncomplete("peer identity key"))?;

        self.verify(
            message.payload.clone(),
            &message.signature,
            Self::key_id(&message.nonce, &session.session_nonce),
            &peer_identity,
        )?;

        let mut updated = session;
        updated.last_update = Self::now_ms();
        self.session_manager.update_session(updated);
        self.remember_peer(&message.identity_key);

        let callbacks = self
            .general_message_callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner());
        for callback in callbacks.values() {
            if let Err(e) = callback(&message.identity_key, &message.payload) {
                tracing::warn!(peer = %message.identity_key, error = %e, "general message listener failed");
            }
        }
        Ok(())
    }

    fn wake_handshake_waiters(&self, session_nonce: &str) {
        let waiters: Vec<ResponseWaiter> = {
            let mut map = self
                .initial_response_waiters
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            let ids: Vec<i32> = map
                .iter()
                .filter(|(_, w)| w.session_nonce == session_nonce)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter().filter_map(|id| map.remove(&id)).collect()
        };

        for waiter in waiters {
            let (flag, condvar) = &*waiter.signal;
            *flag.lock().unwrap_or_else(|e| e.into_inner()) = true;
            condvar.notify_all();
        }
    }

    fn notify_certificates_received(
        &self,
        sender: &PublicKey,
        certificates: &[VerifiableCertificate],
    ) -> Result<(), AuthError> {
        let callbacks = self
            .certificates_received_callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner());
        for callback in callbacks.values() {
            callback(sender, certificates)?;
        }
        Ok(())
    }

    /// Hand a certificate request to registered listeners, or answer it
    /// automatically from the certificate store.
    fn answer_certificate_request(
        &self,
        peer: &PublicKey,
        request: &RequestedCertificateSet,
    ) -> Result<(), AuthError> {
        {
            let callbacks = self
                .certificates_requested_callbacks
                .read()
                .unwrap_or_else(|e| e.into_inner());
            if !callbacks.is_empty() {
                for callback in callbacks.values() {
                    callback(peer, request)?;
                }
                return Ok(());
            }
        }

        let certificates = get_verifiable_certificates(
            self.wallet.as_ref(),
            self.certificate_store.as_ref(),
            request,
            peer,
        )?;
        if certificates.is_empty() {
            tracing::debug!(peer = %peer, "no certificates match the request");
            return Ok(());
        }
        self.send_certificates(peer, certificates, request.clone())
    }
}
