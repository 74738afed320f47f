//! End-to-end tests for Peer authentication and message exchange.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use accord_auth::certificates::{issue_certificate, MemoryCertificateStore};
use accord_auth::nonce::random_base64;
use accord_auth::peer::{Peer, PeerOptions};
use accord_auth::session_manager::{DefaultSessionManager, SessionManager};
use accord_auth::transport::{MessageHandler, Transport};
use accord_auth::types::{AuthMessage, MessageType, RequestedCertificateSet};
use accord_auth::AuthError;
use accord_primitives::ec::{PrivateKey, PublicKey};
use accord_wallet::ProtoWallet;

/// Paired in-memory transport with synchronous delivery. Can be
/// silenced (messages vanish) or told to corrupt general payloads in
/// flight.
struct MockTransport {
    handler: Mutex<Option<Arc<MessageHandler>>>,
    paired: Mutex<Option<Arc<MockTransport>>>,
    received: Mutex<Vec<MessageType>>,
    silent: AtomicBool,
    corrupt_general: AtomicBool,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Arc::new(MockTransport {
            handler: Mutex::new(None),
            paired: Mutex::new(None),
            received: Mutex::new(Vec::new()),
            silent: AtomicBool::new(false),
            corrupt_general: AtomicBool::new(false),
        })
    }

    fn pair(a: &Arc<MockTransport>, b: &Arc<MockTransport>) {
        *a.paired.lock().unwrap() = Some(Arc::clone(b));
        *b.paired.lock().unwrap() = Some(Arc::clone(a));
    }

    /// Deliver a message straight into this transport's handler, as the
    /// network would.
    fn deliver(&self, message: &AuthMessage) -> Result<(), AuthError> {
        self.received.lock().unwrap().push(message.message_type);
        // Take the handler out of the lock before invoking it so nested
        // sends can re-enter this transport.
        let handler = self
            .handler
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::Transport("no handler registered".into()))?;
        handler(message)
    }

    fn received_kinds(&self) -> Vec<MessageType> {
        self.received.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn send(&self, message: &AuthMessage) -> Result<(), AuthError> {
        if self.silent.load(Ordering::Relaxed) {
            return Ok(());
        }
        let paired = self
            .paired
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::Transport("not connected".into()))?;

        if self.corrupt_general.load(Ordering::Relaxed)
            && message.message_type == MessageType::General
        {
            let mut tampered = message.clone();
            tampered.payload[0] ^= 0x01;
            return paired.deliver(&tampered);
        }
        paired.deliver(message)
    }

    fn on_data(&self, handler: MessageHandler) -> Result<(), AuthError> {
        *self.handler.lock().unwrap() = Some(Arc::new(handler));
        Ok(())
    }
}

struct TestPeer {
    peer: Arc<Peer>,
    transport: Arc<MockTransport>,
    sessions: Arc<DefaultSessionManager>,
    identity: PublicKey,
}

fn key(val: u8) -> PrivateKey {
    let mut bytes = [0u8; 32];
    bytes[31] = val;
    PrivateKey::from_bytes(&bytes).unwrap()
}

fn make_peer(root: PrivateKey, options: impl FnOnce(&mut PeerOptions)) -> TestPeer {
    let wallet = Arc::new(ProtoWallet::new(root));
    let identity = wallet.identity_key();
    let transport = MockTransport::new();
    let sessions = Arc::new(DefaultSessionManager::new());

    let mut peer_options = PeerOptions {
        wallet,
        transport: Arc::clone(&transport) as Arc<dyn Transport>,
        certificates_to_request: None,
        certificate_store: None,
        session_manager: Some(Arc::clone(&sessions) as Arc<dyn SessionManager>),
        auto_persist_last_session: None,
    };
    options(&mut peer_options);

    TestPeer {
        peer: Peer::new(peer_options),
        transport,
        sessions,
        identity,
    }
}

fn paired_peers() -> (TestPeer, TestPeer) {
    let alice = make_peer(key(42), |_| {});
    let bob = make_peer(key(69), |_| {});
    MockTransport::pair(&alice.transport, &bob.transport);
    (alice, bob)
}

#[test]
fn handshake_and_general_message() {
    let (alice, bob) = paired_peers();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sender = Arc::new(Mutex::new(None));
    let received_clone = Arc::clone(&received);
    let sender_clone = Arc::clone(&sender);
    bob.peer.listen_for_general_messages(Box::new(move |from, payload| {
        *sender_clone.lock().unwrap() = Some(*from);
        *received_clone.lock().unwrap() = payload.to_vec();
        Ok(())
    }));

    alice
        .peer
        .to_peer(&[0xDE, 0xAD, 0xBE, 0xEF], Some(&bob.identity), None)
        .unwrap();

    assert_eq!(*received.lock().unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(sender.lock().unwrap().unwrap(), alice.identity);

    // The handshake ran first: Bob saw the initial request, then the
    // payload.
    assert_eq!(
        bob.transport.received_kinds(),
        vec![MessageType::InitialRequest, MessageType::General]
    );
}

#[test]
fn bidirectional_messaging() {
    let (alice, bob) = paired_peers();

    let bob_received = Arc::new(Mutex::new(Vec::new()));
    let clone = Arc::clone(&bob_received);
    bob.peer.listen_for_general_messages(Box::new(move |_, payload| {
        *clone.lock().unwrap() = payload.to_vec();
        Ok(())
    }));

    let alice_received = Arc::new(Mutex::new(Vec::new()));
    let clone = Arc::clone(&alice_received);
    alice.peer.listen_for_general_messages(Box::new(move |_, payload| {
        *clone.lock().unwrap() = payload.to_vec();
        Ok(())
    }));

    alice
        .peer
        .to_peer(b"hello bob", Some(&bob.identity), None)
        .unwrap();
    assert_eq!(&*bob_received.lock().unwrap(), b"hello bob");

    bob.peer
        .to_peer(b"hello alice", Some(&alice.identity), None)
        .unwrap();
    assert_eq!(&*alice_received.lock().unwrap(), b"hello alice");
}

#[test]
fn handshake_times_out_against_silent_peer() {
    let (alice, bob) = paired_peers();
    alice.transport.silent.store(true, Ordering::Relaxed);

    let started = std::time::Instant::now();
    let result = alice.peer.to_peer(
        b"anyone there?",
        Some(&bob.identity),
        Some(Duration::from_millis(50)),
    );
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(AuthError::HandshakeTimeout)));
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(5));

    // No authenticated session was left behind.
    assert!(alice.sessions.get_session(&bob.identity.to_hex()).is_none());
}

#[test]
fn tampered_payload_is_rejected() {
    let (alice, bob) = paired_peers();

    let fired = Arc::new(AtomicUsize::new(0));
    let clone = Arc::clone(&fired);
    bob.peer.listen_for_general_messages(Box::new(move |_, _| {
        clone.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }));

    // Let the handshake complete untouched, then corrupt the payload.
    alice
        .peer
        .get_authenticated_session(Some(&bob.identity), None)
        .unwrap();
    alice.transport.corrupt_general.store(true, Ordering::Relaxed);

    let result = alice.peer.to_peer(b"integrity matters", Some(&bob.identity), None);
    assert!(result.is_err());
    assert_eq!(fired.load(Ordering::Relaxed), 0);
}

#[test]
fn forged_your_nonce_is_rejected() {
    let (alice, bob) = paired_peers();

    // Establish a legitimate session so Bob has state an attacker might
    // hope to hit.
    alice
        .peer
        .to_peer(b"legit", Some(&bob.identity), None)
        .unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let clone = Arc::clone(&fired);
    bob.peer.listen_for_general_messages(Box::new(move |_, _| {
        clone.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }));

    // An adversary echoes a nonce Bob never minted.
    let mallory = ProtoWallet::new(key(99));
    let mut forged = AuthMessage::new(MessageType::General, mallory.identity_key());
    forged.nonce = random_base64(32);
    forged.your_nonce = random_base64(48);
    forged.payload = b"evil".to_vec();
    forged.signature = vec![1u8; 64];

    let result = bob.transport.deliver(&forged);
    assert!(matches!(result, Err(AuthError::NonceRejected)));
    assert_eq!(fired.load(Ordering::Relaxed), 0);
}

#[test]
fn certificates_are_enclosed_in_initial_response() {
    let certifier = ProtoWallet::new(key(7));

    let mut requested = RequestedCertificateSet::default();
    requested.certifiers.push(certifier.identity_key());
    requested
        .certificate_types
        .insert("employment".into(), vec!["role".into()]);

    // Bob holds a matching certificate.
    let bob_root = key(69);
    let bob_subject = bob_root.public_key();
    let mut fields = BTreeMap::new();
    fields.insert("role".to_string(), "engineer".to_string());
    fields.insert("team".to_string(), "protocol".to_string());
    let master = issue_certificate(&certifier, &bob_subject, &fields, "employment", None).unwrap();

    let store = Arc::new(MemoryCertificateStore::new());
    store.add(master);

    let alice = make_peer(key(42), |options| {
        options.certificates_to_request = Some(requested.clone());
    });
    let bob = make_peer(bob_root, |options| {
        options.certificate_store = Some(store);
    });
    MockTransport::pair(&alice.transport, &bob.transport);

    let alice_wallet = ProtoWallet::new(key(42));
    let received_roles = Arc::new(Mutex::new(Vec::new()));
    let clone = Arc::clone(&received_roles);
    alice
        .peer
        .listen_for_certificates_received(Box::new(move |_, certificates| {
            for certificate in certificates {
                let mut disclosed = certificate.clone();
                let fields = disclosed.decrypt_fields(&alice_wallet)?;
                clone.lock().unwrap().push(fields.get("role").cloned());
            }
            Ok(())
        }));

    alice
        .peer
        .to_peer(b"hello", Some(&bob.identity), None)
        .unwrap();

    let roles = received_roles.lock().unwrap();
    assert_eq!(roles.as_slice(), [Some("engineer".to_string())]);
}

#[test]
fn certificate_request_round_trip() {
    let certifier = ProtoWallet::new(key(7));
    let bob_root = key(69);
    let bob_subject = bob_root.public_key();

    let mut fields = BTreeMap::new();
    fields.insert("email".to_string(), "bob@example.com".to_string());
    let master = issue_certificate(&certifier, &bob_subject, &fields, "contact", None).unwrap();
    let store = Arc::new(MemoryCertificateStore::new());
    store.add(master);

    let alice = make_peer(key(42), |_| {});
    let bob = make_peer(bob_root, |options| {
        options.certificate_store = Some(store);
    });
    MockTransport::pair(&alice.transport, &bob.transport);

    let received = Arc::new(AtomicUsize::new(0));
    let clone = Arc::clone(&received);
    alice
        .peer
        .listen_for_certificates_received(Box::new(move |_, certificates| {
            clone.fetch_add(certificates.len(), Ordering::Relaxed);
            Ok(())
        }));

    let mut requirements = RequestedCertificateSet::default();
    requirements.certifiers.push(certifier.identity_key());
    requirements
        .certificate_types
        .insert("contact".into(), vec!["email".into()]);

    alice
        .peer
        .request_certificates(&bob.identity, requirements, None)
        .unwrap();

    assert_eq!(received.load(Ordering::Relaxed), 1);
    assert_eq!(
        bob.transport.received_kinds(),
        vec![MessageType::InitialRequest, MessageType::CertificateRequest]
    );
}

#[test]
fn certificates_requested_listener_overrides_auto_response() {
    let alice = make_peer(key(42), |_| {});
    let bob = make_peer(key(69), |_| {});
    MockTransport::pair(&alice.transport, &bob.transport);

    let asked = Arc::new(AtomicUsize::new(0));
    let clone = Arc::clone(&asked);
    bob.peer
        .listen_for_certificates_requested(Box::new(move |_, _| {
            clone.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }));

    let mut requirements = RequestedCertificateSet::default();
    requirements
        .certificate_types
        .insert("anything".into(), vec!["field".into()]);

    alice
        .peer
        .request_certificates(&bob.identity, requirements, None)
        .unwrap();

    assert_eq!(asked.load(Ordering::Relaxed), 1);
    // The listener swallowed the request; no response came back.
    assert_eq!(
        alice.transport.received_kinds(),
        vec![MessageType::InitialResponse]
    );
}

#[test]
fn last_peer_affinity() {
    let (alice, bob) = paired_peers();

    let received = Arc::new(Mutex::new(Vec::new()));
    let clone = Arc::clone(&received);
    bob.peer.listen_for_general_messages(Box::new(move |_, payload| {
        clone.lock().unwrap().push(payload.to_vec());
        Ok(())
    }));

    // First message names Bob explicitly; the second relies on the
    // remembered peer.
    alice
        .peer
        .to_peer(&[0xAA], Some(&bob.identity), None)
        .unwrap();
    alice.peer.to_peer(&[0x01], None, None).unwrap();

    assert_eq!(*received.lock().unwrap(), vec![vec![0xAA], vec![0x01]]);
}

#[test]
fn unregistered_listener_does_not_fire() {
    let (alice, bob) = paired_peers();

    let fired = Arc::new(AtomicUsize::new(0));
    let clone = Arc::clone(&fired);
    let id = bob.peer.listen_for_general_messages(Box::new(move |_, _| {
        clone.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }));

    let kept = Arc::new(AtomicUsize::new(0));
    let clone = Arc::clone(&kept);
    bob.peer.listen_for_general_messages(Box::new(move |_, _| {
        clone.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }));

    bob.peer.stop_listening_for_general_messages(id);
    // Stopping with a foreign or stale ID is a silent no-op.
    bob.peer.stop_listening_for_certificates_received(id);
    bob.peer.stop_listening_for_general_messages(id);

    alice
        .peer
        .to_peer(b"ping", Some(&bob.identity), None)
        .unwrap();

    assert_eq!(fired.load(Ordering::Relaxed), 0);
    assert_eq!(kept.load(Ordering::Relaxed), 1);
}

#[test]
fn version_mismatch_is_dropped_silently() {
    let (alice, bob) = paired_peers();

    let fired = Arc::new(AtomicUsize::new(0));
    let clone = Arc::clone(&fired);
    bob.peer.listen_for_general_messages(Box::new(move |_, _| {
        clone.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }));

    let mallory = ProtoWallet::new(key(99));
    let mut message = AuthMessage::new(MessageType::General, mallory.identity_key());
    message.version = "0.2".into();
    message.nonce = random_base64(32);
    message.your_nonce = random_base64(48);
    message.payload = b"from the future".to_vec();
    message.signature = vec![1u8; 64];

    // Dropped, not an error.
    bob.transport.deliver(&message).unwrap();
    assert_eq!(fired.load(Ordering::Relaxed), 0);
    assert!(bob
        .sessions
        .get_session(&mallory.identity_key().to_hex())
        .is_none());

    // The same message with the right version gets as far as nonce
    // verification and is rejected there.
    message.version = "0.1".into();
    assert!(bob.transport.deliver(&message).is_err());

    let _ = alice;
}

#[test]
fn concurrent_sends_share_one_handshake() {
    let (alice, bob) = paired_peers();
    let alice = Arc::new(alice);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let alice = Arc::clone(&alice);
            let bob_identity = bob.identity;
            std::thread::spawn(move || {
                alice
                    .peer
                    .to_peer(&[i], Some(&bob_identity), Some(Duration::from_secs(2)))
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let kinds = bob.transport.received_kinds();
    let handshakes = kinds
        .iter()
        .filter(|k| **k == MessageType::InitialRequest)
        .count();
    let generals = kinds
        .iter()
        .filter(|k| **k == MessageType::General)
        .count();
    assert_eq!(handshakes, 1, "expected a single handshake, saw {kinds:?}");
    assert_eq!(generals, 4);
}
