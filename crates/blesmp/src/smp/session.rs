//! Pairing session lifecycle
//!
//! A [`PairingSession`] owns one worker thread that drives the whole
//! pairing exchange from start to finish, blocking on the event queue at
//! every point where it needs input from the peer, the controller or the
//! user. The surrounding stack feeds those inputs in through the `on_*`
//! producers; they only enqueue and never touch pairing state.

use super::codec::{PairingConfirm, PairingFailed};
use super::constants::*;
use super::crypto::MyOobData;
use super::keys::PairingOutcome;
use super::queue::{EventQueue, PairingEvent};
use super::types::*;
use crate::gap::AddressWithType;
use log::{debug, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Outbound SMP channel (L2CAP CID 0x0006). Sends are fire-and-forget
/// enqueues; a dead link surfaces as a wait timeout.
pub trait SmpPduChannel: Send + Sync {
    fn send_smp_pdu(&self, pdu: &[u8]);
}

/// LE security command submission towards the controller
pub trait LeSecurityInterface: Send + Sync {
    /// Submit LE Start Encryption (Central only)
    fn le_start_encryption(&self, connection_handle: u16, rand: [u8; 8], ediv: u16, key: [u8; 16]);

    /// Submit LE Long Term Key Request Reply (Peripheral only)
    fn le_ltk_reply(&self, connection_handle: u16, key: [u8; 16]);
}

/// Prompts towards the user. Answers are delivered asynchronously through
/// [`PairingSession::on_ui`].
pub trait PairingUi: Send + Sync {
    /// Show a passkey the remote side will type in
    fn display_passkey(&self, passkey: u32);

    /// Ask whether a remotely initiated pairing should go ahead; answered
    /// with [`UiAction::PairingAccepted`] (non-zero value accepts)
    fn prompt_pairing_accept(&self);

    /// Show the 6-digit comparison value; answered with
    /// [`UiAction::ConfirmYesNo`] (zero for "no", the echoed value for
    /// "yes")
    fn prompt_numeric_comparison(&self, value: u32);

    /// Ask the user to type the passkey shown on the remote device;
    /// answered with [`UiAction::Passkey`]
    fn prompt_passkey_entry(&self);
}

/// Out-of-band data received from the peer before pairing started
#[derive(Debug, Clone, Copy)]
pub struct RemoteOobData {
    /// Legacy pairing TK
    pub security_manager_tk: [u8; 16],
    /// Secure Connections confirm value C
    pub le_sc_confirm: [u8; 16],
    /// Secure Connections random value r
    pub le_sc_random: [u8; 16],
}

/// Everything needed to run one pairing attempt
///
/// Handed to [`PairingSession::start`]; the worker owns it for the
/// session's lifetime.
pub struct InitialInformations {
    /// Local link-layer role; the Central is the pairing initiator
    pub local_role: Role,
    pub local_address: AddressWithType,
    pub remote_address: AddressWithType,

    pub io_capability: IoCapability,
    pub auth_req: AuthRequirements,
    /// Maximum encryption key size to advertise (capped at 16)
    pub max_encryption_key_size: u8,
    /// Keys offered for distribution by the initiator side
    pub initiator_key_distribution: KeyDistribution,
    /// Keys offered for distribution by the responder side
    pub responder_key_distribution: KeyDistribution,

    /// OOB material this device generated and handed to the peer
    pub local_oob_data: Option<MyOobData>,
    /// OOB material received from the peer
    pub remote_oob_data: Option<RemoteOobData>,

    /// Identity material distributed in Phase 3
    pub local_identity_address: AddressWithType,
    pub local_irk: [u8; 16],
    pub local_csrk: [u8; 16],

    /// True when the peer asked for this pairing (inbound Pairing Request
    /// or Security Request); gates the accept prompt
    pub remotely_initiated: bool,
    /// The L2CAP packet that triggered the session, if any (the Pairing
    /// Request for a Peripheral)
    pub initial_packet: Option<Vec<u8>>,

    pub connection_handle: u16,

    pub pdu_channel: Arc<dyn SmpPduChannel>,
    pub le_security: Arc<dyn LeSecurityInterface>,
    pub ui: Arc<dyn PairingUi>,
}

/// Result of a finished pairing session
pub type PairingResult = Result<PairingOutcome, PairingFailure>;

/// One in-flight pairing attempt
///
/// The worker starts immediately on construction. Dropping the session
/// signals exit and joins the worker.
pub struct PairingSession {
    queue: Arc<EventQueue>,
    worker: Option<JoinHandle<PairingResult>>,
}

impl PairingSession {
    /// Start pairing with the standard 30 second per-wait timeout
    pub fn start(informations: InitialInformations) -> Self {
        Self::start_with_timeout(informations, SMP_TIMEOUT)
    }

    pub(crate) fn start_with_timeout(
        informations: InitialInformations,
        timeout: Duration,
    ) -> Self {
        let queue = Arc::new(EventQueue::new(timeout));
        let worker_queue = Arc::clone(&queue);

        let worker = thread::spawn(move || Pairing::new(informations, worker_queue).run());

        Self {
            queue,
            worker: Some(worker),
        }
    }

    /// SMP PDU received from the remote device
    pub fn on_peer_pdu(&self, pdu: Vec<u8>) {
        self.queue.push(PairingEvent::Pdu(pdu));
    }

    /// HCI event received from the controller (`[code, len, params...]`)
    pub fn on_hci_event(&self, event: Vec<u8>) {
        self.queue.push(PairingEvent::Hci(event));
    }

    /// LE meta event received from the controller, as a full HCI event
    /// packet
    pub fn on_hci_le_event(&self, event: Vec<u8>) {
        self.queue.push(PairingEvent::Hci(event));
    }

    /// Answer from the user interface
    pub fn on_ui(&self, action: UiAction, value: u32) {
        self.queue.push(PairingEvent::Ui(action, value));
    }

    /// Abort the pairing. Idempotent; may be called from any thread.
    pub fn send_exit(&self) {
        self.queue.push(PairingEvent::Exit);
    }

    /// Block until the worker finishes and return its result
    pub fn wait_result(mut self) -> PairingResult {
        match self.worker.take() {
            Some(worker) => worker.join().unwrap_or(Err(PairingFailure::Exited)),
            None => Err(PairingFailure::Exited),
        }
    }
}

impl Drop for PairingSession {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.queue.push(PairingEvent::Exit);
            let _ = worker.join();
        }
    }
}

/// Worker-side state. The worker is the only mutator; cryptographic
/// material never leaves it.
pub(crate) struct Pairing {
    pub(crate) info: InitialInformations,
    queue: Arc<EventQueue>,
    /// Holds at most one PAIRING_CONFIRM that arrived while a passkey
    /// prompt was outstanding
    cached_confirm: Option<PairingConfirm>,
}

impl Pairing {
    pub(crate) fn new(info: InitialInformations, queue: Arc<EventQueue>) -> Self {
        Self {
            info,
            queue,
            cached_confirm: None,
        }
    }

    /// In this core the Central always plays the pairing initiator
    pub(crate) fn is_initiator(&self) -> bool {
        self.info.local_role == Role::Central
    }

    pub(crate) fn send_pdu(&self, pdu: &[u8]) {
        self.info.pdu_channel.send_smp_pdu(pdu);
    }

    /// Initiator and responder address-with-type, in that order
    pub(crate) fn pairing_addresses(&self) -> (AddressWithType, AddressWithType) {
        if self.is_initiator() {
            (self.info.local_address, self.info.remote_address)
        } else {
            (self.info.remote_address, self.info.local_address)
        }
    }

    pub(crate) fn run(mut self) -> PairingResult {
        info!(
            "pairing started with {} as {:?}",
            self.info.remote_address, self.info.local_role
        );

        let result = self.pairing_main();

        match &result {
            Ok(outcome) => info!(
                "pairing with {} complete, key size {}",
                self.info.remote_address, outcome.key_size
            ),
            Err(failure) => {
                if let Some(reason) = failure.wire_reason() {
                    self.send_pdu(&PairingFailed::new(reason).serialize());
                }
                info!("pairing with {} failed: {}", self.info.remote_address, failure);
            }
        }

        result
    }

    fn pairing_main(&mut self) -> SmpResult<PairingOutcome> {
        if self.info.remotely_initiated {
            self.accept_prompt()?;
        }

        let features = self.exchange_pairing_features()?;
        debug!(
            "features negotiated: {} ({}), key size {}",
            features.association_model,
            if features.secure_connections {
                "secure connections"
            } else {
                "legacy"
            },
            features.max_key_size
        );

        let ltk = if features.secure_connections {
            self.secure_connections_phase2(&features)?
        } else {
            self.legacy_phase2(&features)?
        };

        self.enable_encryption(&ltk)?;
        debug!("link encrypted, starting key distribution");

        let distributed_keys = self.distribute_keys(&features, ltk)?;

        Ok(PairingOutcome {
            ltk,
            key_size: features.max_key_size,
            authenticated: features.authenticated(),
            secure_connections: features.secure_connections,
            distributed_keys,
        })
    }

    /// Ask the user whether the remotely initiated pairing may proceed.
    /// Anything except an affirmative answer aborts silently.
    fn accept_prompt(&mut self) -> SmpResult<()> {
        self.info.ui.prompt_pairing_accept();

        match self.wait_event() {
            PairingEvent::Ui(UiAction::PairingAccepted, value) if value != 0 => Ok(()),
            PairingEvent::Exit => Err(PairingFailure::Exited),
            _ => Err(PairingFailure::UserDeclined),
        }
    }

    pub(crate) fn wait_event(&mut self) -> PairingEvent {
        self.queue.wait()
    }

    /// Wait for a specific SMP command and return the raw validated PDU.
    ///
    /// An inbound PAIRING_FAILED surfaces its reason code; keypress
    /// notifications are skipped; any other mismatch aborts.
    pub(crate) fn wait_packet(&mut self, code: u8) -> SmpResult<Vec<u8>> {
        loop {
            let bytes = match self.wait_event() {
                PairingEvent::Exit => return Err(PairingFailure::Exited),
                PairingEvent::Hci(_) => {
                    return Err(PairingFailure::UnexpectedEvent(format!(
                        "was expecting {}, received an HCI event instead",
                        code_text(code)
                    )))
                }
                PairingEvent::Ui(..) => {
                    return Err(PairingFailure::UnexpectedEvent(format!(
                        "was expecting {}, received a UI event instead",
                        code_text(code)
                    )))
                }
                PairingEvent::Pdu(bytes) => bytes,
            };

            let received = match bytes.first() {
                Some(&received) => received,
                None => {
                    return Err(PairingFailure::MalformedPacket("empty SMP packet".into()))
                }
            };

            if received == SMP_KEYPRESS_NOTIFICATION && code != SMP_KEYPRESS_NOTIFICATION {
                debug!("keypress notification from peer, continuing to wait");
                continue;
            }

            if received == SMP_PAIRING_FAILED && code != SMP_PAIRING_FAILED {
                let failed = PairingFailed::parse(&bytes)?;
                return Err(PairingFailure::PeerFailed(failed.reason));
            }

            if received != code {
                return Err(PairingFailure::UnexpectedEvent(format!(
                    "was expecting {}, received {} instead",
                    code_text(code),
                    code_text(received)
                )));
            }

            return Ok(bytes);
        }
    }

    /// Wait for PAIRING_CONFIRM, consuming a cached out-of-order confirm
    /// first if one was parked during a passkey prompt
    pub(crate) fn wait_pairing_confirm(&mut self) -> SmpResult<PairingConfirm> {
        if let Some(cached) = self.cached_confirm.take() {
            return Ok(cached);
        }

        PairingConfirm::parse(&self.wait_packet(SMP_PAIRING_CONFIRM)?)
    }

    /// Wait for the user's numeric-comparison answer; returns the raw
    /// value (zero means "no")
    pub(crate) fn wait_ui_numeric_confirm(&mut self) -> SmpResult<u32> {
        match self.wait_event() {
            PairingEvent::Exit => Err(PairingFailure::Exited),
            PairingEvent::Ui(UiAction::ConfirmYesNo, value) => Ok(value),
            _ => Err(PairingFailure::UnexpectedEvent(
                "was expecting a numeric comparison answer".into(),
            )),
        }
    }

    /// Wait for the passkey the user typed.
    ///
    /// The peer may have finished its side already and sent its
    /// PAIRING_CONFIRM while the user is still typing; that one confirm
    /// is parked in the single-slot cache and the wait is reissued.
    pub(crate) fn wait_ui_passkey(&mut self) -> SmpResult<u32> {
        let mut event = self.wait_event();

        if let PairingEvent::Pdu(bytes) = event {
            match bytes.first() {
                Some(&SMP_PAIRING_CONFIRM) => {
                    let confirm = PairingConfirm::parse(&bytes)?;
                    if self.cached_confirm.replace(confirm).is_some() {
                        return Err(PairingFailure::UnexpectedEvent(
                            "second Pairing Confirm while waiting for passkey".into(),
                        ));
                    }
                    event = self.wait_event();
                }
                Some(&SMP_PAIRING_FAILED) => {
                    let failed = PairingFailed::parse(&bytes)?;
                    return Err(PairingFailure::PeerFailed(failed.reason));
                }
                _ => {
                    return Err(PairingFailure::UnexpectedEvent(
                        "was expecting the passkey, received a bad packet instead".into(),
                    ))
                }
            }
        }

        match event {
            PairingEvent::Exit => Err(PairingFailure::Exited),
            PairingEvent::Ui(UiAction::Passkey, value) if value <= 999_999 => Ok(value),
            _ => Err(PairingFailure::PasskeyEntryFailed),
        }
    }
}
