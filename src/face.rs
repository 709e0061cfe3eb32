use std::rc::Rc;

use tracing::{debug, info, trace, warn};

use crate::{
    clock::{Clock, Timestamp},
    command::{make_command_name, CommandInterestGenerator},
    config::FaceConfig,
    control::{ControlParameters, ControlResponse, RibCommand},
    name::Name,
    packet::{Data, Interest, Packet},
    security::{
        NoVerifyPolicyManager, PolicyManager, SecurityError, Sha256DigestSigner, Signer,
        ValidationRequest,
    },
    tables::{
        PendingInterestId, PendingInterestTable, PitEntry, RegisteredPrefixTable, RegistrationId,
        RegistrationState,
    },
    tlv::EncodingError,
    transport::{Channel, Connect, SocketId, TransportError},
};

pub type OnData = Box<dyn FnOnce(&mut Face, &Interest, Data)>;
pub type OnTimeout = Box<dyn FnOnce(&mut Face, &Interest)>;
pub type OnInterest = Box<dyn FnMut(&mut Face, &Name, &Interest, RegistrationId)>;
pub type OnRegisterFailed = Box<dyn FnOnce(&mut Face, &Name)>;
pub type OnVerified = Box<dyn FnOnce(&mut Face, Data)>;
pub type OnVerifyFailed = Box<dyn FnOnce(&mut Face, Data)>;

#[derive(Debug, thiserror::Error)]
pub enum FaceError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Security(#[from] SecurityError),
    #[error("the face has been shut down")]
    EngineClosed,
}

enum Link {
    // Not connected yet, the first send connects
    Pending(Box<dyn Connect>),
    Open(Channel),
    Lost,
    Closed,
}

// What to do once a pending Interest is answered or expires
enum Resolution {
    Application {
        on_data: OnData,
        on_timeout: OnTimeout,
    },
    Registration(RegistrationId),
    Certificate {
        on_verified: OnVerified,
        on_verify_failed: OnVerifyFailed,
        retry: u32,
        step_count: u32,
        original: Data,
    },
}

struct RegistrationCallbacks {
    on_interest: OnInterest,
    on_register_failed: OnRegisterFailed,
}

struct CommandSigningInfo {
    signer: Box<dyn Signer>,
    certificate_name: Name,
}

fn configure(channel: Channel, config: &FaceConfig) -> Channel {
    channel
        .with_max_queue_bytes(config.max_send_queue_bytes)
        .with_max_frame_size(config.max_packet_size)
}

/// The application's end of a connection to an NDN forwarder.
///
/// Nothing happens on its own: the owner calls [`Face::drive_once`]
/// repeatedly, and every callback runs from inside that call with the face
/// handed back to it, so callbacks can express Interests or reply with Data.
pub struct Face {
    link: Link,
    config: FaceConfig,
    clock: Box<dyn Clock>,
    pit: PendingInterestTable<Resolution>,
    registrations: RegisteredPrefixTable<RegistrationCallbacks>,
    command_generator: CommandInterestGenerator,
    signing: Option<CommandSigningInfo>,
    policy: Rc<dyn PolicyManager>,
}

impl Face {
    /// A face that calls `connector` the first time it has something to send.
    pub fn new(connector: impl Connect + 'static, clock: impl Clock + 'static) -> Self {
        Self::with_config(connector, clock, FaceConfig::default())
    }

    pub fn with_config(
        connector: impl Connect + 'static,
        clock: impl Clock + 'static,
        config: FaceConfig,
    ) -> Self {
        Self::from_link(Link::Pending(Box::new(connector)), clock, config)
    }

    /// A face over a channel that is already open.
    pub fn with_channel(channel: Channel, clock: impl Clock + 'static, config: FaceConfig) -> Self {
        let channel = configure(channel, &config);
        Self::from_link(Link::Open(channel), clock, config)
    }

    fn from_link(link: Link, clock: impl Clock + 'static, config: FaceConfig) -> Self {
        Self {
            link,
            config,
            clock: Box::new(clock),
            pit: PendingInterestTable::new(),
            registrations: RegisteredPrefixTable::new(),
            command_generator: CommandInterestGenerator::new(),
            signing: None,
            policy: Rc::new(NoVerifyPolicyManager),
        }
    }

    pub fn config(&self) -> &FaceConfig {
        &self.config
    }

    pub fn set_policy_manager(&mut self, policy: impl PolicyManager + 'static) {
        self.policy = Rc::new(policy);
    }

    /// Signs registration commands with `signer`, announcing `certificate_name`.
    pub fn set_command_signing_info(
        &mut self,
        signer: impl Signer + 'static,
        certificate_name: Name,
    ) {
        self.signing = Some(CommandSigningInfo {
            signer: Box::new(signer),
            certificate_name,
        });
    }

    pub fn now(&mut self) -> Timestamp {
        self.clock.now()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.link, Link::Closed)
    }

    pub fn pending_interest_count(&self) -> usize {
        self.pit.len()
    }

    /// The earliest moment a pending Interest can time out.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.pit.next_deadline()
    }

    pub fn registration_state(&self, id: RegistrationId) -> Option<RegistrationState> {
        self.registrations.get(id).map(|entry| entry.state)
    }

    pub fn socket_id(&self) -> Option<SocketId> {
        match &self.link {
            Link::Open(channel) => channel.socket_id(),
            _ => None,
        }
    }

    fn ensure_open(&self) -> Result<(), FaceError> {
        if self.is_closed() {
            return Err(FaceError::EngineClosed);
        }
        Ok(())
    }

    fn channel(&mut self) -> Result<&mut Channel, FaceError> {
        if let Link::Pending(connector) = &mut self.link {
            let channel = connector.connect()?;
            debug!("connected to forwarder");
            self.link = Link::Open(configure(channel, &self.config));
        }
        match &mut self.link {
            Link::Open(channel) => Ok(channel),
            Link::Closed => Err(FaceError::EngineClosed),
            Link::Pending(_) | Link::Lost => Err(TransportError::Disconnected.into()),
        }
    }

    /// Sends `interest` and waits for a matching Data or its lifetime to run out.
    ///
    /// A missing nonce or lifetime is filled in first. When this fails
    /// nothing is left pending and neither callback will run.
    pub fn express_interest(
        &mut self,
        interest: Interest,
        on_data: impl FnOnce(&mut Face, &Interest, Data) + 'static,
        on_timeout: impl FnOnce(&mut Face, &Interest) + 'static,
    ) -> Result<PendingInterestId, FaceError> {
        self.ensure_open()?;
        self.express(
            interest,
            Resolution::Application {
                on_data: Box::new(on_data),
                on_timeout: Box::new(on_timeout),
            },
        )
    }

    pub fn express_interest_for_name(
        &mut self,
        name: Name,
        on_data: impl FnOnce(&mut Face, &Interest, Data) + 'static,
        on_timeout: impl FnOnce(&mut Face, &Interest) + 'static,
    ) -> Result<PendingInterestId, FaceError> {
        self.express_interest(Interest::new(name), on_data, on_timeout)
    }

    fn express(
        &mut self,
        mut interest: Interest,
        resolution: Resolution,
    ) -> Result<PendingInterestId, FaceError> {
        let deadline = self.send_interest(&mut interest)?;
        let id = PendingInterestId::next();
        trace!(%id, name = %interest.name, "interest pending");
        self.pit.insert(
            id,
            PitEntry {
                interest,
                deadline,
                resolution,
            },
        );
        Ok(id)
    }

    // Completes and sends the Interest, returning when it expires.
    fn send_interest(&mut self, interest: &mut Interest) -> Result<Timestamp, FaceError> {
        if interest.nonce.is_none() {
            interest.nonce = Some(rand::random());
        }
        let lifetime_ms = *interest
            .interest_lifetime_ms
            .get_or_insert(self.config.default_interest_lifetime_ms);
        let wire = interest.wire_encode_with_limit(self.config.max_packet_size)?;
        self.channel()?.send(wire)?;
        Ok(self.clock.now().adding(lifetime_ms))
    }

    /// Forgets a pending Interest; its callbacks are dropped without running.
    pub fn remove_pending_interest(&mut self, id: PendingInterestId) -> Result<(), FaceError> {
        self.ensure_open()?;
        if self.pit.remove(id).is_some() {
            trace!(%id, "interest removed");
        }
        Ok(())
    }

    /// Asks the forwarder to send Interests under `prefix` to this face.
    ///
    /// `on_interest` runs for each Interest under the prefix once the
    /// forwarder has confirmed the registration. `on_register_failed` runs
    /// instead if the command times out or is refused, after which the
    /// registration is gone.
    pub fn register_prefix(
        &mut self,
        prefix: Name,
        on_interest: impl FnMut(&mut Face, &Name, &Interest, RegistrationId) + 'static,
        on_register_failed: impl FnOnce(&mut Face, &Name) + 'static,
    ) -> Result<RegistrationId, FaceError> {
        self.ensure_open()?;
        let parameters = ControlParameters::for_prefix(&prefix, self.config.forwarding_flags);
        let command_name = make_command_name(
            &self.config.command_prefix_name(),
            RibCommand::Register,
            &parameters,
        );
        let mut interest =
            Interest::new(command_name).with_lifetime_ms(self.config.command_interest_lifetime_ms);
        self.make_command_interest(&mut interest)?;

        let registration = RegistrationId::next();
        let command = self.express(interest, Resolution::Registration(registration))?;
        debug!(%registration, prefix = %prefix, "registering prefix");
        self.registrations.insert(
            registration,
            prefix,
            command,
            RegistrationCallbacks {
                on_interest: Box::new(on_interest),
                on_register_failed: Box::new(on_register_failed),
            },
        );
        Ok(registration)
    }

    /// Stops dispatching Interests for a registration. The forwarder is not told.
    pub fn remove_registered_prefix(&mut self, id: RegistrationId) -> Result<(), FaceError> {
        self.ensure_open()?;
        if let Some(RegistrationState::Pending(command)) = self.registration_state(id) {
            self.pit.remove(command);
        }
        if let Some((prefix, _)) = self.registrations.remove(id) {
            debug!(%id, prefix = %prefix, "registration removed");
        }
        Ok(())
    }

    /// Turns `interest` into a signed command Interest.
    pub fn make_command_interest(&mut self, interest: &mut Interest) -> Result<(), FaceError> {
        self.ensure_open()?;
        let now = self.clock.now();
        let digest_signer = Sha256DigestSigner;
        let (signer, certificate_name): (&dyn Signer, Name) = match &self.signing {
            Some(info) => (info.signer.as_ref(), info.certificate_name.clone()),
            None => (
                &digest_signer as &dyn Signer,
                self.policy.infer_signing_identity(&interest.name),
            ),
        };
        if !self
            .policy
            .check_signing_policy(&interest.name, &certificate_name)
        {
            return Err(SecurityError::SigningPolicy {
                name: interest.name.to_uri(),
                certificate: certificate_name.to_uri(),
            }
            .into());
        }
        self.command_generator
            .generate(interest, now, signer, &certificate_name)?;
        Ok(())
    }

    pub fn put_data(&mut self, data: &Data) -> Result<(), FaceError> {
        self.ensure_open()?;
        let wire = data.wire_encode_with_limit(self.config.max_packet_size)?;
        trace!(name = %data.name, len = wire.len(), "sending data");
        self.channel()?.send(wire)?;
        Ok(())
    }

    /// Sends an already encoded packet.
    pub fn send(&mut self, wire: Vec<u8>) -> Result<(), FaceError> {
        self.ensure_open()?;
        if wire.len() > self.config.max_packet_size {
            return Err(EncodingError::PacketTooLarge {
                size: wire.len(),
                limit: self.config.max_packet_size,
            }
            .into());
        }
        self.channel()?.send(wire)?;
        Ok(())
    }

    /// Runs `data` through the policy manager; exactly one callback runs,
    /// possibly before this returns.
    pub fn verify_data(
        &mut self,
        data: Data,
        on_verified: impl FnOnce(&mut Face, Data) + 'static,
        on_verify_failed: impl FnOnce(&mut Face, Data) + 'static,
    ) -> Result<(), FaceError> {
        self.ensure_open()?;
        self.verify_at(data, 0, Box::new(on_verified), Box::new(on_verify_failed));
        Ok(())
    }

    fn verify_at(
        &mut self,
        data: Data,
        step_count: u32,
        on_verified: OnVerified,
        on_verify_failed: OnVerifyFailed,
    ) {
        let policy = Rc::clone(&self.policy);
        if policy.require_verify(&data) {
            if let Some(request) =
                policy.check_verification_policy(self, &data, step_count, on_verified, on_verify_failed)
            {
                self.fetch_certificate(request, data);
            }
        } else if policy.skip_verify_and_trust(&data) {
            on_verified(self, data);
        } else {
            debug!(name = %data.name, "policy neither verifies nor trusts data");
            on_verify_failed(self, data);
        }
    }

    fn fetch_certificate(&mut self, request: ValidationRequest, original: Data) {
        let ValidationRequest {
            mut interest,
            on_verified,
            on_verify_failed,
            retry,
            step_count,
        } = request;
        let deadline = match self.send_interest(&mut interest) {
            Ok(deadline) => deadline,
            Err(e) => {
                warn!(name = %interest.name, error = %e, "cannot fetch certificate");
                on_verify_failed(self, original);
                return;
            }
        };
        debug!(name = %interest.name, step_count, retry, "fetching certificate");
        self.pit.insert(
            PendingInterestId::next(),
            PitEntry {
                interest,
                deadline,
                resolution: Resolution::Certificate {
                    on_verified,
                    on_verify_failed,
                    retry,
                    step_count,
                    original,
                },
            },
        );
    }

    fn complete_registration(&mut self, id: RegistrationId, data: &Data) {
        match ControlResponse::decode(data.content.as_slice()) {
            Ok(response) if response.is_success() => {
                if self.registrations.mark_registered(id) {
                    info!(%id, "prefix registered");
                }
            }
            Ok(response) => {
                let reason = format!("{} {}", response.status_code, response.status_text);
                self.fail_registration(id, &reason);
            }
            Err(e) => self.fail_registration(id, &format!("malformed response: {e}")),
        }
    }

    fn fail_registration(&mut self, id: RegistrationId, reason: &str) {
        if let Some((prefix, callbacks)) = self.registrations.remove(id) {
            warn!(%id, prefix = %prefix, reason, "prefix registration failed");
            if let Some(callbacks) = callbacks {
                (callbacks.on_register_failed)(self, &prefix);
            }
        }
    }

    /// Handles at most one inbound packet, then times out expired Interests.
    ///
    /// Returns whether anything happened. A lost connection is reported
    /// once; later calls keep timing out what is still pending.
    pub fn drive_once(&mut self) -> Result<bool, FaceError> {
        self.ensure_open()?;

        let mut frame = None;
        let mut lost = None;
        if let Link::Open(channel) = &mut self.link {
            match channel.flush().and_then(|()| channel.poll()) {
                Ok(polled) => frame = polled,
                Err(e) => lost = Some(e),
            }
        }

        let mut did_work = false;
        if let Some(frame) = frame {
            self.process_frame(&frame);
            did_work = true;
        }
        did_work |= self.expire_pending();

        if let Some(e) = lost {
            if let Link::Open(channel) = &mut self.link {
                warn!(error = %e, "connection to forwarder lost");
                channel.close();
                self.link = Link::Lost;
                return Err(e.into());
            }
        }
        Ok(did_work)
    }

    fn process_frame(&mut self, frame: &[u8]) {
        match Packet::decode(frame) {
            Ok(Packet::Interest(interest)) => self.dispatch_interest(interest),
            Ok(Packet::Data(data)) => self.satisfy(data),
            Ok(Packet::Unrecognized(typ)) => debug!(typ, "dropping unrecognized packet"),
            Err(e) => debug!(error = %e, len = frame.len(), "dropping malformed packet"),
        }
    }

    fn dispatch_interest(&mut self, interest: Interest) {
        let Some(id) = self.registrations.longest_match(&interest.name) else {
            debug!(name = %interest.name, "no registered prefix for interest");
            return;
        };
        // Taken out for the duration of the call so the callback can use the face
        let Some((prefix, mut callbacks)) = self.registrations.take_callbacks(id) else {
            return;
        };
        trace!(%id, name = %interest.name, "dispatching interest");
        (callbacks.on_interest)(self, &prefix, &interest, id);
        self.registrations.restore_callbacks(id, callbacks);
    }

    fn satisfy(&mut self, data: Data) {
        let now = self.clock.now();
        let Some(entry) = self
            .pit
            .find_match(&data, now)
            .and_then(|id| self.pit.remove(id))
        else {
            debug!(name = %data.name, "dropping unsolicited or late data");
            return;
        };

        match entry.resolution {
            Resolution::Application { on_data, .. } => on_data(self, &entry.interest, data),
            Resolution::Registration(registration) => self.verify_at(
                data,
                0,
                Box::new(move |face: &mut Face, data: Data| {
                    face.complete_registration(registration, &data)
                }),
                Box::new(move |face: &mut Face, _: Data| {
                    face.fail_registration(registration, "response failed verification")
                }),
            ),
            Resolution::Certificate {
                on_verified,
                on_verify_failed,
                step_count,
                ..
            } => self.verify_at(data, step_count, on_verified, on_verify_failed),
        }
    }

    fn expire_pending(&mut self) -> bool {
        let now = self.clock.now();
        let mut any_expired = false;
        for id in self.pit.expired_ids(now) {
            // An earlier callback may already have removed it
            let Some(entry) = self.pit.remove(id) else {
                continue;
            };
            any_expired = true;
            debug!(%id, name = %entry.interest.name, "interest timed out");

            match entry.resolution {
                Resolution::Application { on_timeout, .. } => on_timeout(self, &entry.interest),
                Resolution::Registration(registration) => {
                    self.fail_registration(registration, "command timed out")
                }
                Resolution::Certificate {
                    on_verified,
                    on_verify_failed,
                    retry,
                    step_count,
                    original,
                } => {
                    if retry > 0 {
                        let mut interest = entry.interest;
                        interest.nonce = None;
                        let request = ValidationRequest {
                            interest,
                            on_verified,
                            on_verify_failed,
                            retry: retry - 1,
                            step_count,
                        };
                        self.fetch_certificate(request, original);
                    } else {
                        on_verify_failed(self, original);
                    }
                }
            }
        }
        any_expired
    }

    /// Closes the connection and forgets everything pending without running
    /// any callback. Every later operation fails with `EngineClosed`.
    pub fn shutdown(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Link::Open(channel) = &mut self.link {
            channel.close();
        }
        self.link = Link::Closed;
        info!(
            pending = self.pit.len(),
            registrations = self.registrations.len(),
            "face shut down"
        );
        self.pit.clear();
        self.registrations.clear();
    }
}

impl Drop for Face {
    fn drop(&mut self) {
        self.shutdown();
    }
}
