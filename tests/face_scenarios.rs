mod common;

use std::{cell::Cell, rc::Rc};

use common::{settle, signed_data, test_clock, Events, RegisterMode, TestForwarder};
use reto_face::{
    blob::Blob,
    config::FaceConfig,
    control::{ControlResponse, STATUS_OK},
    face::{Face, FaceError, OnVerified, OnVerifyFailed},
    name::Name,
    packet::{Data, Interest, Packet},
    security::{PolicyManager, Sha256DigestPolicyManager, ValidationRequest},
    tables::{RegistrationId, RegistrationState},
    transport::{local::local_link, Channel, TransportError},
};

fn face_with_peer() -> (Face, Channel, reto_face::clock::ManualClock) {
    let clock = test_clock();
    let (ours, theirs) = local_link::<65536>();
    let face = Face::with_channel(ours, clock.clone(), FaceConfig::default());
    (face, theirs, clock)
}

fn interests_from(peer: &mut Channel) -> Vec<Interest> {
    let mut interests = Vec::new();
    while let Some(frame) = peer.poll().unwrap() {
        if let Ok(Packet::Interest(interest)) = Packet::decode(&frame) {
            interests.push(interest);
        }
    }
    interests
}

#[test]
fn data_for_root_name_fires_on_data_once() {
    let (mut face, mut peer, clock) = face_with_peer();
    let events = Events::default();
    let (on_data, on_timeout) = (events.clone(), events.clone());
    face.express_interest(
        Interest::new(Name::from_uri("/")),
        move |_, interest, data| {
            assert!(interest.name.is_empty());
            assert!(data.name.is_empty());
            on_data.record("data");
        },
        move |_, _| on_timeout.record("timeout"),
    )
    .unwrap();
    assert_eq!(face.pending_interest_count(), 1);

    let reply = signed_data(Data::new(Name::from_uri("/"))).wire_encode().unwrap();
    peer.send(reply.clone()).unwrap();
    peer.send(reply).unwrap();

    assert!(face.drive_once().unwrap());
    assert_eq!(face.pending_interest_count(), 0);
    // The duplicate finds nothing to satisfy
    assert!(face.drive_once().unwrap());

    clock.advance(10_000);
    face.drive_once().unwrap();
    assert_eq!(events.all(), vec!["data"]);
}

#[test]
fn unanswered_interest_times_out_exactly_once() {
    let (mut face, _silent_peer, clock) = face_with_peer();
    let events = Events::default();
    let (on_data, on_timeout) = (events.clone(), events.clone());
    let started = clock.current();
    let fired_at = Rc::new(Cell::new(None));
    let fired = Rc::clone(&fired_at);
    let timeout_clock = clock.clone();
    face.express_interest(
        Interest::new(Name::from_uri("/nowhere")).with_lifetime_ms(1000),
        move |_, _, _| on_data.record("data"),
        move |_, interest| {
            assert_eq!(interest.name, Name::from_uri("/nowhere"));
            fired.set(Some(timeout_clock.current()));
            on_timeout.record("timeout");
        },
    )
    .unwrap();

    for _ in 0..30 {
        clock.advance(100);
        face.drive_once().unwrap();
    }
    assert_eq!(events.all(), vec!["timeout"]);
    let elapsed = fired_at.get().unwrap().difference(&started).unwrap();
    assert!(elapsed >= 1000);
    assert_eq!(face.pending_interest_count(), 0);
}

#[test]
fn late_data_is_dropped() {
    let (mut face, mut peer, clock) = face_with_peer();
    let events = Events::default();
    let (on_data, on_timeout) = (events.clone(), events.clone());
    face.express_interest(
        Interest::new(Name::from_uri("/slow")).with_lifetime_ms(100),
        move |_, _, _| on_data.record("data"),
        move |_, _| on_timeout.record("timeout"),
    )
    .unwrap();

    // The reply is already queued when the deadline passes
    clock.advance(100);
    peer.send(signed_data(Data::new(Name::from_uri("/slow"))).wire_encode().unwrap())
        .unwrap();
    face.drive_once().unwrap();
    face.drive_once().unwrap();
    assert_eq!(events.all(), vec!["timeout"]);
}

#[test]
fn removed_interest_never_fires() {
    let (mut face, mut peer, clock) = face_with_peer();
    let events = Events::default();
    let (on_data, on_timeout) = (events.clone(), events.clone());
    let id = face
        .express_interest(
            Interest::new(Name::from_uri("/gone")).with_lifetime_ms(500),
            move |_, _, _| on_data.record("data"),
            move |_, _| on_timeout.record("timeout"),
        )
        .unwrap();
    face.remove_pending_interest(id).unwrap();

    peer.send(signed_data(Data::new(Name::from_uri("/gone"))).wire_encode().unwrap())
        .unwrap();
    for _ in 0..10 {
        clock.advance(100);
        face.drive_once().unwrap();
    }
    assert!(events.all().is_empty());
    assert_eq!(face.pending_interest_count(), 0);
}

#[test]
fn first_expressed_interest_wins() {
    let (mut face, mut peer, _clock) = face_with_peer();
    let events = Events::default();
    for label in ["first", "second"] {
        let on_data = events.clone();
        face.express_interest(
            Interest::new(Name::from_uri("/same")),
            move |_, _, _| on_data.record(label),
            |_, _| {},
        )
        .unwrap();
    }

    let reply = signed_data(Data::new(Name::from_uri("/same/1"))).wire_encode().unwrap();
    peer.send(reply).unwrap();
    face.drive_once().unwrap();
    assert_eq!(events.all(), vec!["first"]);
    assert_eq!(face.pending_interest_count(), 1);
}

#[test]
fn callbacks_can_express_more_interests() {
    let (mut face, mut peer, _clock) = face_with_peer();
    let events = Events::default();
    let on_data = events.clone();
    face.express_interest(
        Interest::new(Name::from_uri("/segment/0")),
        move |face, _, _| {
            on_data.record("segment 0");
            face.express_interest(Interest::new(Name::from_uri("/segment/1")), |_, _, _| {}, |_, _| {})
                .unwrap();
        },
        |_, _| {},
    )
    .unwrap();
    assert_eq!(interests_from(&mut peer).len(), 1);

    peer.send(signed_data(Data::new(Name::from_uri("/segment/0"))).wire_encode().unwrap())
        .unwrap();
    face.drive_once().unwrap();

    let follow_up = interests_from(&mut peer);
    assert_eq!(follow_up.len(), 1);
    assert_eq!(follow_up[0].name, Name::from_uri("/segment/1"));
    assert_eq!(face.pending_interest_count(), 1);
    assert_eq!(events.all(), vec!["segment 0"]);
}

#[test]
fn lost_connection_is_reported_once_and_deadlines_still_fire() {
    let (mut face, peer, clock) = face_with_peer();
    let events = Events::default();
    let on_timeout = events.clone();
    face.express_interest(
        Interest::new(Name::from_uri("/a")).with_lifetime_ms(500),
        |_, _, _| {},
        move |_, _| on_timeout.record("timeout"),
    )
    .unwrap();

    drop(peer);
    assert!(matches!(
        face.drive_once(),
        Err(FaceError::Transport(TransportError::Disconnected))
    ));
    assert!(!face.drive_once().unwrap());

    clock.advance(500);
    assert!(face.drive_once().unwrap());
    assert_eq!(events.all(), vec!["timeout"]);

    let result = face.express_interest(Interest::new(Name::from_uri("/b")), |_, _, _| {}, |_, _| {});
    assert!(matches!(
        result,
        Err(FaceError::Transport(TransportError::Disconnected))
    ));
}

#[test]
fn registered_prefix_receives_interests_and_answers() {
    let clock = test_clock();
    let mut forwarder = TestForwarder::new();
    let mut producer = forwarder.connect_face(&clock);
    let mut consumer = forwarder.connect_face(&clock);
    let events = Events::default();

    let dispatched_to = Rc::new(Cell::new(None::<RegistrationId>));
    let dispatched = Rc::clone(&dispatched_to);
    let failed = events.clone();
    let registration = producer
        .register_prefix(
            Name::from_uri("/unittest"),
            move |face, prefix, interest, id| {
                assert_eq!(prefix, &Name::from_uri("/unittest"));
                dispatched.set(Some(id));
                let data = signed_data(Data::new(interest.name.clone()).with_content("hello"));
                face.put_data(&data).unwrap();
            },
            move |_, _| failed.record("register failed"),
        )
        .unwrap();
    settle(&mut forwarder, &mut [&mut producer, &mut consumer]);
    assert_eq!(
        producer.registration_state(registration),
        Some(RegistrationState::Registered)
    );

    let (on_data, on_timeout) = (events.clone(), events.clone());
    consumer
        .express_interest(
            Interest::new(Name::from_uri("/unittest/hello")),
            move |_, _, data| {
                assert_eq!(data.name, Name::from_uri("/unittest/hello"));
                assert_eq!(data.content, Blob::from("hello"));
                on_data.record("data");
            },
            move |_, _| on_timeout.record("timeout"),
        )
        .unwrap();
    settle(&mut forwarder, &mut [&mut producer, &mut consumer]);

    assert_eq!(dispatched_to.get(), Some(registration));
    assert_eq!(events.all(), vec!["data"]);
}

#[test]
fn interests_go_to_the_longest_registered_prefix() {
    let clock = test_clock();
    let mut forwarder = TestForwarder::new();
    let mut producer = forwarder.connect_face(&clock);
    let events = Events::default();
    for prefix in ["/a", "/a/b"] {
        let on_interest = events.clone();
        producer
            .register_prefix(
                Name::from_uri(prefix),
                move |_, _, _, _| on_interest.record(prefix),
                |_, _| {},
            )
            .unwrap();
    }
    settle(&mut forwarder, &mut [&mut producer]);

    let mut consumer = forwarder.connect_face(&clock);
    for name in ["/a/b/c", "/a/x"] {
        consumer
            .express_interest(Interest::new(Name::from_uri(name)), |_, _, _| {}, |_, _| {})
            .unwrap();
    }
    settle(&mut forwarder, &mut [&mut producer, &mut consumer]);
    assert_eq!(events.all(), vec!["/a/b", "/a"]);
}

#[test]
fn command_timestamps_strictly_increase_on_a_stopped_clock() {
    let clock = test_clock();
    let mut forwarder = TestForwarder::new();
    let mut face = forwarder.connect_face(&clock);
    for i in 0..5 {
        face.register_prefix(Name::from_uri(&format!("/p/{i}")), |_, _, _, _| {}, |_, _| {})
            .unwrap();
    }
    settle(&mut forwarder, &mut [&mut face]);

    let timestamps = &forwarder.command_timestamps;
    assert_eq!(timestamps.len(), 5);
    assert!(timestamps.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(timestamps[0], clock.current().ms_since_1970);
}

#[test]
fn refused_registration_fails_and_is_removed() {
    let clock = test_clock();
    let mut forwarder = TestForwarder::new();
    forwarder.mode = RegisterMode::Reject(403);
    let mut face = forwarder.connect_face(&clock);
    let events = Events::default();
    let failed = events.clone();
    let id = face
        .register_prefix(
            Name::from_uri("/refused"),
            |_, _, _, _| {},
            move |_, prefix| {
                assert_eq!(prefix, &Name::from_uri("/refused"));
                failed.record("failed");
            },
        )
        .unwrap();
    settle(&mut forwarder, &mut [&mut face]);
    assert_eq!(events.all(), vec!["failed"]);
    assert_eq!(face.registration_state(id), None);
}

#[test]
fn unanswered_registration_times_out() {
    let clock = test_clock();
    let mut forwarder = TestForwarder::new();
    forwarder.mode = RegisterMode::Ignore;
    let mut face = forwarder.connect_face(&clock);
    let events = Events::default();
    let failed = events.clone();
    let id = face
        .register_prefix(
            Name::from_uri("/quiet"),
            |_, _, _, _| {},
            move |_, _| failed.record("failed"),
        )
        .unwrap();
    settle(&mut forwarder, &mut [&mut face]);
    assert!(events.all().is_empty());

    clock.advance(face.config().command_interest_lifetime_ms);
    face.drive_once().unwrap();
    face.drive_once().unwrap();
    assert_eq!(events.all(), vec!["failed"]);
    assert_eq!(face.registration_state(id), None);
}

#[test]
fn removing_a_pending_registration_cancels_it_locally() {
    let clock = test_clock();
    let mut forwarder = TestForwarder::new();
    let mut producer = forwarder.connect_face(&clock);
    let events = Events::default();
    let (on_interest, failed) = (events.clone(), events.clone());
    let id = producer
        .register_prefix(
            Name::from_uri("/cancelled"),
            move |_, _, _, _| on_interest.record("interest"),
            move |_, _| failed.record("failed"),
        )
        .unwrap();
    producer.remove_registered_prefix(id).unwrap();
    assert_eq!(producer.pending_interest_count(), 0);

    // The forwarder still accepts the command and routes to the producer
    let mut consumer = forwarder.connect_face(&clock);
    let timed_out = events.clone();
    consumer
        .express_interest(
            Interest::new(Name::from_uri("/cancelled/x")).with_lifetime_ms(100),
            |_, _, _| {},
            move |_, _| timed_out.record("timeout"),
        )
        .unwrap();
    settle(&mut forwarder, &mut [&mut producer, &mut consumer]);
    clock.advance(100);
    settle(&mut forwarder, &mut [&mut producer, &mut consumer]);

    assert_eq!(events.all(), vec!["timeout"]);
    assert_eq!(producer.registration_state(id), None);
}

#[test]
fn digest_policy_checks_registration_responses() {
    let (mut face, mut peer, _clock) = face_with_peer();
    face.set_policy_manager(Sha256DigestPolicyManager);
    let events = Events::default();

    let mut ids = Vec::new();
    for prefix in ["/good", "/tampered"] {
        let failed = events.clone();
        let id = face
            .register_prefix(Name::from_uri(prefix), |_, _, _, _| {}, move |_, _| {
                failed.record(prefix)
            })
            .unwrap();
        ids.push(id);
    }

    let commands = interests_from(&mut peer);
    assert_eq!(commands.len(), 2);
    for (i, command) in commands.iter().enumerate() {
        let content = ControlResponse::new(STATUS_OK, "OK").wire_encode();
        let mut data = signed_data(Data::new(command.name.clone()).with_content(content));
        if i == 1 {
            data.content = Blob::from(ControlResponse::new(STATUS_OK, "Ok").wire_encode());
        }
        peer.send(data.wire_encode().unwrap()).unwrap();
    }
    face.drive_once().unwrap();
    face.drive_once().unwrap();

    assert_eq!(face.registration_state(ids[0]), Some(RegistrationState::Registered));
    assert_eq!(face.registration_state(ids[1]), None);
    assert_eq!(events.all(), vec!["/tampered"]);
}

// Trusts Data only after fetching `/cert`, which it trusts as is.
struct CertificatePolicy;

impl PolicyManager for CertificatePolicy {
    fn skip_verify_and_trust(&self, _data: &Data) -> bool {
        false
    }

    fn require_verify(&self, _data: &Data) -> bool {
        true
    }

    fn check_verification_policy(
        &self,
        face: &mut Face,
        data: &Data,
        step_count: u32,
        on_verified: OnVerified,
        on_verify_failed: OnVerifyFailed,
    ) -> Option<ValidationRequest> {
        if step_count > 0 {
            if data.name == Name::from_uri("/cert") {
                on_verified(face, data.clone());
            } else {
                on_verify_failed(face, data.clone());
            }
            return None;
        }
        let (verified, failed) = (data.clone(), data.clone());
        Some(ValidationRequest {
            interest: Interest::new(Name::from_uri("/cert")).with_lifetime_ms(100),
            on_verified: Box::new(move |face: &mut Face, _certificate: Data| {
                on_verified(face, verified)
            }),
            on_verify_failed: Box::new(move |face: &mut Face, _: Data| on_verify_failed(face, failed)),
            retry: 1,
            step_count: step_count + 1,
        })
    }

    fn check_signing_policy(&self, _data_name: &Name, _certificate_name: &Name) -> bool {
        true
    }

    fn infer_signing_identity(&self, _data_name: &Name) -> Name {
        Name::new()
    }
}

#[test]
fn policy_fetches_certificate_before_verifying() {
    let (mut face, mut peer, _clock) = face_with_peer();
    face.set_policy_manager(CertificatePolicy);
    let events = Events::default();
    let (verified, failed) = (events.clone(), events.clone());
    face.verify_data(
        Data::new(Name::from_uri("/signed/thing")),
        move |_, data| {
            assert_eq!(data.name, Name::from_uri("/signed/thing"));
            verified.record("verified");
        },
        move |_, _| failed.record("failed"),
    )
    .unwrap();
    assert!(events.all().is_empty());

    let fetches = interests_from(&mut peer);
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].name, Name::from_uri("/cert"));
    peer.send(signed_data(Data::new(Name::from_uri("/cert"))).wire_encode().unwrap())
        .unwrap();
    face.drive_once().unwrap();
    assert_eq!(events.all(), vec!["verified"]);
}

#[test]
fn certificate_fetch_retries_then_fails_with_original_data() {
    let (mut face, mut peer, clock) = face_with_peer();
    face.set_policy_manager(CertificatePolicy);
    let events = Events::default();
    let (verified, failed) = (events.clone(), events.clone());
    face.verify_data(
        Data::new(Name::from_uri("/signed/thing")),
        move |_, _| verified.record("verified"),
        move |_, data| {
            assert_eq!(data.name, Name::from_uri("/signed/thing"));
            failed.record("failed");
        },
    )
    .unwrap();

    for _ in 0..5 {
        clock.advance(100);
        face.drive_once().unwrap();
    }
    let fetches = interests_from(&mut peer);
    assert_eq!(fetches.len(), 2);
    assert_ne!(fetches[0].nonce, fetches[1].nonce);
    assert_eq!(events.all(), vec!["failed"]);
    assert_eq!(face.pending_interest_count(), 0);
}

#[test]
fn oversized_data_is_refused() {
    let (mut face, mut peer, _clock) = face_with_peer();
    let data = Data::new(Name::from_uri("/big")).with_content(vec![0u8; 9000]);
    assert!(matches!(face.put_data(&data), Err(FaceError::Encoding(_))));
    assert!(matches!(face.send(vec![0u8; 9000]), Err(FaceError::Encoding(_))));
    assert_eq!(peer.poll().unwrap(), None);
}

#[test]
fn shutdown_drops_everything_silently() {
    let clock = test_clock();
    let mut forwarder = TestForwarder::new();
    let mut face = forwarder.connect_face(&clock);
    let events = Events::default();
    let (on_timeout, failed) = (events.clone(), events.clone());
    face.express_interest(
        Interest::new(Name::from_uri("/a")).with_lifetime_ms(10),
        |_, _, _| {},
        move |_, _| on_timeout.record("timeout"),
    )
    .unwrap();
    let id = face
        .register_prefix(Name::from_uri("/p"), |_, _, _, _| {}, move |_, _| {
            failed.record("failed")
        })
        .unwrap();

    face.shutdown();
    clock.advance(10_000);
    assert!(matches!(face.drive_once(), Err(FaceError::EngineClosed)));
    assert!(matches!(
        face.remove_registered_prefix(id),
        Err(FaceError::EngineClosed)
    ));
    assert!(events.all().is_empty());
    assert_eq!(face.pending_interest_count(), 0);
}

#[test]
fn malformed_registration_response_fails_the_registration() {
    let (mut face, mut peer, _clock) = face_with_peer();
    let events = Events::default();
    let failed = events.clone();
    let id = face
        .register_prefix(
            Name::from_uri("/garbled"),
            |_, _, _, _| {},
            move |_, prefix| {
                assert_eq!(prefix, &Name::from_uri("/garbled"));
                failed.record("failed")
            },
        )
        .unwrap();

    let commands = interests_from(&mut peer);
    assert_eq!(commands.len(), 1);
    let reply = Data::new(commands[0].name.clone()).with_content(b"SUCCESS".as_slice());
    peer.send(signed_data(reply).wire_encode().unwrap()).unwrap();

    face.drive_once().unwrap();
    assert_eq!(events.all(), vec!["failed"]);
    assert_eq!(face.registration_state(id), None);
    assert_eq!(face.pending_interest_count(), 0);
}

#[test]
fn unusable_frames_are_dropped_and_the_face_keeps_working() {
    let (mut face, mut peer, _clock) = face_with_peer();
    let events = Events::default();
    let on_data = events.clone();
    face.express_interest(
        Interest::new(Name::from_uri("/after")),
        move |_, _, _| on_data.record("data"),
        |_, _| {},
    )
    .unwrap();

    // A TLV of a type no packet has, then an Interest whose value does not parse
    peer.send(vec![100, 1, 0]).unwrap();
    peer.send(vec![5, 2, 0xff, 0xff]).unwrap();
    peer.send(signed_data(Data::new(Name::from_uri("/after"))).wire_encode().unwrap())
        .unwrap();

    for _ in 0..3 {
        assert!(face.drive_once().unwrap());
    }
    assert!(!face.drive_once().unwrap());
    assert_eq!(events.all(), vec!["data"]);
    assert!(!face.is_closed());
}

#[test]
fn interests_expiring_together_time_out_in_expression_order() {
    let (mut face, _silent_peer, clock) = face_with_peer();
    let events = Events::default();
    for (name, lifetime_ms) in [("/first", 300), ("/second", 100), ("/third", 200)] {
        let on_timeout = events.clone();
        face.express_interest(
            Interest::new(Name::from_uri(name)).with_lifetime_ms(lifetime_ms),
            |_, _, _| {},
            move |_, interest| on_timeout.record(interest.name.to_uri()),
        )
        .unwrap();
    }

    clock.advance(300);
    assert!(face.drive_once().unwrap());
    assert_eq!(events.all(), vec!["/first", "/second", "/third"]);
}

#[test]
fn raised_packet_size_applies_to_both_directions() {
    let clock = test_clock();
    let config = FaceConfig::default().with_max_packet_size(20_000);
    let (ours, theirs) = local_link::<65536>();
    let mut consumer = Face::with_channel(ours, clock.clone(), config.clone());
    let mut producer = Face::with_channel(theirs, clock.clone(), config);

    let events = Events::default();
    let on_data = events.clone();
    consumer
        .express_interest(
            Interest::new(Name::from_uri("/big")),
            move |_, _, data| {
                assert_eq!(data.content.as_slice().len(), 10_000);
                on_data.record("data");
            },
            |_, _| {},
        )
        .unwrap();
    // No registration on the producer, the Interest is just consumed
    producer.drive_once().unwrap();

    let data = Data::new(Name::from_uri("/big")).with_content(vec![7u8; 10_000]);
    producer.put_data(&signed_data(data)).unwrap();
    assert!(consumer.drive_once().unwrap());
    assert_eq!(events.all(), vec!["data"]);
}

#[cfg(unix)]
mod datagrams {
    use std::os::unix::net::UnixDatagram;

    use reto_face::platform::unix::unix_datagram_channel;

    use super::*;

    // Each garbage datagram is followed by a valid answer to a pending Interest
    fn answer_after(garbage: &[u8]) {
        let clock = test_clock();
        let (ours, theirs) = UnixDatagram::pair().unwrap();
        let channel = unix_datagram_channel(ours).unwrap();
        let mut face = Face::with_channel(channel, clock, FaceConfig::default());
        let events = Events::default();
        let on_data = events.clone();
        face.express_interest(
            Interest::new(Name::from_uri("/a")),
            move |_, _, _| on_data.record("data"),
            |_, _| {},
        )
        .unwrap();

        theirs.send(garbage).unwrap();
        let reply = signed_data(Data::new(Name::from_uri("/a"))).wire_encode().unwrap();
        theirs.send(&reply).unwrap();

        for _ in 0..5 {
            face.drive_once().unwrap();
        }
        assert_eq!(events.all(), vec!["data"]);
        // Still connected
        assert!(face.socket_id().is_some());
    }

    #[test]
    fn garbage_datagram_is_not_fatal() {
        answer_after(&[0, 1, 2]);
    }

    #[test]
    fn truncated_datagram_does_not_swallow_the_next() {
        answer_after(&[6, 100, 7, 0]);
    }
}

#[cfg(feature = "poller")]
mod sockets {
    use std::{
        net::TcpListener,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    use reto_face::platform::{
        tcp::{tcp_channel, TcpConnector},
        EventPump, MonotonicClock,
    };

    use super::*;

    // Runs a forwarder on its own thread until told to stop, returning how
    // many commands it saw.
    fn serve(accept: impl FnOnce() -> Channel + Send + 'static) -> (Arc<AtomicBool>, thread::JoinHandle<usize>) {
        let stop = Arc::new(AtomicBool::new(false));
        let stopping = Arc::clone(&stop);
        let server = thread::spawn(move || {
            let mut forwarder = TestForwarder::new();
            forwarder.add_channel(accept());
            while !stopping.load(Ordering::Relaxed) {
                if !forwarder.step() {
                    thread::sleep(Duration::from_millis(1));
                }
            }
            forwarder.command_timestamps.len()
        });
        (stop, server)
    }

    fn register_and_wait(mut face: Face) -> bool {
        let id = face
            .register_prefix(Name::from_uri("/unittest"), |_, _, _, _| {}, |_, _| {
                panic!("registration failed")
            })
            .unwrap();
        let mut pump = EventPump::new().unwrap();
        pump.run_until(&mut face, Duration::from_secs(5), |face| {
            face.registration_state(id) == Some(RegistrationState::Registered)
        })
        .unwrap()
    }

    #[test]
    fn registration_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (stop, server) = serve(move || {
            let (stream, _) = listener.accept().unwrap();
            tcp_channel(stream).unwrap()
        });

        let face = Face::with_config(
            TcpConnector::new("127.0.0.1", port),
            MonotonicClock::new(),
            FaceConfig::default(),
        );
        let registered = register_and_wait(face);
        stop.store(true, Ordering::Relaxed);
        assert_eq!(server.join().unwrap(), 1);
        assert!(registered);
    }

    #[cfg(unix)]
    #[test]
    fn registration_over_unix_socket() {
        use std::os::unix::net::UnixListener;

        use reto_face::platform::unix::{unix_stream_channel, UnixConnector};

        let path = std::env::temp_dir().join(format!("reto-face-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();
        let (stop, server) = serve(move || {
            let (stream, _) = listener.accept().unwrap();
            unix_stream_channel(stream).unwrap()
        });

        let registered = register_and_wait(Face::new(UnixConnector::new(&path), MonotonicClock::new()));
        stop.store(true, Ordering::Relaxed);
        assert_eq!(server.join().unwrap(), 1);
        let _ = std::fs::remove_file(&path);
        assert!(registered);
    }
}
