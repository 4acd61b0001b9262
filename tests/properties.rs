//! Router-wide invariants not already covered by colocated unit tests in
//! `src/node.rs` / `src/service.rs` / `src/packet.rs`.

use std::sync::{Arc, Once};

use aln_router::packet::make_route_packet;
use aln_router::testutil::{LoopbackChannel, NullSelector};
use aln_router::{Channel, Handler, Packet, Router, RouterConfig};

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .is_test(true)
            .try_init();
    });
}

fn router(addr: u16) -> Arc<Router> {
    setup();
    Router::new(RouterConfig::new(addr))
}

/// Invariant 1: attaching a channel writes exactly one NET_QUERY to it.
#[test]
fn attach_sends_exactly_one_net_query() {
    let a = router(1);
    let (ch_a, ch_peer) = LoopbackChannel::pair();
    // ch_peer is left unattached to any router, so nothing answers and
    // no further traffic accumulates on ch_a beyond the initial query.
    let _ = &ch_peer;

    a.add_channel(ch_a.clone(), &NullSelector);

    assert_eq!(ch_a.sent_count(), 1);
    assert!(ch_a.sent()[0].is_netstate());
}

/// Invariant 2: a locally registered service always wins dispatch, even
/// when a remote provider reports a lower load.
#[test]
fn local_service_always_wins_over_remote_load() {
    let a = router(1);
    let fired = Arc::new(std::sync::Mutex::new(false));
    let fired_for_handler = fired.clone();
    let handler: Handler = Arc::new(move |_packet| {
        *fired_for_handler.lock().expect("mutex poisoned") = true;
    });
    a.register_service(42, handler);

    let (ch_a, ch_peer) = LoopbackChannel::pair();
    a.add_channel(ch_a.clone(), &NullSelector);

    // A remote provider reports load 0, strictly lower than anything a
    // local hook could ever report (always 0 too, per export_services,
    // but ties don't matter here: local must win unconditionally).
    ch_peer.send(&aln_router::packet::make_service_packet(9, 9, 42, 0)).expect("advertise");

    let result = a.send(Packet { service_id: 42, data: b"x".to_vec(), ..Default::default() });
    assert!(result.is_ok());
    assert!(*fired.lock().expect("mutex poisoned"));
    // Dispatch must not have forwarded anything to the remote provider.
    assert!(ch_a.sent().iter().all(|p| p.is_netstate()));
}

/// Invariant 4: a relayed route advertisement never echoes back out the
/// channel it arrived on (split horizon).
#[test]
fn relay_never_echoes_on_arrival_channel() {
    let b = router(2);

    let (ch_x, ch_x_peer) = LoopbackChannel::pair();
    b.add_channel(ch_x.clone(), &NullSelector);
    let (ch_y, ch_y_peer) = LoopbackChannel::pair();
    b.add_channel(ch_y.clone(), &NullSelector);
    let _ = (&ch_x_peer, &ch_y_peer);

    let baseline_x = ch_x.sent_count();

    // Simulate a NET_ROUTE advertisement for a brand-new destination
    // arriving on the X link, as if its peer had sent it.
    let advertisement = make_route_packet(5, 9, 1);
    ch_x_peer.send(&advertisement).expect("inject NET_ROUTE");

    assert_eq!(b.debug_route(9), Some((5, 2)));
    assert_eq!(ch_x.sent_count(), baseline_x, "relay must not echo on the arrival channel");
    assert!(ch_y
        .sent()
        .iter()
        .any(|p| p.net_state == aln_router::packet::NetState::NetRoute && p.src_addr == 2));
}

/// Invariant 7: context ids are distinct and release is idempotent.
#[test]
fn context_ids_are_distinct_and_release_is_idempotent() {
    let a = router(1);
    let handler: Handler = Arc::new(|_packet| {});

    let first = a.register_context_handler(handler.clone());
    let second = a.register_context_handler(handler.clone());
    assert_ne!(first, second);

    a.release_context(first);
    a.release_context(first); // idempotent: releasing twice is a no-op

    let result = a.send(Packet { dest_addr: 1, context_id: first, ..Default::default() });
    assert_eq!(result, Err(aln_router::RouterError::HandlerMissing));
}
