//! End-to-end scenarios S1-S6.

use std::sync::{Arc, Mutex, Once};

use aln_router::packet::{make_service_packet, Packet};
use aln_router::testutil::{LoopbackChannel, NullSelector};
use aln_router::{Channel, Handler, Router, RouterConfig};

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

fn recording_handler() -> (Handler, Arc<Mutex<Vec<Packet>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_for_handler = seen.clone();
    let handler: Handler = Arc::new(move |packet: Packet| {
        seen_for_handler.lock().expect("recording mutex poisoned").push(packet);
    });
    (handler, seen)
}

/// S1: two directly connected nodes discover each other's self-route.
#[test]
fn s1_two_node_discovery() {
    let a = router(1);
    let b = router(2);
    let (ch_a, ch_b) = LoopbackChannel::pair();

    a.add_channel(ch_a, &NullSelector);
    b.add_channel(ch_b, &NullSelector);

    assert_eq!(a.debug_route(2), Some((2, 1)));
    assert_eq!(b.debug_route(1), Some((1, 1)));
}

/// S2: a three-node chain relays the far node's route with an
/// incremented cost.
#[test]
fn s2_three_node_relay() {
    let a = router(1);
    let b = router(2);
    let c = router(3);

    let (ch_ab_a, ch_ab_b) = LoopbackChannel::pair();
    a.add_channel(ch_ab_a, &NullSelector);
    b.add_channel(ch_ab_b, &NullSelector);

    let (ch_bc_b, ch_bc_c) = LoopbackChannel::pair();
    b.add_channel(ch_bc_b, &NullSelector);
    c.add_channel(ch_bc_c, &NullSelector);

    assert_eq!(a.debug_route(3), Some((2, 2)));
}

/// S3: a service advertised by two providers is routed to the
/// lower-load one.
#[test]
fn s3_service_selection_by_load() {
    let a = router(1);
    let b = router(2);
    let c = router(3);

    let (handler_b, _) = recording_handler();
    b.register_service(42, handler_b);
    let (handler_c, _) = recording_handler();
    c.register_service(42, handler_c);

    let (ch_a_b, ch_b_a) = LoopbackChannel::pair();
    a.add_channel(ch_a_b.clone(), &NullSelector);
    b.add_channel(ch_b_a.clone(), &NullSelector);

    let (ch_a_c, ch_c_a) = LoopbackChannel::pair();
    a.add_channel(ch_a_c.clone(), &NullSelector);
    c.add_channel(ch_c_a.clone(), &NullSelector);

    // export_services always reports a locally registered service at
    // load 0 (measuring real load is left as a hook); inject the loads
    // this scenario needs directly, as B and C would over the wire.
    ch_b_a.send(&make_service_packet(2, 2, 42, 5)).expect("advertise B's load");
    ch_c_a.send(&make_service_packet(3, 3, 42, 2)).expect("advertise C's load");

    let result = a.send(Packet { service_id: 42, data: b"ping".to_vec(), ..Default::default() });
    assert!(result.is_ok());

    let forwarded = ch_a_c.sent();
    let data_packet =
        forwarded.iter().find(|p| !p.is_netstate()).expect("a data packet was forwarded to C");
    assert_eq!(data_packet.dest_addr, 3);
    assert_eq!(data_packet.next_addr, 3);
    assert_eq!(data_packet.src_addr, 1);

    assert!(ch_a_b.sent().iter().all(|p| p.is_netstate()), "nothing but control traffic went to B");
}

/// S4: a queued packet is flushed once its service becomes reachable,
/// and the queue entry is removed.
#[test]
fn s4_queue_then_flush() {
    let a = router(1);
    let b = router(2);
    let c = router(3);

    let (ch_ab_a, ch_ab_b) = LoopbackChannel::pair();
    a.add_channel(ch_ab_a.clone(), &NullSelector);
    b.add_channel(ch_ab_b.clone(), &NullSelector);

    let (ch_bc_b, ch_bc_c) = LoopbackChannel::pair();
    b.add_channel(ch_bc_b, &NullSelector);
    c.add_channel(ch_bc_c, &NullSelector);

    assert_eq!(a.debug_route(3), Some((2, 2)));

    let result = a.send(Packet { service_id: 99, data: b"ping".to_vec(), ..Default::default() });
    assert_eq!(result, Err(aln_router::RouterError::ServiceUnavailable { service_id: 99 }));
    assert!(a.debug_service_queued(99));

    // Simulate C's service advertisement arriving at A via B, as if B had
    // relayed it, by injecting the wire packet on B's side of the A-B link.
    let advertisement = make_service_packet(3, 3, 99, 2);
    ch_ab_b.send(&advertisement).expect("inject NET_SERVICE");

    assert!(!a.debug_service_queued(99));
    let flushed = ch_ab_a
        .sent()
        .into_iter()
        .find(|p| !p.is_netstate() && p.service_id == 99)
        .expect("queued packet was flushed");
    assert_eq!(flushed.dest_addr, 3);
    assert_eq!(flushed.next_addr, 2);
}

/// S5: a locally registered service is delivered without touching any
/// channel.
#[test]
fn s5_local_service_shortcut() {
    let a = router(1);
    let (handler, seen) = recording_handler();
    a.register_service(7, handler);

    let result = a.send(Packet { service_id: 7, data: b"hello".to_vec(), ..Default::default() });
    assert!(result.is_ok());

    let seen = seen.lock().expect("recording mutex poisoned");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].dest_addr, 1);
}

/// S6: a registered context handler fires exactly once.
#[test]
fn s6_context_handler_fires_once() {
    let a = router(1);
    let (handler, seen) = recording_handler();
    let ctx = a.register_context_handler(handler);

    let result = a.send(Packet { dest_addr: 1, context_id: ctx, ..Default::default() });
    assert!(result.is_ok());

    let seen = seen.lock().expect("recording mutex poisoned");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].context_id, ctx);
}
