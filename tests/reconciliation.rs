//! End-to-end reconciliation scenarios against the in-memory `demos`
//! engine: no real socket, just the walker driving encoders directly
//! against `obuf` the way `provider::run_loop` would once connected.

#[path = "../demos/mod.rs"]
mod demos;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use fpm_dplane::{
    context::{
        DplaneContextBuilder, DplaneOp, LspInfo, LspNexthop, Nexthop, NexthopGroup, Prefix,
        RmacInfo,
    },
    consts::tlv::Srv6Action,
    engine::{EngineLsps, EngineNhgs, EngineRib, EngineRmacs, Locator, SentFlag},
    obuf::OutputBuffer,
    walker::{StepOutcome, Walker},
};

use demos::InMemoryEngine;

fn drive_to_done(walker: &mut Walker, engine: &mut InMemoryEngine, obuf: &OutputBuffer) -> Vec<fpm_dplane::event::Event> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut events = Vec::new();
    loop {
        match walker.step(engine, obuf) {
            StepOutcome::PhaseFinished(e) => events.push(e),
            StepOutcome::Suspended(_) => panic!("unexpected suspension with ample buffer capacity"),
            StepOutcome::Done => break,
        }
    }
    events
}

/// Scenario 1: empty engine tables still walk through all four phases and
/// send zero bytes.
#[test]
fn empty_tables_produce_zero_bytes_and_all_four_finished_events() {
    let mut engine = InMemoryEngine::default();
    let obuf = OutputBuffer::default();
    let mut walker = Walker::new();

    let events = drive_to_done(&mut walker, &mut engine, &obuf);

    assert_eq!(obuf.bytes(), 0);
    assert_eq!(
        events,
        vec![
            fpm_dplane::event::Event::LspFinished,
            fpm_dplane::event::Event::NhgFinished,
            fpm_dplane::event::Event::RibFinished,
            fpm_dplane::event::Event::RmacFinished,
        ]
    );
}

/// Scenario 2 (plain IPv4 route) plus one of each other table kind,
/// confirming every installed object is framed exactly once across a
/// full replay epoch.
#[test]
fn full_replay_epoch_frames_every_object_exactly_once() {
    let mut engine = InMemoryEngine::default();

    engine.lsps.install(LspInfo {
        in_label: 100,
        nexthops: vec![LspNexthop {
            out_label: Some(200),
            gateway: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2))),
            ifindex: 3,
        }],
    });

    let mut nhg = NexthopGroup::single(Nexthop::plain(
        Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))),
        3,
        "eth0",
    ));
    nhg.id = Some(7);
    engine.nhgs.install(nhg);

    let route_ctx = DplaneContextBuilder::default()
        .op(DplaneOp::RouteInstall)
        .prefix(Prefix::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 24))
        .nhg(NexthopGroup::single(Nexthop::plain(
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))),
            3,
            "eth0",
        )))
        .table_id(5u32)
        .vrf_id(5u32)
        .build()
        .unwrap();
    engine.rib.install(route_ctx);

    engine.rmacs.install(RmacInfo {
        vni: 5000,
        mac: [0x02, 0, 0, 0, 0, 1],
        vtep: IpAddr::V4(Ipv4Addr::new(198, 51, 100, 9)),
        ifindex: 12,
    });

    let obuf = OutputBuffer::default();
    let mut walker = Walker::new();
    drive_to_done(&mut walker, &mut engine, &obuf);

    // Every table entry's sent flag is now set.
    assert!(engine.lsps.iter_mut().all(|(h, _)| h.sent()));
    assert!(engine.nhgs.iter_mut().all(|(h, _)| h.sent()));
    assert!(engine.rib.iter_mut().all(|(h, _)| h.sent()));
    assert!(engine.rmacs.iter_mut().all(|(h, _)| h.sent()));

    let bytes_after_first_walk = obuf.bytes();
    assert!(bytes_after_first_walk > 0);

    // A second walker is a fresh reconciliation cycle: it clears every
    // table's sent flags as it enters each phase, so the same objects
    // replay again rather than being skipped as already sent.
    let mut second_walker = Walker::new();
    drive_to_done(&mut second_walker, &mut engine, &obuf);
    assert_eq!(obuf.bytes(), bytes_after_first_walk * 2);
}

/// Scenario 5: a full output buffer mid-RIB-walk suspends the walker
/// without losing already-sent entries, and resumes cleanly once drained.
#[test]
fn buffer_full_mid_rib_walk_suspends_and_resumes() {
    let mut engine = InMemoryEngine::default();
    for i in 0..20u8 {
        let ctx = DplaneContextBuilder::default()
            .op(DplaneOp::RouteInstall)
            .prefix(Prefix::new(IpAddr::V4(Ipv4Addr::new(10, 0, i, 0)), 24))
            .nhg(NexthopGroup::single(Nexthop::plain(
                Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))),
                3,
                "eth0",
            )))
            .table_id(5u32)
            .vrf_id(5u32)
            .build()
            .unwrap();
        engine.rib.install(ctx);
    }

    // Small enough that not every route fits in one pass.
    let obuf = OutputBuffer::new(256);
    let mut walker = Walker::new();

    // Walk through LSP and NHG phases (both empty, finish immediately).
    assert!(matches!(walker.step(&mut engine, &obuf), StepOutcome::PhaseFinished(_)));
    assert!(matches!(walker.step(&mut engine, &obuf), StepOutcome::PhaseFinished(_)));

    let mut suspensions = 0;
    loop {
        match walker.step(&mut engine, &obuf) {
            StepOutcome::Suspended(_) => {
                suspensions += 1;
                // Drain the buffer so the resumed walk has room again,
                // mirroring the socket writing bytes out between retries.
                obuf.consume(obuf.bytes() as usize);
            }
            StepOutcome::PhaseFinished(_) => continue,
            StepOutcome::Done => break,
        }
    }

    assert!(suspensions > 0, "expected at least one buffer-full suspension with 20 routes and a 256-byte buffer");
    assert!(engine.rib.iter_mut().all(|(h, _)| h.sent()));
}

/// Scenario 6: toggling `use_nhg` is orthogonal to the walker (the
/// provider loop gates nexthop-group encoding, not the walker), but the
/// RIB destinations themselves replay identically across a simulated
/// reconnect (second walker with sent flags reset).
#[test]
fn reconnect_replays_rib_after_reset() {
    let mut engine = InMemoryEngine::default();
    let ctx = DplaneContextBuilder::default()
        .op(DplaneOp::RouteInstall)
        .prefix(Prefix::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 24))
        .nhg(NexthopGroup::single(Nexthop::plain(
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))),
            3,
            "eth0",
        )))
        .table_id(5u32)
        .vrf_id(5u32)
        .build()
        .unwrap();
    engine.rib.install(ctx);

    let obuf = OutputBuffer::default();
    let mut walker = Walker::new();
    drive_to_done(&mut walker, &mut engine, &obuf);
    let first_epoch_bytes = obuf.bytes();

    // Simulate the peer closing and a fresh connection: obuf is drained
    // (`conn::Connection::teardown` clears it). A fresh `Walker` clears
    // every table's sent flags itself on phase entry, exactly as the
    // library path does on reconnect.
    obuf.clear();

    let mut second_walker = Walker::new();
    drive_to_done(&mut second_walker, &mut engine, &obuf);

    assert_eq!(obuf.bytes(), first_epoch_bytes);
}

/// SRv6 localsid replay through the walker: installs a RIB destination
/// with a `seg6local_action` and checks it frames as `RTM_NEWSRV6LOCALSID`
/// (1000), not a plain route.
#[test]
fn srv6_localsid_destination_replays_as_custom_command() {
    let mut engine = InMemoryEngine::default();
    engine.lookup.vrf_names.insert(100, "red".into());
    engine.lookup.locators.push((
        "fc00:0:1::".parse::<Ipv6Addr>().unwrap(),
        48,
        Locator {
            block_len: 32,
            node_len: 16,
            func_len: 16,
            arg_len: 0,
            is_usid: false,
        },
    ));

    let mut nh = Nexthop::plain(None, 0, "lo");
    nh.seg6local_action = Some(Srv6Action::EndDt4);
    let ctx = DplaneContextBuilder::default()
        .op(DplaneOp::RouteInstall)
        .prefix(Prefix::new(IpAddr::V6("fc00:0:1::".parse().unwrap()), 128))
        .nhg(NexthopGroup::single(nh))
        .table_id(100u32)
        .vrf_id(100u32)
        .build()
        .unwrap();
    engine.rib.install(ctx);

    let obuf = OutputBuffer::default();
    let mut walker = Walker::new();
    drive_to_done(&mut walker, &mut engine, &obuf);

    assert!(obuf.bytes() > 0);
}

/// An address change on `lo` re-marks only SRv6 RIB destinations unsent,
/// leaving plain routes alone.
#[test]
fn lo_address_change_resets_only_srv6_destinations() {
    let mut engine = InMemoryEngine::default();

    let plain_ctx = DplaneContextBuilder::default()
        .op(DplaneOp::RouteInstall)
        .prefix(Prefix::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 24))
        .nhg(NexthopGroup::single(Nexthop::plain(
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))),
            3,
            "eth0",
        )))
        .table_id(5u32)
        .vrf_id(5u32)
        .build()
        .unwrap();
    engine.rib.install(plain_ctx);

    let mut vpn_nh = Nexthop::plain(None, 4, "lo");
    vpn_nh.seg6_vpn_sid = Some("fc00::1".parse().unwrap());
    let vpn_ctx = DplaneContextBuilder::default()
        .op(DplaneOp::RouteInstall)
        .prefix(Prefix::new(IpAddr::V6("2001:db8::".parse().unwrap()), 64))
        .nhg(NexthopGroup::single(vpn_nh))
        .table_id(5u32)
        .vrf_id(5u32)
        .build()
        .unwrap();
    engine.rib.install(vpn_ctx);

    let obuf = OutputBuffer::default();
    let mut walker = Walker::new();
    drive_to_done(&mut walker, &mut engine, &obuf);
    assert!(engine.rib.iter_mut().all(|(h, _)| h.sent()));

    let addr_ctx = DplaneContextBuilder::default()
        .op(DplaneOp::AddrInstall)
        .ifname("lo".to_string())
        .build()
        .unwrap();
    assert!(addr_ctx.is_lo_address_change());
    fpm_dplane::walker::handle_lo_address_change(&mut engine, &addr_ctx);

    let sent_flags: Vec<bool> = engine.rib.iter_mut().map(|(h, _)| h.sent()).collect();
    // One plain route stays sent, one SRv6 VPN route got re-marked unsent.
    assert_eq!(sent_flags.iter().filter(|s| **s).count(), 1);
    assert_eq!(sent_flags.iter().filter(|s| !**s).count(), 1);
}

/// A `RouteUpdate` encodes to a DEL followed by an INSTALL; under a
/// buffer too small for both but large enough for one, neither message
/// should land on the wire.
#[test]
fn route_update_pair_frames_atomically_under_a_tight_buffer() {
    let ctx = DplaneContextBuilder::default()
        .op(DplaneOp::RouteUpdate {
            old_proto: 2,
            new_proto: 2,
        })
        .prefix(Prefix::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 24))
        .nhg(NexthopGroup::single(Nexthop::plain(
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))),
            3,
            "eth0",
        )))
        .table_id(5u32)
        .vrf_id(5u32)
        .build()
        .unwrap();

    let lookup = demos::Lookup::default();
    let msgs = fpm_dplane::encode::route::encode_route(&ctx, &lookup).unwrap();
    assert_eq!(msgs.len(), 2, "a route update encodes to a DEL followed by an INSTALL");
    let del_framed_len = 4 + msgs[0].len();
    let total_framed_len: usize = msgs.iter().map(|m| 4 + m.len()).sum();
    assert!(del_framed_len + 2 < total_framed_len);

    let mut engine = InMemoryEngine::default();
    engine.rib.install(ctx);
    let obuf = OutputBuffer::new(del_framed_len + 2);
    let mut walker = Walker::new();

    assert!(matches!(walker.step(&mut engine, &obuf), StepOutcome::PhaseFinished(_)));
    assert!(matches!(walker.step(&mut engine, &obuf), StepOutcome::PhaseFinished(_)));
    assert!(matches!(walker.step(&mut engine, &obuf), StepOutcome::Suspended(_)));

    assert_eq!(obuf.bytes(), 0, "a lone DEL must never land without its paired INSTALL");
    assert!(!engine.rib.iter_mut().next().unwrap().0.sent());
}
