//! Register dumps and their file format.

mod common;

use common::{MockTransport, Op};
use ms912x::snapshot::{self, RegisterSnapshot};
use ms912x::RegisterBus;

#[test]
fn constant_registers_dump_as_constant_bytes() {
    let mut bus = RegisterBus::new(MockTransport::constant(0x42));

    let snapshot = snapshot::dump_range(&mut bus, 0..=9, |_| {}).unwrap();

    assert_eq!(snapshot.as_bytes(), &[0x42; 10]);
    assert_eq!(snapshot.start(), 0);
}

#[test]
fn dump_reads_addresses_in_ascending_order() {
    let transport = MockTransport::with_registers(|addr, _| (addr >> 4) as u8);
    let mut bus = RegisterBus::new(transport.clone());

    let snapshot = snapshot::dump_range(&mut bus, 0xc610..=0xc623, |_| {}).unwrap();

    let reads: Vec<Op> = (0xc610..=0xc623).map(Op::Read).collect();
    assert_eq!(transport.ops(), reads);
    assert_eq!(snapshot.len(), 0x14);
    assert_eq!(snapshot.get(0xc620), Some(0x62));
}

#[test]
fn full_dump_covers_register_space() {
    let transport = MockTransport::with_registers(|addr, _| (addr ^ (addr >> 8)) as u8);
    let mut bus = RegisterBus::new(transport.clone());

    let snapshot = snapshot::dump(&mut bus).unwrap();

    assert_eq!(snapshot.len(), 65536);
    assert_eq!(transport.transfer_count(), 2 * 65536);
    assert_eq!(snapshot.get(0xffff), Some(0x00));
    assert_eq!(snapshot.get(0x1234), Some(0x26));
}

#[test]
fn dump_fails_fast() {
    let transport = MockTransport::constant(1);
    transport.fail_at(7);
    let mut bus = RegisterBus::new(transport.clone());

    assert!(snapshot::dump_range(&mut bus, 0..=99, |_| {}).is_err());
    assert_eq!(transport.transfer_count(), 8);
}

#[test]
fn raw_file_round_trip_and_diff() {
    let dir = tempfile::tempdir().unwrap();
    let path_a = dir.path().join("800x600-60.bin");
    let path_b = dir.path().join("1920x1080-60.bin");

    let mut before = vec![0u8; 256];
    before[0x10] = 0x42;
    let mut after = before.clone();
    after[0x10] = 0x81;
    after[0xff] = 0x01;

    RegisterSnapshot::new(0, before).write_to(&path_a).unwrap();
    RegisterSnapshot::new(0, after).write_to(&path_b).unwrap();

    let a = RegisterSnapshot::load(&path_a).unwrap();
    let b = RegisterSnapshot::load(&path_b).unwrap();
    assert_eq!(std::fs::read(&path_a).unwrap().len(), 256);

    let changes: Vec<(u16, u8, u8)> = a
        .diff(&b)
        .into_iter()
        .map(|c| (c.address, c.before, c.after))
        .collect();
    assert_eq!(changes, vec![(0x10, 0x42, 0x81), (0xff, 0x00, 0x01)]);
}

#[test]
fn oversized_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.bin");
    std::fs::write(&path, vec![0u8; 65537]).unwrap();

    assert!(RegisterSnapshot::load(&path).is_err());
}
