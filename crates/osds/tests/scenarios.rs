//! End-to-end scenarios S1-S6 (§8), exercised directly against `Store` and
//! the dispatcher: the dispatcher is a pure function of `Store` +
//! `OsdOpRequest`, so no socket or messenger is needed to drive it.

use bytes::Bytes;
use osds::ops::{dispatch, ConnectionOptions};
use osds::store::Store;
use osds::wire::{
    ExtentOp, OpCode, OpPayload, ObjectLocator, OsdOpRequest, SpgId, StatOp, SubOp, FAILOK,
};

fn request(ops: Vec<SubOp>, mtime_sec: u32) -> OsdOpRequest {
    OsdOpRequest {
        tid: 1,
        spgid: SpgId {
            pool: 1,
            seed: 0,
            shard: 0,
        },
        hash: 1,
        epoch: 1,
        flags: 0,
        client_inc: 1,
        mtime_sec,
        mtime_nsec: 0,
        oloc: ObjectLocator::default(),
        oid_name: "scenario-obj".to_string(),
        ops,
        snapid: denc::SNAP_HEAD,
        snap_seq: 0,
        snaps: vec![],
        attempts: 1,
        features: 0,
    }
}

fn extent_op(opcode: OpCode, offset: u64, length: u64, flags: u32) -> SubOp {
    SubOp {
        op: opcode,
        flags,
        payload: OpPayload::Extent(ExtentOp {
            offset,
            length,
            truncate_size: 0,
            truncate_seq: 0,
        }),
        indata_len: length as u32,
        rval: 0,
        outdata: Bytes::new(),
    }
}

fn stat_op(flags: u32) -> SubOp {
    SubOp {
        op: OpCode::Stat,
        flags,
        payload: OpPayload::Stat(StatOp),
        indata_len: 0,
        rval: 0,
        outdata: Bytes::new(),
    }
}

/// S1: empty-write is a no-op.
#[test]
fn s1_empty_write_is_noop() {
    let mut store = Store::new();
    let req = request(vec![extent_op(OpCode::Write, 1000, 0, 0)], 1);
    let reply = dispatch(&mut store, req, Bytes::new(), ConnectionOptions::default());

    assert_eq!(reply.result, 0);
    assert_eq!(reply.ops[0].rval, 0);
    assert_eq!(reply.data_len(), 0);
    assert_eq!(store.object_count(), 0);
}

/// S2: aligned write then full read, then STAT matches.
#[test]
fn s2_aligned_write_then_full_read() {
    let mut store = Store::new();
    let pattern = vec![0xA5u8; 4096];

    let write = request(vec![extent_op(OpCode::Write, 0, 4096, 0)], 555);
    let reply = dispatch(
        &mut store,
        write,
        Bytes::from(pattern.clone()),
        ConnectionOptions::default(),
    );
    assert_eq!(reply.result, 0);

    let read = request(vec![extent_op(OpCode::Read, 0, 4096, 0)], 555);
    let reply = dispatch(&mut store, read, Bytes::new(), ConnectionOptions::default());
    assert_eq!(reply.result, 0);
    assert_eq!(reply.ops[0].outdata.as_ref(), pattern.as_slice());

    let stat = request(vec![stat_op(0)], 555);
    let reply = dispatch(&mut store, stat, Bytes::new(), ConnectionOptions::default());
    let out = &reply.ops[0].outdata;
    let size = u64::from_le_bytes(out[0..8].try_into().unwrap());
    let sec = u32::from_le_bytes(out[8..12].try_into().unwrap());
    assert_eq!(size, 4096);
    assert_eq!(sec, 555);
}

/// S3: sparse read across a hole between two written blocks.
#[test]
fn s3_sparse_read_across_a_hole() {
    let mut store = Store::new();

    let write_a = request(vec![extent_op(OpCode::Write, 0, 1024, 0)], 1);
    dispatch(
        &mut store,
        write_a,
        Bytes::from(vec![0x11u8; 1024]),
        ConnectionOptions::default(),
    );

    let write_b = request(vec![extent_op(OpCode::Write, 131072, 1024, 0)], 1);
    dispatch(
        &mut store,
        write_b,
        Bytes::from(vec![0x22u8; 1024]),
        ConnectionOptions::default(),
    );

    let read = request(vec![extent_op(OpCode::Read, 0, 132096, 0)], 1);
    let reply = dispatch(&mut store, read, Bytes::new(), ConnectionOptions::default());
    let out = &reply.ops[0].outdata;

    assert_eq!(out.len(), 132096);
    assert!(out[0..1024].iter().all(|&b| b == 0x11));
    assert!(out[1024..131072].iter().all(|&b| b == 0));
    assert!(out[131072..132096].iter().all(|&b| b == 0x22));
}

/// S4: read past EOF truncates rather than zero-padding to the requested length.
#[test]
fn s4_read_past_eof_truncates() {
    let mut store = Store::new();
    let write = request(vec![extent_op(OpCode::Write, 0, 1000, 0)], 1);
    dispatch(
        &mut store,
        write,
        Bytes::from(vec![0x7Eu8; 1000]),
        ConnectionOptions::default(),
    );

    let read = request(vec![extent_op(OpCode::Read, 500, 1000, 0)], 1);
    let reply = dispatch(&mut store, read, Bytes::new(), ConnectionOptions::default());
    assert_eq!(reply.ops[0].outdata.len(), 500);
}

/// S5: STAT on a never-written object fails with ENOENT, no data segment.
#[test]
fn s5_stat_on_missing_object() {
    let mut store = Store::new();
    let req = request(vec![stat_op(0)], 1);
    let reply = dispatch(&mut store, req, Bytes::new(), ConnectionOptions::default());

    assert_eq!(reply.result, -2); // -ENOENT
    assert_eq!(reply.ops[0].rval, -2);
    assert_eq!(reply.data_len(), 0);
}

/// S6: FAILOK short-circuit, a failing STAT with FAILOK does not abort the
/// request, and the trailing WRITE/READ pair still runs and round-trips.
#[test]
fn s6_failok_short_circuit() {
    let mut store = Store::new();
    let req = request(
        vec![
            stat_op(FAILOK),
            extent_op(OpCode::Write, 0, 100, 0),
            extent_op(OpCode::Read, 0, 100, 0),
        ],
        1,
    );
    let reply = dispatch(
        &mut store,
        req,
        Bytes::from(vec![0x9u8; 100]),
        ConnectionOptions::default(),
    );

    assert_eq!(reply.result, 0);
    assert_eq!(reply.ops[0].rval, -2); // -ENOENT, suppressed
    assert_eq!(reply.ops[1].rval, 0);
    assert_eq!(reply.ops[2].rval, 0);
    assert_eq!(reply.ops[2].outdata.as_ref(), [0x9u8; 100].as_slice());
}

/// Block alignment and size-monotonicity properties (§8.3, §8.4) across a
/// sequence of overlapping writes spanning several blocks.
#[test]
fn block_alignment_and_size_monotonicity() {
    let mut store = Store::new();
    const BLOCK_SIZE: u64 = 1 << 16;

    let offsets = [0u64, BLOCK_SIZE - 10, BLOCK_SIZE * 3 + 500];
    let mut expected_size = 0u64;
    for &offset in &offsets {
        let len = 4096u64;
        let req = request(vec![extent_op(OpCode::Write, offset, len, 0)], 1);
        let before = expected_size;
        dispatch(
            &mut store,
            req,
            Bytes::from(vec![0xFFu8; len as usize]),
            ConnectionOptions::default(),
        );
        expected_size = expected_size.max(offset + len);
        assert!(expected_size >= before);
    }

    let hoid = denc::HObject {
        key: String::new(),
        oid: "scenario-obj".to_string(),
        snapid: denc::SNAP_HEAD,
        hash: 1,
        max: false,
        nspace: String::new(),
        pool: 1,
    };
    let object = store.lookup_object(&hoid).unwrap();
    assert_eq!(object.size, expected_size);

    let mut seen = std::collections::HashSet::new();
    for (&offset, block) in object.blocks.iter() {
        assert_eq!(offset % BLOCK_SIZE, 0);
        assert_eq!(block.offset, offset);
        assert!(seen.insert(offset), "duplicate block offset {offset}");
    }
}
