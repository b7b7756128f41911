//! OSD_OP / OSD_OPREPLY wire codec.
//!
//! All integers are little-endian. Nested structures use Ceph's
//! ENCODE_START/DECODE_START framing: a 1-byte version, a 1-byte compat
//! version, a 4-byte length, with the cursor forced to the declared end on
//! decode to tolerate forward-compatible extensions.

use crate::error::{OsdsError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const BLOCK_SIZE: usize = 1 << 16;
pub const MAX_OPS: usize = 16;
pub const MAX_SNAPS: usize = 1024;
pub const REPLY_WIRE_VERSION: u32 = 7;

pub const CEPH_MSG_OSD_OP: u16 = 42;
pub const CEPH_MSG_OSD_OPREPLY: u16 = 43;

/// Acktype bits (§ glossary).
pub const ACK: u64 = 1;
pub const ONDISK: u64 = 2;
pub const ONNVRAM: u64 = 4;

/// Per-op flag carried in `raw_op.flags`; non-transient failures of an op
/// with this bit set do not abort the request.
pub const FAILOK: u32 = 1 << 0;

pub const EOPNOTSUPP: i32 = -95;
pub const ENOENT: i32 = -2;
pub const ENOMEM: i32 = -12;
pub const EAGAIN: i32 = -11;
pub const EINPROGRESS: i32 = -115;

/// Read a ENCODE_START-framed region and hand the caller a sub-cursor
/// limited to the declared length; forces the outer cursor past the frame
/// regardless of how much the callback consumed.
fn decode_framed<B: Buf, T>(
    buf: &mut B,
    what: &'static str,
    f: impl FnOnce(&mut bytes::buf::Take<&mut B>, u8, u8) -> Result<T>,
) -> Result<T> {
    if buf.remaining() < 6 {
        return Err(OsdsError::BufferShort(what.into()));
    }
    let version = buf.get_u8();
    let compat = buf.get_u8();
    let len = buf.get_u32_le() as usize;
    if buf.remaining() < len {
        return Err(OsdsError::Malformed(format!(
            "{what}: declared length {len} exceeds remaining {}",
            buf.remaining()
        )));
    }
    let mut inner = buf.take(len);
    // `inner` is capped to exactly `len`, and `buf` was already checked to
    // hold at least `len` bytes, so any shortage the callback hits against
    // `inner` is the frame's declared length running out under it, not the
    // underlying buffer running dry: that is the overshoot the DECODE_START
    // contract calls out, and it must surface as `Malformed`, not
    // `BufferShort`.
    let result = f(&mut inner, version, compat).map_err(|e| match e {
        OsdsError::BufferShort(msg) => {
            OsdsError::Malformed(format!("{what}: struct overshot declared length: {msg}"))
        }
        other => other,
    })?;
    let leftover = inner.remaining();
    // DECODE_FINISH: skip whatever the callback didn't consume.
    inner.advance(leftover);
    Ok(result)
}

fn need(buf: &impl Buf, n: usize, what: &'static str) -> Result<()> {
    if buf.remaining() < n {
        return Err(OsdsError::BufferShort(what.into()));
    }
    Ok(())
}

fn get_string<B: Buf>(buf: &mut B, what: &'static str) -> Result<String> {
    need(buf, 4, what)?;
    let len = buf.get_u32_le() as usize;
    need(buf, len, what)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw).map_err(|e| OsdsError::Malformed(format!("{what}: {e}")))
}

fn put_string<B: BufMut>(buf: &mut B, s: &str) {
    buf.put_u32_le(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

/// `spgid_t`: a placement-group id with an erasure-coded shard suffix. The
/// core only ever looks at `pool`, `seed`, and `shard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpgId {
    pub pool: u64,
    pub seed: u32,
    pub shard: u8,
}

impl SpgId {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        decode_framed(buf, "pgid", |inner, _version, _compat| {
            need(inner, 8 + 4 + 4, "pgid")?;
            let pool = inner.get_u64_le();
            let seed = inner.get_u32_le();
            let _preferred = inner.get_i32_le();
            Ok((pool, seed))
        })
        .and_then(|(pool, seed)| {
            need(buf, 1, "spgid.shard")?;
            Ok(SpgId {
                pool,
                seed,
                shard: buf.get_u8(),
            })
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(1); // version
        buf.put_u8(1); // compat
        buf.put_u32_le(16); // pool(8) + seed(4) + preferred(4)
        buf.put_u64_le(self.pool);
        buf.put_u32_le(self.seed);
        buf.put_i32_le(-1);
        buf.put_u8(self.shard);
    }
}

/// `object_locator_t`, reduced to the pool/namespace pair the core cares
/// about; `key` is carried through but otherwise unused here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectLocator {
    pub pool: i64,
    pub key: String,
    pub nspace: String,
}

impl ObjectLocator {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        decode_framed(buf, "oloc", |inner, version, _compat| {
            need(inner, 8, "oloc.pool")?;
            let pool = inner.get_i64_le();
            if version >= 2 {
                need(inner, 4, "oloc.preferred")?;
                let _preferred = inner.get_i32_le();
            }
            let key = if version >= 3 {
                get_string(inner, "oloc.key")?
            } else {
                String::new()
            };
            let nspace = if version >= 5 {
                get_string(inner, "oloc.nspace")?
            } else {
                String::new()
            };
            if version >= 6 {
                need(inner, 8, "oloc.hash")?;
                let _hash = inner.get_i64_le();
            }
            Ok(ObjectLocator { pool, key, nspace })
        })
    }
}

/// One sub-operation's on-wire discriminated payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtentOp {
    pub offset: u64,
    pub length: u64,
    pub truncate_size: u64,
    pub truncate_seq: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallOp {
    pub class_len: u8,
    pub method_len: u8,
    pub indata_len: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchOp {
    pub cookie: u64,
    pub ver: u64,
    pub op: u8,
    pub gen: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotifyOp {
    pub cookie: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllocHintOp {
    pub expected_object_size: u64,
    pub expected_write_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XattrOp {
    pub name_len: u32,
    pub value_len: u32,
    pub cmp_op: u8,
    pub cmp_mode: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyFromOp {
    pub snapid: u64,
    pub src_version: u64,
    pub flags: u32,
    pub src_fadvise_flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatOp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpPayload {
    Extent(ExtentOp),
    Call(CallOp),
    Watch(WatchOp),
    Notify(NotifyOp),
    AllocHint(AllocHintOp),
    Xattr(XattrOp),
    CopyFrom(CopyFromOp),
    Stat(StatOp),
}

/// Opcodes the decoder recognizes. Only READ/WRITE/STAT get real handlers;
/// everything else decodes tolerantly and is rejected at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OpCode {
    Read = 0x1201,
    Stat = 0x1202,
    Write = 0x2201,
    WriteFull = 0x2202,
    Truncate = 0x2203,
    Zero = 0x2204,
    Delete = 0x2205,
    Call = 0x2403,
    Watch = 0x2501,
    NotifyAck = 0x2503,
    Create = 0x220d,
    SetAllocHint = 0x2410,
    SetXattr = 0x2301,
    CmpXattr = 0x2302,
    Notify = 0x2504,
    CopyFrom2 = 0x2418,
    ListWatchers = 0x2505,
}

impl OpCode {
    fn from_u16(v: u16) -> Option<Self> {
        use OpCode::*;
        Some(match v {
            0x1201 => Read,
            0x1202 => Stat,
            0x2201 => Write,
            0x2202 => WriteFull,
            0x2203 => Truncate,
            0x2204 => Zero,
            0x2205 => Delete,
            0x2403 => Call,
            0x2501 => Watch,
            0x2503 => NotifyAck,
            0x220d => Create,
            0x2410 => SetAllocHint,
            0x2301 => SetXattr,
            0x2302 => CmpXattr,
            0x2504 => Notify,
            0x2418 => CopyFrom2,
            0x2505 => ListWatchers,
            _ => return None,
        })
    }

    pub fn is_extent(self) -> bool {
        matches!(
            self,
            OpCode::Read | OpCode::Write | OpCode::WriteFull | OpCode::Truncate | OpCode::Zero
        )
    }
}

/// One decoded sub-op plus the reply-side bookkeeping the dispatcher fills
/// in (`rval`, `outdata`).
#[derive(Debug, Clone)]
pub struct SubOp {
    pub op: OpCode,
    pub flags: u32,
    pub payload: OpPayload,
    pub indata_len: u32,
    pub rval: i32,
    pub outdata: Bytes,
}

const RAW_OP_SCRATCH: usize = 64;

impl SubOp {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        need(buf, 2 + 4 + 4, "raw_op header")?;
        let op_raw = buf.get_u16_le();
        let flags = buf.get_u32_le();
        let payload_len = buf.get_u32_le();
        need(buf, RAW_OP_SCRATCH, "raw_op scratch")?;
        let mut scratch = [0u8; RAW_OP_SCRATCH];
        buf.copy_to_slice(&mut scratch);
        let mut s = &scratch[..];

        let op = OpCode::from_u16(op_raw).ok_or(OsdsError::Malformed(format!(
            "unknown opcode {op_raw:#06x}"
        )))?;

        let payload = match op {
            OpCode::Read | OpCode::Write | OpCode::WriteFull | OpCode::Truncate | OpCode::Zero => {
                OpPayload::Extent(ExtentOp {
                    offset: s.get_u64_le(),
                    length: s.get_u64_le(),
                    truncate_size: s.get_u64_le(),
                    truncate_seq: s.get_u32_le(),
                })
            }
            OpCode::Call => OpPayload::Call(CallOp {
                class_len: s.get_u8(),
                method_len: s.get_u8(),
                indata_len: { s.advance(2); s.get_u32_le() },
            }),
            OpCode::Watch => OpPayload::Watch(WatchOp {
                cookie: s.get_u64_le(),
                ver: s.get_u64_le(),
                op: s.get_u8(),
                gen: { s.advance(3); s.get_u32_le() },
            }),
            OpCode::Notify => OpPayload::Notify(NotifyOp {
                cookie: s.get_u64_le(),
            }),
            OpCode::SetAllocHint => OpPayload::AllocHint(AllocHintOp {
                expected_object_size: s.get_u64_le(),
                expected_write_size: s.get_u64_le(),
            }),
            OpCode::SetXattr | OpCode::CmpXattr => OpPayload::Xattr(XattrOp {
                name_len: s.get_u32_le(),
                value_len: s.get_u32_le(),
                cmp_op: s.get_u8(),
                cmp_mode: s.get_u8(),
            }),
            OpCode::CopyFrom2 => OpPayload::CopyFrom(CopyFromOp {
                snapid: s.get_u64_le(),
                src_version: s.get_u64_le(),
                flags: s.get_u32_le(),
                src_fadvise_flags: s.get_u32_le(),
            }),
            OpCode::Stat
            | OpCode::NotifyAck
            | OpCode::ListWatchers
            | OpCode::Create
            | OpCode::Delete => OpPayload::Stat(StatOp),
        };

        Ok(SubOp {
            op,
            flags,
            payload,
            indata_len: payload_len,
            rval: 0,
            outdata: Bytes::new(),
        })
    }

    /// Encode the 32-byte reply scratch (2+4+2+... per op, opcode-specific
    /// layout mirrors the request's `raw_op` scratch, truncated to what the
    /// reply actually needs to echo back).
    fn encode_reply_scratch<B: BufMut>(&self, buf: &mut B) {
        let mut scratch = [0u8; 32];
        {
            let mut s = &mut scratch[..];
            match &self.payload {
                OpPayload::Extent(e) => {
                    s.put_u64_le(e.offset);
                    s.put_u64_le(e.length);
                    s.put_u64_le(e.truncate_size);
                    s.put_u32_le(e.truncate_seq);
                }
                OpPayload::Call(c) => {
                    s.put_u8(c.class_len);
                    s.put_u8(c.method_len);
                    s.put_u16_le(0);
                    s.put_u32_le(c.indata_len);
                }
                OpPayload::Watch(w) => {
                    s.put_u64_le(w.cookie);
                    s.put_u64_le(w.ver);
                    s.put_u8(w.op);
                    s.put_u8(0);
                    s.put_u16_le(0);
                    s.put_u32_le(w.gen);
                }
                OpPayload::Notify(n) => {
                    s.put_u64_le(n.cookie);
                }
                OpPayload::AllocHint(a) => {
                    s.put_u64_le(a.expected_object_size);
                    s.put_u64_le(a.expected_write_size);
                }
                OpPayload::Xattr(x) => {
                    s.put_u32_le(x.name_len);
                    s.put_u32_le(x.value_len);
                    s.put_u8(x.cmp_op);
                    s.put_u8(x.cmp_mode);
                }
                OpPayload::CopyFrom(c) => {
                    s.put_u64_le(c.snapid);
                    s.put_u64_le(c.src_version);
                    s.put_u32_le(c.flags);
                    s.put_u32_le(c.src_fadvise_flags);
                }
                OpPayload::Stat(_) => {}
            }
        }
        buf.put_slice(&scratch);
    }
}

/// Decoded in-memory form of an OSD_OP request (§3).
#[derive(Debug, Clone)]
pub struct OsdOpRequest {
    pub tid: u64,
    pub spgid: SpgId,
    pub hash: u32,
    pub epoch: u32,
    pub flags: u32,
    pub client_inc: u32,
    pub mtime_sec: u32,
    pub mtime_nsec: u32,
    pub oloc: ObjectLocator,
    pub oid_name: String,
    pub ops: Vec<SubOp>,
    pub snapid: u64,
    pub snap_seq: u64,
    pub snaps: Vec<u64>,
    pub attempts: u32,
    pub features: u64,
}

impl OsdOpRequest {
    /// Decode a front buffer per the ordered field list; `tid` comes from
    /// the message header, not the buffer itself.
    pub fn decode(tid: u64, front: &mut Bytes) -> Result<Self> {
        let buf = front;
        let spgid = SpgId::decode(buf)?;

        need(buf, 4, "hoid.hash")?;
        let hash = buf.get_u32_le();

        need(buf, 4, "epoch")?;
        let epoch = buf.get_u32_le();

        need(buf, 4, "flags")?;
        let flags = buf.get_u32_le();

        // reqid: framed, contents unused by the core.
        decode_framed(buf, "reqid", |_inner, _v, _c| Ok(()))?;

        // blkin_trace_info: fixed-size, skipped.
        const BLKIN_TRACE_INFO_SIZE: usize = 24;
        need(buf, BLKIN_TRACE_INFO_SIZE, "blkin_trace_info")?;
        buf.advance(BLKIN_TRACE_INFO_SIZE);

        need(buf, 4, "client_inc")?;
        let client_inc = buf.get_u32_le();

        need(buf, 8, "mtime")?;
        let mtime_sec = buf.get_u32_le();
        let mtime_nsec = buf.get_u32_le();

        let oloc = ObjectLocator::decode(buf)?;

        let oid_name = get_string(buf, "oid.name")?;

        need(buf, 2, "num_ops")?;
        let num_ops = buf.get_u16_le() as usize;
        if num_ops > MAX_OPS {
            return Err(OsdsError::Malformed(format!(
                "num_ops {num_ops} exceeds MAX_OPS {MAX_OPS}"
            )));
        }
        let mut ops = Vec::with_capacity(num_ops);
        for _ in 0..num_ops {
            ops.push(SubOp::decode(buf)?);
        }

        need(buf, 8, "snapid")?;
        let snapid = buf.get_u64_le();

        need(buf, 8, "snap_seq")?;
        let snap_seq = buf.get_u64_le();

        need(buf, 4, "num_snaps")?;
        let num_snaps = buf.get_u32_le() as usize;
        if num_snaps > MAX_SNAPS {
            return Err(OsdsError::Malformed(format!(
                "num_snaps {num_snaps} exceeds MAX_SNAPS {MAX_SNAPS}"
            )));
        }
        need(buf, num_snaps * 8, "snaps")?;
        let mut snaps = Vec::with_capacity(num_snaps);
        for _ in 0..num_snaps {
            snaps.push(buf.get_u64_le());
        }

        need(buf, 4, "attempts")?;
        let attempts = buf.get_u32_le();

        need(buf, 8, "features")?;
        let features = buf.get_u64_le();

        Ok(OsdOpRequest {
            tid,
            spgid,
            hash,
            epoch,
            flags,
            client_inc,
            mtime_sec,
            mtime_nsec,
            oloc,
            oid_name,
            ops,
            snapid,
            snap_seq,
            snaps,
            attempts,
            features,
        })
    }

    /// The hobject this request addresses: pool from `spgid`, hash as
    /// decoded, key null, namespace from the parsed locator.
    pub fn hoid(&self) -> denc::HObject {
        denc::HObject {
            key: String::new(),
            oid: self.oid_name.clone(),
            snapid: self.snapid,
            hash: self.hash,
            max: false,
            nspace: self.oloc.nspace.clone(),
            pool: self.spgid.pool,
        }
    }
}

/// Reply assembled by the dispatcher, ready for wire encoding.
pub struct OsdOpReply {
    pub tid: u64,
    pub oid_name: String,
    pub pgid: SpgId,
    pub flags: u64,
    pub result: i32,
    pub epoch: u32,
    pub ops: Vec<SubOp>,
    pub attempts: u32,
}

/// Encode the reply's `pgid` field: version(1) + pool(8) + seed(4) +
/// preferred(4), 17 bytes total. Unlike the request's `spgid`, the reply
/// carries a plain `pg_t` with no compat byte, length prefix, or shard.
fn encode_reply_pgid<B: BufMut>(buf: &mut B, spgid: &SpgId) {
    buf.put_u8(1); // version
    buf.put_u64_le(spgid.pool);
    buf.put_u32_le(spgid.seed);
    buf.put_i32_le(-1); // preferred, deprecated
}

impl OsdOpReply {
    /// Encode the reply front buffer and return it together with the
    /// concatenated data chain, op by op, per §4.1's reply layout.
    pub fn encode(&self) -> (Bytes, Bytes) {
        let mut front = BytesMut::new();

        put_string(&mut front, &self.oid_name);

        encode_reply_pgid(&mut front, &self.pgid);

        front.put_u64_le(self.flags);
        front.put_i32_le(self.result);
        front.put_slice(&[0u8; 12]); // bad_replay_version
        front.put_u32_le(self.epoch);
        front.put_u32_le(self.ops.len() as u32);
        for op in &self.ops {
            op.encode_reply_scratch(&mut front);
        }
        front.put_u32_le(self.attempts);
        for op in &self.ops {
            front.put_i32_le(op.rval);
        }
        front.put_slice(&[0u8; 12]); // replay_version
        front.put_u64_le(0); // user_version
        front.put_u8(0); // do_redirect

        let mut data = BytesMut::new();
        for op in &self.ops {
            data.put_slice(&op.outdata);
        }

        (front.freeze(), data.freeze())
    }

    /// Sum of every op's `outdata_len`, used as the outbound message
    /// header's `data_len`.
    pub fn data_len(&self) -> u32 {
        self.ops.iter().map(|o| o.outdata.len() as u32).sum()
    }
}
