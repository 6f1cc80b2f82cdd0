use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use thiserror::Error;

/// Every control exchange moves fixed-size messages in both directions:
/// a type discriminator, a request block (sparse patch + presence bits),
/// a response block (one path record for PATH_STATUS replies), and a
/// trailing result code. Multi-byte fields are big-endian.
pub const MSG_SIZE: usize = 181;

const REQ_OFF: usize = 1;
const RESP_OFF: usize = 55;
const RET_OFF: usize = 177;

/// Result code meaning "one record enclosed, call again for more".
pub const RET_MORE: u32 = 11;

/// Interface names longer than this are rejected before anything is sent.
pub const IFNAME_MAX: usize = 15;
const IFNAME_WIRE: usize = 16;

// Presence bits for the request block; a zero field with its bit clear
// means "leave the daemon-side value alone".
const F_IFNAME: u16 = 1 << 0;
const F_STATE: u16 = 1 << 1;
const F_RATE_TX: u16 = 1 << 2;
const F_RATE_RX: u16 = 1 << 3;
const F_RATE_MODE: u16 = 1 << 4;
const F_BEAT: u16 = 1 << 5;
const F_PREFERRED: u16 = 1 << 6;
const F_LOSS_LIMIT: u16 = 1 << 7;
const F_RTT_LIMIT: u16 = 1 << 8;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("unknown message type {0:#04x}")]
    UnknownType(u8),
    #[error("response type {got} does not match request type {sent}")]
    TypeMismatch { sent: MsgType, got: MsgType },
    #[error("unknown path state {0}")]
    UnknownState(u8),
    #[error("unknown address family {0}")]
    UnknownFamily(u8),
    #[error("record attached to a non-status reply")]
    UnexpectedRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    State = 1,
    PathStatus = 2,
}

impl TryFrom<u8> for MsgType {
    type Error = WireError;
    fn try_from(v: u8) -> Result<Self, WireError> {
        match v {
            1 => Ok(MsgType::State),
            2 => Ok(MsgType::PathStatus),
            other => Err(WireError::UnknownType(other)),
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MsgType::State => "STATE",
            MsgType::PathStatus => "PATH_STATUS",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PathState {
    /// Unset; doubles as the filter wildcard.
    #[default]
    Empty = 0,
    Up = 1,
    Backup = 2,
    Down = 3,
}

impl TryFrom<u8> for PathState {
    type Error = WireError;
    fn try_from(v: u8) -> Result<Self, WireError> {
        match v {
            0 => Ok(PathState::Empty),
            1 => Ok(PathState::Up),
            2 => Ok(PathState::Backup),
            3 => Ok(PathState::Down),
            other => Err(WireError::UnknownState(other)),
        }
    }
}

impl fmt::Display for PathState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PathState::Empty => "EMPTY",
            PathState::Up => "UP",
            PathState::Backup => "BACKUP",
            PathState::Down => "DOWN",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RateMode {
    Auto = 1,
    Fixed = 2,
}

impl fmt::Display for RateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RateMode::Auto => "auto",
            RateMode::Fixed => "fixed",
        })
    }
}

/// Sparse patch: only fields the caller set are marked present on the wire,
/// so an explicit zero never clobbers daemon-side state by accident.
#[derive(Debug, Clone, Default)]
pub struct PathPatch {
    pub ifname: Option<String>,
    pub state: Option<PathState>,
    pub rate_tx: Option<u64>,
    pub rate_rx: Option<u64>,
    pub rate_mode: Option<RateMode>,
    /// Keep-alive probe interval, wire time units (microseconds).
    pub beat: Option<u64>,
    pub preferred: Option<bool>,
    /// Already translated to the 0-255 wire scale.
    pub loss_limit: Option<u8>,
    /// Wire time units (microseconds).
    pub rtt_limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub rate: u64,
    pub loss: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConf {
    pub fixed_rate: bool,
    pub preferred: bool,
    pub loss_limit: u8,
    pub rtt_limit: u64,
    pub beat: u64,
}

/// One tracked route as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRecord {
    pub ifname: String,
    pub remote: Option<SocketAddr>,
    pub state: PathState,
    pub ok: bool,
    pub mtu: u16,
    /// Smoothed round-trip time, microseconds.
    pub rtt: u64,
    pub rttvar: u64,
    pub conf: PathConf,
    pub tx: Counters,
    pub rx: Counters,
}

/// Outbound side of one exchange: discriminator plus request payload.
#[derive(Debug, Clone)]
pub struct ControlRequest {
    pub kind: MsgType,
    pub patch: PathPatch,
}

impl ControlRequest {
    pub fn status(ifname: Option<String>, state: PathState) -> Self {
        let patch = PathPatch {
            ifname,
            state: (state != PathState::Empty).then_some(state),
            ..PathPatch::default()
        };
        ControlRequest { kind: MsgType::PathStatus, patch }
    }

    pub fn state(patch: PathPatch) -> Self {
        ControlRequest { kind: MsgType::State, patch }
    }

    pub fn encode(&self) -> [u8; MSG_SIZE] {
        let mut buf = [0u8; MSG_SIZE];
        buf[0] = self.kind as u8;
        let p = &self.patch;

        let mut flags = 0u16;
        let mut flag = |set: bool, bit: u16| {
            if set {
                flags |= bit;
            }
        };
        flag(p.ifname.is_some(), F_IFNAME);
        flag(p.state.is_some(), F_STATE);
        flag(p.rate_tx.is_some(), F_RATE_TX);
        flag(p.rate_rx.is_some(), F_RATE_RX);
        flag(p.rate_mode.is_some(), F_RATE_MODE);
        flag(p.beat.is_some(), F_BEAT);
        flag(p.preferred.is_some(), F_PREFERRED);
        flag(p.loss_limit.is_some(), F_LOSS_LIMIT);
        flag(p.rtt_limit.is_some(), F_RTT_LIMIT);

        let mut w = Wr::new(&mut buf, REQ_OFF);
        w.put_u16(flags);
        w.put_name(p.ifname.as_deref().unwrap_or(""));
        w.put_u8(p.state.unwrap_or_default() as u8);
        w.put_u64(p.rate_tx.unwrap_or(0));
        w.put_u64(p.rate_rx.unwrap_or(0));
        w.put_u8(p.rate_mode.map_or(0, |m| m as u8));
        w.put_u64(p.beat.unwrap_or(0));
        w.put_u8(u8::from(p.preferred.unwrap_or(false)));
        w.put_u8(p.loss_limit.unwrap_or(0));
        w.put_u64(p.rtt_limit.unwrap_or(0));
        debug_assert_eq!(w.at, RESP_OFF);
        buf
    }
}

/// Inbound side of one exchange, already split out of the shared result
/// channel: either a record with more to follow, a clean end, or a
/// daemon-side error code.
#[derive(Debug, Clone)]
pub enum Reply {
    Continue(PathRecord),
    Done,
    Failed(u32),
}

/// Decode one received envelope, enforcing that its type matches the
/// request that prompted it.
pub fn decode_reply(buf: &[u8; MSG_SIZE], sent: MsgType) -> Result<Reply, WireError> {
    let got = MsgType::try_from(buf[0])?;
    if got != sent {
        return Err(WireError::TypeMismatch { sent, got });
    }
    let ret = u32::from_be_bytes(buf[RET_OFF..RET_OFF + 4].try_into().unwrap());
    match ret {
        0 => Ok(Reply::Done),
        RET_MORE => {
            if sent != MsgType::PathStatus {
                return Err(WireError::UnexpectedRecord);
            }
            let mut r = Rd::new(buf, RESP_OFF);
            let rec = decode_record(&mut r)?;
            debug_assert_eq!(r.at, RET_OFF);
            Ok(Reply::Continue(rec))
        }
        code => Ok(Reply::Failed(code)),
    }
}

fn decode_record(r: &mut Rd) -> Result<PathRecord, WireError> {
    let ifname = r.get_name();
    let family = r.get_u8();
    let raw: [u8; 16] = r.get_bytes(16).try_into().unwrap();
    let port = r.get_u16();
    let remote = match family {
        0 => None,
        4 => Some(SocketAddr::from((Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]), port))),
        6 => Some(SocketAddr::from((Ipv6Addr::from(raw), port))),
        other => return Err(WireError::UnknownFamily(other)),
    };
    let state = PathState::try_from(r.get_u8())?;
    let ok = r.get_u8() != 0;
    let mtu = r.get_u16();
    let rtt = r.get_u64();
    let rttvar = r.get_u64();
    let conf = PathConf {
        fixed_rate: r.get_u8() != 0,
        preferred: r.get_u8() != 0,
        loss_limit: r.get_u8(),
        rtt_limit: r.get_u64(),
        beat: r.get_u64(),
    };
    let mut counters = || Counters {
        rate: r.get_u64(),
        loss: r.get_u64(),
        total: r.get_u64(),
    };
    let tx = counters();
    let rx = counters();
    Ok(PathRecord { ifname, remote, state, ok, mtu, rtt, rttvar, conf, tx, rx })
}

struct Wr<'a> {
    buf: &'a mut [u8; MSG_SIZE],
    at: usize,
}

impl<'a> Wr<'a> {
    fn new(buf: &'a mut [u8; MSG_SIZE], at: usize) -> Self {
        Wr { buf, at }
    }
    fn put_u8(&mut self, v: u8) {
        self.buf[self.at] = v;
        self.at += 1;
    }
    fn put_u16(&mut self, v: u16) {
        self.buf[self.at..self.at + 2].copy_from_slice(&v.to_be_bytes());
        self.at += 2;
    }
    fn put_u64(&mut self, v: u64) {
        self.buf[self.at..self.at + 8].copy_from_slice(&v.to_be_bytes());
        self.at += 8;
    }
    /// NUL-padded fixed-width name slot; callers validate length first.
    fn put_name(&mut self, name: &str) {
        let b = name.as_bytes();
        let n = b.len().min(IFNAME_MAX);
        self.buf[self.at..self.at + n].copy_from_slice(&b[..n]);
        self.at += IFNAME_WIRE;
    }
}

struct Rd<'a> {
    buf: &'a [u8; MSG_SIZE],
    at: usize,
}

impl<'a> Rd<'a> {
    fn new(buf: &'a [u8; MSG_SIZE], at: usize) -> Self {
        Rd { buf, at }
    }
    fn get_u8(&mut self) -> u8 {
        let v = self.buf[self.at];
        self.at += 1;
        v
    }
    fn get_u16(&mut self) -> u16 {
        let v = u16::from_be_bytes(self.buf[self.at..self.at + 2].try_into().unwrap());
        self.at += 2;
        v
    }
    fn get_u64(&mut self) -> u64 {
        let v = u64::from_be_bytes(self.buf[self.at..self.at + 8].try_into().unwrap());
        self.at += 8;
        v
    }
    fn get_bytes(&mut self, n: usize) -> &'a [u8] {
        let v = &self.buf[self.at..self.at + n];
        self.at += n;
        v
    }
    fn get_name(&mut self) -> String {
        let raw = self.get_bytes(IFNAME_WIRE);
        let end = raw.iter().position(|&b| b == 0).unwrap_or(IFNAME_WIRE);
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }
}

/// Daemon-side encoder, used by the simulated daemons in tests.
#[cfg(test)]
pub(crate) fn encode_reply(kind: MsgType, reply: &Reply) -> [u8; MSG_SIZE] {
    let mut buf = [0u8; MSG_SIZE];
    buf[0] = kind as u8;
    let ret = match reply {
        Reply::Done => 0,
        Reply::Failed(code) => *code,
        Reply::Continue(rec) => {
            let mut w = Wr::new(&mut buf, RESP_OFF);
            w.put_name(&rec.ifname);
            match rec.remote {
                None => {
                    w.put_u8(0);
                    w.at += 16;
                    w.put_u16(0);
                }
                Some(SocketAddr::V4(a)) => {
                    w.put_u8(4);
                    let o = w.at;
                    w.buf[o..o + 4].copy_from_slice(&a.ip().octets());
                    w.at += 16;
                    w.put_u16(a.port());
                }
                Some(SocketAddr::V6(a)) => {
                    w.put_u8(6);
                    let o = w.at;
                    w.buf[o..o + 16].copy_from_slice(&a.ip().octets());
                    w.at += 16;
                    w.put_u16(a.port());
                }
            }
            w.put_u8(rec.state as u8);
            w.put_u8(u8::from(rec.ok));
            w.put_u16(rec.mtu);
            w.put_u64(rec.rtt);
            w.put_u64(rec.rttvar);
            w.put_u8(u8::from(rec.conf.fixed_rate));
            w.put_u8(u8::from(rec.conf.preferred));
            w.put_u8(rec.conf.loss_limit);
            w.put_u64(rec.conf.rtt_limit);
            w.put_u64(rec.conf.beat);
            for c in [rec.tx, rec.rx] {
                w.put_u64(c.rate);
                w.put_u64(c.loss);
                w.put_u64(c.total);
            }
            RET_MORE
        }
    };
    buf[RET_OFF..RET_OFF + 4].copy_from_slice(&ret.to_be_bytes());
    buf
}

/// Canned record for the simulated daemons in tests.
#[cfg(test)]
pub(crate) fn sample_record(ifname: &str, state: PathState) -> PathRecord {
    PathRecord {
        ifname: ifname.to_string(),
        remote: Some("192.0.2.10:5000".parse().unwrap()),
        state,
        ok: true,
        mtu: 1450,
        rtt: 12_345,
        rttvar: 1_234,
        conf: PathConf {
            fixed_rate: false,
            preferred: false,
            loss_limit: 127,
            rtt_limit: 200_000,
            beat: 1_000_000,
        },
        tx: Counters { rate: 125_000, loss: 1, total: 4_242 },
        rx: Counters { rate: 250_000, loss: 0, total: 8_484 },
    }
}
