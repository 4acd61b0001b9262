//! Wire-level packet model: control-flag bit field, net-state framing, and
//! the big-endian fixed-width encode/decode helpers for the three control
//! packet kinds (`NET_QUERY`, `NET_ROUTE`, `NET_SERVICE`).

use core::fmt;

use crate::error::ParseError;

/// Reserved address meaning "unset". Address 0 never names a real node.
pub const UNSET: u16 = 0;

/// Bit within `controlFlags` marking a packet as control-plane (netstate).
pub const CF_NETSTATE: u8 = 0b0000_0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFlags(pub u8);

impl ControlFlags {
    pub const NONE: ControlFlags = ControlFlags(0);
    pub const NETSTATE: ControlFlags = ControlFlags(CF_NETSTATE);

    pub fn is_netstate(&self) -> bool {
        self.0 & CF_NETSTATE != 0
    }
}

impl From<u8> for ControlFlags {
    fn from(value: u8) -> Self {
        ControlFlags(value)
    }
}

/// Control-plane packet kind. `None` marks an ordinary application packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetState {
    None,
    NetQuery,
    NetRoute,
    NetService,
}

impl From<u8> for NetState {
    fn from(value: u8) -> Self {
        match value {
            1 => NetState::NetQuery,
            2 => NetState::NetRoute,
            3 => NetState::NetService,
            _ => NetState::None,
        }
    }
}

impl NetState {
    pub fn to_meta(self) -> u8 {
        match self {
            NetState::None => 0,
            NetState::NetQuery => 1,
            NetState::NetRoute => 2,
            NetState::NetService => 3,
        }
    }
}

impl fmt::Display for NetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NetState::None => "none",
            NetState::NetQuery => "NET_QUERY",
            NetState::NetRoute => "NET_ROUTE",
            NetState::NetService => "NET_SERVICE",
        };
        write!(f, "{label}")
    }
}

/// A structured ALN message. `srcAddr`/`destAddr`/`nextAddr`/`serviceID`/
/// `contextID` are all "optional 16-bit" fields per the wire contract;
/// `UNSET` (0) stands in for absence, matching the address space's own
/// reserved-zero convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub control_flags: ControlFlags,
    pub net_state: NetState,
    pub src_addr: u16,
    pub dest_addr: u16,
    pub next_addr: u16,
    pub service_id: u16,
    pub context_id: u16,
    pub data: Vec<u8>,
}

impl Default for Packet {
    fn default() -> Self {
        Self {
            control_flags: ControlFlags::NONE,
            net_state: NetState::None,
            src_addr: UNSET,
            dest_addr: UNSET,
            next_addr: UNSET,
            service_id: UNSET,
            context_id: UNSET,
            data: Vec::new(),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} src={} dest={} next={} svc={} ctx={} len={}]",
            self.net_state,
            self.src_addr,
            self.dest_addr,
            self.next_addr,
            self.service_id,
            self.context_id,
            self.data.len(),
        )
    }
}

impl Packet {
    pub fn is_netstate(&self) -> bool {
        self.control_flags.is_netstate()
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Builds a `NET_QUERY` packet: empty payload, solicits the peer's full
/// routing and service tables.
pub fn make_net_query_packet(src_addr: u16) -> Packet {
    Packet {
        control_flags: ControlFlags::NETSTATE,
        net_state: NetState::NetQuery,
        src_addr,
        ..Default::default()
    }
}

/// Builds a `NET_ROUTE` advertisement: `srcAddr` is the advertiser,
/// payload is `destAddr(2) || cost(2)`.
pub fn make_route_packet(src_addr: u16, dest_addr: u16, cost: u16) -> Packet {
    let mut data = Vec::with_capacity(4);
    write_u16(&mut data, dest_addr);
    write_u16(&mut data, cost);
    Packet {
        control_flags: ControlFlags::NETSTATE,
        net_state: NetState::NetRoute,
        src_addr,
        data,
        ..Default::default()
    }
}

/// Parses a `NET_ROUTE` payload, returning `(destAddr, cost)`. The
/// advertising neighbor (`nextHop`) is the packet's `srcAddr`, not part of
/// the payload.
pub fn parse_route_packet(packet: &Packet) -> Result<(u16, u16), ParseError> {
    if packet.net_state != NetState::NetRoute {
        return Err(ParseError::WrongNetState);
    }
    if packet.data.len() != 4 {
        return Err(ParseError::WrongLength { expected: 4, actual: packet.data.len() });
    }
    let dest_addr = read_u16(&packet.data, 0);
    let cost = read_u16(&packet.data, 2);
    Ok((dest_addr, cost))
}

/// Builds a `NET_SERVICE` advertisement: payload is
/// `hostAddr(2) || serviceID(2) || load(2)`.
pub fn make_service_packet(src_addr: u16, host_addr: u16, service_id: u16, load: u16) -> Packet {
    let mut data = Vec::with_capacity(6);
    write_u16(&mut data, host_addr);
    write_u16(&mut data, service_id);
    write_u16(&mut data, load);
    Packet {
        control_flags: ControlFlags::NETSTATE,
        net_state: NetState::NetService,
        src_addr,
        data,
        ..Default::default()
    }
}

/// Parses a `NET_SERVICE` payload, returning `(hostAddr, serviceID, load)`.
pub fn parse_service_packet(packet: &Packet) -> Result<(u16, u16, u16), ParseError> {
    if packet.net_state != NetState::NetService {
        return Err(ParseError::WrongNetState);
    }
    if packet.data.len() != 6 {
        return Err(ParseError::WrongLength { expected: 6, actual: packet.data.len() });
    }
    let host_addr = read_u16(&packet.data, 0);
    let service_id = read_u16(&packet.data, 2);
    let load = read_u16(&packet.data, 4);
    Ok((host_addr, service_id, load))
}
