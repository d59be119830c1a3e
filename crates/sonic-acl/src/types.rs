//! ACL identifiers, closed enumerations and the static capability table.
//!
//! Every enumeration here is a closed set with a stable numeric code shared
//! with the protocol layer. Converting an unknown code fails with
//! `InvalidArgument`, which is how the entity factories validate requested
//! filter and action types.

use std::fmt;
use std::str::FromStr;

use log::warn;
use sonic_ndi::{IfIndex, InterfaceMapper, NdiPort};

use crate::error::{AclError, AclResult};

/// Logical object id generated by this subsystem (table, entry, counter, or
/// the logical side of an opaque value).
pub type ObjId = u64;

/// Switch identifier.
pub type SwitchId = u32;

/// Entry priority. Treated as an opaque ordering key.
pub type AclPriority = u32;

macro_rules! acl_code_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($what:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $code, )+
        }

        impl $name {
            /// Every member of the set, in code order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Numeric code shared with the protocol layer.
            pub const fn code(self) -> u32 {
                self as u32
            }

            /// Upper-case name used in dumps.
            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }
        }

        impl TryFrom<u32> for $name {
            type Error = AclError;

            fn try_from(code: u32) -> Result<Self, Self::Error> {
                match code {
                    $( $code => Ok($name::$variant), )+
                    _ => Err(AclError::invalid(format!("Invalid {} {}", $what, code))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.name())
            }
        }

        impl FromStr for $name {
            type Err = AclError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.to_uppercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == upper)
                    .ok_or_else(|| AclError::invalid(format!("Unknown {}: {}", $what, s)))
            }
        }
    };
}

acl_code_enum! {
    /// ACL stage.
    pub enum AclStage ("ACL stage") {
        Ingress = 1 => "INGRESS",
        Egress = 2 => "EGRESS",
    }
}

acl_code_enum! {
    /// Packet disposition for the PACKET_ACTION action.
    pub enum AclPacketAction ("packet action") {
        Drop = 1 => "DROP",
        Forward = 2 => "FORWARD",
        CopyToCpu = 3 => "COPY-TO-CPU",
        TrapToCpu = 4 => "TRAP-TO-CPU",
        CopyToCpuCancel = 5 => "COPY-TO-CPU-CANCEL",
        CopyToCpuAndForward = 6 => "COPY-TO-CPU-AND-FORWARD",
        CopyToCpuCancelAndDrop = 7 => "CPU-CANCEL-AND-DROP",
        CopyToCpuCancelAndForward = 8 => "CPU-CANCEL-AND-FORWARD",
    }
}

acl_code_enum! {
    /// Values accepted by the IP_TYPE filter.
    pub enum AclIpType ("IP type") {
        Any = 1 => "ANY",
        Ip = 2 => "IP",
        NonIp = 3 => "NON_IP",
        Ipv4Any = 4 => "IPV4ANY",
        NonIpv4 = 5 => "NON_IPV4",
        Ipv6Any = 6 => "IPV6ANY",
        NonIpv6 = 7 => "NON_IPV6",
        Arp = 8 => "ARP",
        ArpRequest = 9 => "ARP_REQUEST",
        ArpReply = 10 => "ARP_REPLY",
    }
}

acl_code_enum! {
    /// Values accepted by the IP_FRAG filter.
    pub enum AclIpFrag ("IP frag") {
        Any = 1 => "ANY",
        NonFrag = 2 => "NON_FRAG",
        NonFragOrHead = 3 => "NON_FRAG_OR_HEAD",
        Head = 4 => "HEAD",
        NonHead = 5 => "NON_HEAD",
    }
}

acl_code_enum! {
    /// What a counter counts.
    pub enum AclCounterType ("counter type") {
        Byte = 1 => "BYTE",
        Packet = 2 => "PACKET",
    }
}

acl_code_enum! {
    /// Filter (match field) types.
    pub enum AclMatchType ("filter type") {
        SrcIpv6 = 1 => "SRC_IPV6",
        DstIpv6 = 2 => "DST_IPV6",
        SrcMac = 3 => "SRC_MAC",
        DstMac = 4 => "DST_MAC",
        SrcIp = 5 => "SRC_IP",
        DstIp = 6 => "DST_IP",
        InPorts = 7 => "IN_PORTS",
        OutPorts = 8 => "OUT_PORTS",
        InPort = 9 => "IN_PORT",
        OutPort = 10 => "OUT_PORT",
        OuterVlanId = 11 => "OUTER_VLAN_ID",
        OuterVlanPri = 12 => "OUTER_VLAN_PRI",
        OuterVlanCfi = 13 => "OUTER_VLAN_CFI",
        InnerVlanId = 14 => "INNER_VLAN_ID",
        InnerVlanPri = 15 => "INNER_VLAN_PRI",
        InnerVlanCfi = 16 => "INNER_VLAN_CFI",
        L4SrcPort = 17 => "L4_SRC_PORT",
        L4DstPort = 18 => "L4_DST_PORT",
        EtherType = 19 => "ETHER_TYPE",
        IpProtocol = 20 => "IP_PROTOCOL",
        Dscp = 21 => "DSCP",
        Ttl = 22 => "TTL",
        Tos = 23 => "TOS",
        IpFlags = 24 => "IP_FLAGS",
        TcpFlags = 25 => "TCP_FLAGS",
        IpType = 26 => "IP_TYPE",
        IpFrag = 27 => "IP_FRAG",
        Ipv6FlowLabel = 28 => "IPV6_FLOW_LABEL",
        Tc = 29 => "TC",
        Ecn = 30 => "ECN",
        IcmpType = 31 => "ICMP_TYPE",
        IcmpCode = 32 => "ICMP_CODE",
        SrcIntf = 33 => "SRC_INTF",
        DstIntf = 34 => "DST_INTF",
    }
}

acl_code_enum! {
    /// Action types.
    pub enum AclActionType ("action type") {
        RedirectPort = 1 => "REDIRECT_PORT",
        RedirectIpNexthop = 2 => "REDIRECT_IP_NEXTHOP",
        PacketAction = 3 => "PACKET_ACTION",
        Flood = 4 => "FLOOD",
        MirrorIngress = 5 => "MIRROR_INGRESS",
        MirrorEgress = 6 => "MIRROR_EGRESS",
        SetCounter = 7 => "SET_COUNTER",
        SetPolicer = 8 => "SET_POLICER",
        DecrementTtl = 9 => "DECREMENT_TTL",
        SetTc = 10 => "SET_TC",
        SetInnerVlanId = 11 => "SET_INNER_VLAN_ID",
        SetInnerVlanPri = 12 => "SET_INNER_VLAN_PRI",
        SetOuterVlanId = 13 => "SET_OUTER_VLAN_ID",
        SetOuterVlanPri = 14 => "SET_OUTER_VLAN_PRI",
        SetSrcMac = 15 => "SET_SRC_MAC",
        SetDstMac = 16 => "SET_DST_MAC",
        SetSrcIp = 17 => "SET_SRC_IP",
        SetDstIp = 18 => "SET_DST_IP",
        SetSrcIpv6 = 19 => "SET_SRC_IPV6",
        SetDstIpv6 = 20 => "SET_DST_IPV6",
        SetDscp = 21 => "SET_DSCP",
        SetL4SrcPort = 22 => "SET_L4_SRC_PORT",
        SetL4DstPort = 23 => "SET_L4_DST_PORT",
        SetCpuQueue = 24 => "SET_CPU_QUEUE",
        EgressMask = 25 => "EGRESS_MASK",
        RedirectPortList = 26 => "REDIRECT_PORT_LIST",
        SetUserTrapId = 27 => "SET_USER_TRAP_ID",
    }
}

/// The kind of payload a filter or action currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclValueKind {
    None,
    U8,
    U16,
    U32,
    Ipv4,
    Ipv6,
    Mac,
    PacketAction,
    ObjId,
    ObjIdList,
    Port,
    PortList,
    IpType,
    IpFrag,
}

impl fmt::Display for AclValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "NO_VALUE",
            Self::U8 => "U8",
            Self::U16 => "U16",
            Self::U32 => "U32",
            Self::Ipv4 => "IPV4_ADDR",
            Self::Ipv6 => "IPV6_ADDR",
            Self::Mac => "MAC_ADDR",
            Self::PacketAction => "PKT_ACTION",
            Self::ObjId => "OBJ_ID",
            Self::ObjIdList => "OBJ_ID_LIST",
            Self::Port => "PORT",
            Self::PortList => "PORTLIST",
            Self::IpType => "IP_TYPE",
            Self::IpFrag => "IP_FRAG",
        };
        write!(f, "{}", s)
    }
}

/// Which value-cell contract a filter or action type follows.
///
/// This is the capability table entry: the setter, the getter and the
/// resulting value kind all follow from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclValueSpec {
    NoValue,
    U8,
    U16,
    U32,
    Ipv4,
    Ipv6,
    Mac,
    PacketAction,
    IpType,
    IpFrag,
    /// Single logical id.
    ObjId,
    /// (logical id, per-NPU id table) pairs, single lookup.
    OpaqueData,
    /// (logical id, per-NPU id table) pairs, list materialization.
    OpaqueDataList,
    /// One interface.
    IfIndex,
    /// Interface list.
    IfIndexList,
}

impl AclMatchType {
    /// Capability table entry for the filter type.
    pub const fn value_spec(self) -> AclValueSpec {
        use AclMatchType::*;
        match self {
            SrcIpv6 | DstIpv6 => AclValueSpec::Ipv6,
            SrcMac | DstMac => AclValueSpec::Mac,
            SrcIp | DstIp => AclValueSpec::Ipv4,
            InPorts | OutPorts => AclValueSpec::IfIndexList,
            InPort | OutPort => AclValueSpec::IfIndex,
            OuterVlanId | InnerVlanId | L4SrcPort | L4DstPort | EtherType => AclValueSpec::U16,
            OuterVlanPri | OuterVlanCfi | InnerVlanPri | InnerVlanCfi | IpProtocol | Dscp
            | Ttl | Tos | IpFlags | TcpFlags | Tc | Ecn | IcmpType | IcmpCode => AclValueSpec::U8,
            Ipv6FlowLabel => AclValueSpec::U32,
            IpType => AclValueSpec::IpType,
            IpFrag => AclValueSpec::IpFrag,
            SrcIntf | DstIntf => AclValueSpec::OpaqueData,
        }
    }
}

impl AclActionType {
    /// Capability table entry for the action type.
    pub const fn value_spec(self) -> AclValueSpec {
        use AclActionType::*;
        match self {
            RedirectPort => AclValueSpec::IfIndex,
            RedirectPortList | EgressMask => AclValueSpec::IfIndexList,
            RedirectIpNexthop | SetPolicer | SetCpuQueue => AclValueSpec::OpaqueData,
            MirrorIngress | MirrorEgress => AclValueSpec::OpaqueDataList,
            PacketAction => AclValueSpec::PacketAction,
            Flood | DecrementTtl => AclValueSpec::NoValue,
            SetCounter => AclValueSpec::ObjId,
            SetTc | SetInnerVlanPri | SetOuterVlanPri | SetDscp => AclValueSpec::U8,
            SetInnerVlanId | SetOuterVlanId | SetL4SrcPort | SetL4DstPort => AclValueSpec::U16,
            SetUserTrapId => AclValueSpec::U32,
            SetSrcMac | SetDstMac => AclValueSpec::Mac,
            SetSrcIp | SetDstIp => AclValueSpec::Ipv4,
            SetSrcIpv6 | SetDstIpv6 => AclValueSpec::Ipv6,
        }
    }
}

/// An interface reference resolved to its NPU and device-local port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AclIfPort {
    pub ifindex: IfIndex,
    pub port: NdiPort,
}

impl AclIfPort {
    pub fn new(ifindex: IfIndex, port: NdiPort) -> Self {
        Self { ifindex, port }
    }

    /// Resolves a physical interface. LAGs have no single port and fail
    /// like unknown interfaces.
    pub fn resolve(intf: &dyn InterfaceMapper, ifindex: IfIndex, what: &str) -> AclResult<Self> {
        let port = intf
            .port_of(ifindex)
            .map_err(|e| AclError::invalid(format!("{}: {}", what, e)))?;
        Ok(Self::new(ifindex, port))
    }

    /// Resolves every member of an interface list, keeping the given
    /// order. A LAG member fails like in [`AclIfPort::resolve`].
    pub fn resolve_all(
        intf: &dyn InterfaceMapper,
        ifindexes: &[IfIndex],
        what: &str,
    ) -> AclResult<Vec<Self>> {
        ifindexes
            .iter()
            .map(|&ifindex| Self::resolve(intf, ifindex, what))
            .collect()
    }

    /// Resolves an interface list, keeping the given order.
    ///
    /// LAG members are dropped with a warning rather than failing the
    /// whole list.
    pub fn resolve_list(
        intf: &dyn InterfaceMapper,
        ifindexes: &[IfIndex],
        what: &str,
    ) -> AclResult<Vec<Self>> {
        let mut members = Vec::with_capacity(ifindexes.len());
        for &ifindex in ifindexes {
            if intf.is_lag(ifindex) {
                warn!("{}: LAG ifindex {} not supported in port list, skipped", what, ifindex);
                continue;
            }
            members.push(Self::resolve(intf, ifindex, what)?);
        }
        Ok(members)
    }
}

impl fmt::Display for AclIfPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ifindex {} ({})", self.ifindex, self.port)
    }
}

/// Formats a port list as `[ifindex 1 (npu0/port1), ...]`.
pub(crate) struct PortListDisplay<'a>(pub &'a [AclIfPort]);

impl fmt::Display for PortListDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, member) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", member)?;
        }
        write!(f, "]")
    }
}
