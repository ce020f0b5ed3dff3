//! Subcommand table: names, positional parameters and action templates

use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::config::WireGuardConfig;
use crate::error::DispatchError;
use super::cidr::Ipv4Cidr;

/// Every action the agent knows how to carry out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subcommand {
    SetHostName,
    ChangeAdminPassword,
    RebootSystem,
    SetEthernetInterface,
    SetEthernetDhcp,
    NoSetEthernetInterface,
    AddRouteEntry,
    RemoveRouteEntry,
    AddDefaultGateway,
    RemoveDefaultGateway,
    SetNameServer,
    NoSetNameServer,
    SetWireguardInterface,
    NoSetWireguardInterface,
    SetWireguardGlobalConfig,
    AddWireguardPeer,
    RemoveWireguardPeer,
}

impl Subcommand {
    pub const ALL: [Subcommand; 17] = [
        Subcommand::SetHostName,
        Subcommand::ChangeAdminPassword,
        Subcommand::RebootSystem,
        Subcommand::SetEthernetInterface,
        Subcommand::SetEthernetDhcp,
        Subcommand::NoSetEthernetInterface,
        Subcommand::AddRouteEntry,
        Subcommand::RemoveRouteEntry,
        Subcommand::AddDefaultGateway,
        Subcommand::RemoveDefaultGateway,
        Subcommand::SetNameServer,
        Subcommand::NoSetNameServer,
        Subcommand::SetWireguardInterface,
        Subcommand::NoSetWireguardInterface,
        Subcommand::SetWireguardGlobalConfig,
        Subcommand::AddWireguardPeer,
        Subcommand::RemoveWireguardPeer,
    ];

    /// Wire name of the subcommand
    pub fn name(&self) -> &'static str {
        match self {
            Subcommand::SetHostName => "SET_HOST_NAME",
            Subcommand::ChangeAdminPassword => "CHANGE_ADMIN_PASSWORD",
            Subcommand::RebootSystem => "REBOOT_SYSTEM",
            Subcommand::SetEthernetInterface => "SET_ETHERNET_INTERFACE",
            Subcommand::SetEthernetDhcp => "SET_ETHERNET_DHCP",
            Subcommand::NoSetEthernetInterface => "NO_SET_ETHERNET_INTERFACE",
            Subcommand::AddRouteEntry => "ADD_ROUTE_ENTRY",
            Subcommand::RemoveRouteEntry => "REMOVE_ROUTE_ENTRY",
            Subcommand::AddDefaultGateway => "ADD_DEFAULT_GATEWAY",
            Subcommand::RemoveDefaultGateway => "REMOVE_DEFAULT_GATEWAY",
            Subcommand::SetNameServer => "SET_NAME_SERVER",
            Subcommand::NoSetNameServer => "NO_SET_NAME_SERVER",
            Subcommand::SetWireguardInterface => "SET_WIREGUARD_INTERFACE",
            Subcommand::NoSetWireguardInterface => "NO_SET_WIREGUARD_INTERFACE",
            Subcommand::SetWireguardGlobalConfig => "SET_WIREGUARD_GLOBAL_CONFIG",
            Subcommand::AddWireguardPeer => "ADD_WIREGUARD_PEER",
            Subcommand::RemoveWireguardPeer => "REMOVE_WIREGUARD_PEER",
        }
    }

    /// Look up a subcommand by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Ordered parameter names; the length is the required field count
    pub fn params(&self) -> &'static [&'static str] {
        match self {
            Subcommand::SetHostName => &["hostname"],
            Subcommand::ChangeAdminPassword => &["user", "password"],
            Subcommand::RebootSystem => &[],
            Subcommand::SetEthernetInterface => &["ifname", "cidr-or-addr", "mask-or-addr"],
            Subcommand::SetEthernetDhcp => &["ifname"],
            Subcommand::NoSetEthernetInterface => &["ifname"],
            Subcommand::AddRouteEntry => &["ifname", "dest-cidr", "gateway"],
            Subcommand::RemoveRouteEntry => &["dest", "gateway"],
            Subcommand::AddDefaultGateway => &["ifname", "gateway"],
            Subcommand::RemoveDefaultGateway => &[],
            Subcommand::SetNameServer => &["primary", "secondary"],
            Subcommand::NoSetNameServer => &[],
            Subcommand::SetWireguardInterface => &["cidr"],
            Subcommand::NoSetWireguardInterface => &[],
            Subcommand::SetWireguardGlobalConfig => &["listen-port"],
            Subcommand::AddWireguardPeer => &["pubkey", "allowed-ips", "endpoint"],
            Subcommand::RemoveWireguardPeer => &["pubkey"],
        }
    }

    pub fn arity(&self) -> usize {
        self.params().len()
    }

    pub fn description(&self) -> &'static str {
        match self {
            Subcommand::SetHostName => "Set the system hostname",
            Subcommand::ChangeAdminPassword => "Change a local account password",
            Subcommand::RebootSystem => "Reboot the host",
            Subcommand::SetEthernetInterface => "Assign a static address to an interface",
            Subcommand::SetEthernetDhcp => "Configure an interface through DHCP",
            Subcommand::NoSetEthernetInterface => "Remove an interface's address",
            Subcommand::AddRouteEntry => "Add a static route",
            Subcommand::RemoveRouteEntry => "Remove a static route",
            Subcommand::AddDefaultGateway => "Add a default route",
            Subcommand::RemoveDefaultGateway => "Remove the default route",
            Subcommand::SetNameServer => "Set the DNS servers",
            Subcommand::NoSetNameServer => "Clear the DNS servers",
            Subcommand::SetWireguardInterface => "Assign an address to the WireGuard interface",
            Subcommand::NoSetWireguardInterface => "Clear the WireGuard interface address",
            Subcommand::SetWireguardGlobalConfig => "Set the WireGuard listen port",
            Subcommand::AddWireguardPeer => "Add a WireGuard peer",
            Subcommand::RemoveWireguardPeer => "Remove a WireGuard peer",
        }
    }

    /// Parameters hidden from logs and error messages
    fn is_sensitive(&self) -> bool {
        matches!(self, Subcommand::ChangeAdminPassword)
    }

    /// Substitute `params` into the action template.
    ///
    /// `params` must already match [`arity`](Self::arity).
    pub(crate) fn build(
        &self,
        params: &[String],
        wireguard: &WireGuardConfig,
    ) -> Result<Action, DispatchError> {
        for (index, value) in params.iter().enumerate() {
            check_word(index, value)?;
        }
        let p = |i: usize| params.get(i).map(String::as_str).unwrap_or_default();

        let command = match self {
            Subcommand::SetHostName => format!("hostname {}", p(0)),
            Subcommand::ChangeAdminPassword => format!("passwd {} {}", p(0), p(1)),
            Subcommand::RebootSystem => "reboot".to_string(),
            Subcommand::SetEthernetInterface => {
                let (addr, mask) = address_and_mask(params)?;
                format!("ip address {} {} {}", p(0), addr, mask)
            }
            Subcommand::SetEthernetDhcp => format!("ip address {} dhcp", p(0)),
            Subcommand::NoSetEthernetInterface => format!("no ip address {}", p(0)),
            Subcommand::AddRouteEntry => {
                let dest = cidr(1, p(1))?;
                let gateway = ipv4(2, p(2))?;
                format!(
                    "ip route {} {} {} {}",
                    dest.network(),
                    dest.netmask(),
                    gateway,
                    p(0)
                )
            }
            Subcommand::RemoveRouteEntry => {
                format!("no ip route {} {}", ipv4(0, p(0))?, ipv4(1, p(1))?)
            }
            Subcommand::AddDefaultGateway => {
                let gateway = ipv4(1, p(1))?;
                format!("ip route 0.0.0.0 0.0.0.0 {} {}", gateway, p(0))
            }
            Subcommand::RemoveDefaultGateway => "no ip route 0.0.0.0 0.0.0.0".to_string(),
            Subcommand::SetNameServer => {
                format!("nameserver {} {}", ipv4(0, p(0))?, ipv4(1, p(1))?)
            }
            Subcommand::NoSetNameServer => "no nameserver".to_string(),
            Subcommand::SetWireguardInterface => {
                let cidr = cidr(0, p(0))?;
                format!(
                    "ip address {} {} {}",
                    wireguard.interface,
                    cidr.addr(),
                    cidr.netmask()
                )
            }
            Subcommand::NoSetWireguardInterface => {
                format!("no ip address {}", wireguard.interface)
            }
            Subcommand::SetWireguardGlobalConfig => format!("wg listenport {}", port(0, p(0))?),
            Subcommand::AddWireguardPeer => {
                check_allowed_ips(1, p(1))?;
                check_endpoint(2, p(2))?;
                format!(
                    "wg peer {} allowed-ips {} endpoint {} persistent-keepalive {}",
                    p(0),
                    p(1),
                    p(2),
                    wireguard.persistent_keepalive
                )
            }
            Subcommand::RemoveWireguardPeer => format!("no wg peer {}", p(0)),
        };

        Ok(Action {
            subcommand: *self,
            command,
        })
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully substituted configuration-shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    subcommand: Subcommand,
    command: String,
}

impl Action {
    pub fn subcommand(&self) -> Subcommand {
        self.subcommand
    }

    /// The command line handed to the configuration shell
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Form of the command safe to write to logs
    pub fn redacted(&self) -> String {
        if self.subcommand.is_sensitive() {
            match self.command.split_once(' ') {
                Some((verb, _)) => format!("{} <redacted>", verb),
                None => self.command.clone(),
            }
        } else {
            self.command.clone()
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Parameters are single words of the configuration shell
fn check_word(index: usize, value: &str) -> Result<(), DispatchError> {
    if value.is_empty() {
        return Err(DispatchError::invalid(index, "empty value"));
    }
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '\\'))
    {
        return Err(DispatchError::invalid(
            index,
            format!("character {:?} is not allowed", c),
        ));
    }
    Ok(())
}

fn ipv4(index: usize, value: &str) -> Result<Ipv4Addr, DispatchError> {
    value
        .parse()
        .map_err(|_| DispatchError::invalid(index, format!("'{}' is not an IPv4 address", value)))
}

fn cidr(index: usize, value: &str) -> Result<Ipv4Cidr, DispatchError> {
    value.parse().map_err(|e: String| DispatchError::invalid(index, e))
}

fn port(index: usize, value: &str) -> Result<u16, DispatchError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(DispatchError::invalid(index, format!("'{}' is not a port number", value))),
    }
}

/// `none` or a comma-separated list of IPv4 CIDRs
fn check_allowed_ips(index: usize, value: &str) -> Result<(), DispatchError> {
    if value == "none" {
        return Ok(());
    }
    for entry in value.split(',') {
        cidr(index, entry)?;
    }
    Ok(())
}

/// `none`, `HOST:PORT` or `A.B.C.D:PORT`
fn check_endpoint(index: usize, value: &str) -> Result<(), DispatchError> {
    if value == "none" {
        return Ok(());
    }
    match value.rsplit_once(':') {
        Some((host, p)) if !host.is_empty() => port(index, p).map(|_| ()),
        _ => Err(DispatchError::invalid(
            index,
            format!("'{}' is not an endpoint (HOST:PORT)", value),
        )),
    }
}

/// Address and netmask of `SET_ETHERNET_INTERFACE`.
///
/// CIDR notation in the second slot supplies both and the third slot is
/// ignored; otherwise the second and third slots are address and netmask.
fn address_and_mask(params: &[String]) -> Result<(Ipv4Addr, Ipv4Addr), DispatchError> {
    let second = params.get(1).map(String::as_str).unwrap_or_default();
    let third = params.get(2).map(String::as_str).unwrap_or_default();

    if second.contains('/') {
        let cidr = cidr(1, second)?;
        tracing::debug!("Using netmask {} from {}, ignoring '{}'", cidr.netmask(), cidr, third);
        return Ok((cidr.addr(), cidr.netmask()));
    }

    Ok((ipv4(1, second)?, ipv4(2, third)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(subcommand: Subcommand, params: &[&str]) -> Result<Action, DispatchError> {
        let params: Vec<String> = params.iter().map(|s| s.to_string()).collect();
        subcommand.build(&params, &WireGuardConfig::default())
    }

    #[test]
    fn test_names_round_trip() {
        for subcommand in Subcommand::ALL {
            assert_eq!(Subcommand::from_name(subcommand.name()), Some(subcommand));
        }
        assert_eq!(Subcommand::from_name("UNKNOWN_CMD"), None);
        assert_eq!(Subcommand::from_name("set_host_name"), None);
    }

    #[test]
    fn test_arity() {
        assert_eq!(Subcommand::RebootSystem.arity(), 0);
        assert_eq!(Subcommand::SetHostName.arity(), 1);
        assert_eq!(Subcommand::ChangeAdminPassword.arity(), 2);
        assert_eq!(Subcommand::SetEthernetInterface.arity(), 3);
        assert_eq!(Subcommand::AddWireguardPeer.arity(), 3);
        assert_eq!(Subcommand::NoSetWireguardInterface.arity(), 0);
    }

    #[test]
    fn test_core_templates() {
        let cases: &[(Subcommand, &[&str], &str)] = &[
            (Subcommand::SetHostName, &["edge-01"], "hostname edge-01"),
            (Subcommand::ChangeAdminPassword, &["admin", "s3cret"], "passwd admin s3cret"),
            (Subcommand::RebootSystem, &[], "reboot"),
            (
                Subcommand::SetEthernetInterface,
                &["lan", "192.168.1.1", "255.255.255.0"],
                "ip address lan 192.168.1.1 255.255.255.0",
            ),
            (Subcommand::NoSetEthernetInterface, &["wan"], "no ip address wan"),
            (
                Subcommand::AddRouteEntry,
                &["wan", "10.20.0.0/16", "192.168.0.1"],
                "ip route 10.20.0.0 255.255.0.0 192.168.0.1 wan",
            ),
            (
                Subcommand::RemoveRouteEntry,
                &["10.20.0.0", "192.168.0.1"],
                "no ip route 10.20.0.0 192.168.0.1",
            ),
            (
                Subcommand::SetWireguardInterface,
                &["10.8.0.1/24"],
                "ip address wg0 10.8.0.1 255.255.255.0",
            ),
            (Subcommand::NoSetWireguardInterface, &[], "no ip address wg0"),
            (
                Subcommand::AddWireguardPeer,
                &["pubkeyABC", "10.0.0.0/8", "1.2.3.4:51820"],
                "wg peer pubkeyABC allowed-ips 10.0.0.0/8 endpoint 1.2.3.4:51820 persistent-keepalive 25",
            ),
            (Subcommand::RemoveWireguardPeer, &["pubkeyABC"], "no wg peer pubkeyABC"),
        ];

        for (subcommand, params, expected) in cases {
            let action = build(*subcommand, params).unwrap();
            assert_eq!(action.command(), *expected, "{}", subcommand);
            assert_eq!(action.subcommand(), *subcommand);
        }
    }

    #[test]
    fn test_supplementary_templates() {
        let cases: &[(Subcommand, &[&str], &str)] = &[
            (Subcommand::SetEthernetDhcp, &["wan"], "ip address wan dhcp"),
            (
                Subcommand::AddDefaultGateway,
                &["wan", "192.168.0.1"],
                "ip route 0.0.0.0 0.0.0.0 192.168.0.1 wan",
            ),
            (Subcommand::RemoveDefaultGateway, &[], "no ip route 0.0.0.0 0.0.0.0"),
            (Subcommand::SetNameServer, &["1.1.1.1", "8.8.8.8"], "nameserver 1.1.1.1 8.8.8.8"),
            (Subcommand::NoSetNameServer, &[], "no nameserver"),
            (Subcommand::SetWireguardGlobalConfig, &["51820"], "wg listenport 51820"),
        ];

        for (subcommand, params, expected) in cases {
            assert_eq!(build(*subcommand, params).unwrap().command(), *expected);
        }
    }

    #[test]
    fn test_ethernet_cidr_overrides_mask() {
        let action = build(
            Subcommand::SetEthernetInterface,
            &["lan", "192.168.1.1/16", "255.255.255.0"],
        )
        .unwrap();
        assert_eq!(action.command(), "ip address lan 192.168.1.1 255.255.0.0");
    }

    #[test]
    fn test_wireguard_config_is_applied() {
        let wireguard = WireGuardConfig {
            interface: "wg1".into(),
            persistent_keepalive: "off".into(),
        };
        let params = vec!["key".to_string(), "none".to_string(), "none".to_string()];
        let action = Subcommand::AddWireguardPeer.build(&params, &wireguard).unwrap();
        assert!(action.command().ends_with("persistent-keepalive off"));

        let action = Subcommand::NoSetWireguardInterface.build(&[], &wireguard).unwrap();
        assert_eq!(action.command(), "no ip address wg1");
    }

    #[test]
    fn test_rejects_unsafe_words() {
        for bad in ["", "two words", "quo\"te", "semi'", "back\\slash", "tab\there"] {
            let err = build(Subcommand::SetHostName, &[bad]).unwrap_err();
            assert!(
                matches!(err, DispatchError::InvalidParameter { index: 0, .. }),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_rejects_bad_addresses() {
        assert!(build(Subcommand::SetWireguardInterface, &["10.8.0.1"]).is_err());
        assert!(build(Subcommand::AddRouteEntry, &["wan", "10.0.0.0/8", "gateway"]).is_err());
        assert!(build(Subcommand::SetNameServer, &["1.1.1.1", "dns"]).is_err());
        assert!(build(Subcommand::SetWireguardGlobalConfig, &["0"]).is_err());
        assert!(build(Subcommand::SetWireguardGlobalConfig, &["70000"]).is_err());
        assert!(build(Subcommand::AddWireguardPeer, &["k", "none", "1.2.3.4"]).is_err());
        assert!(build(Subcommand::AddWireguardPeer, &["k", "none", ":51820"]).is_err());
        assert!(build(Subcommand::RemoveRouteEntry, &["10.20.0.0/16", "192.168.0.1"]).is_err());
        assert!(build(Subcommand::RemoveRouteEntry, &["10.20.0.0", "gw"]).is_err());
    }

    #[test]
    fn test_allowed_ips() {
        let ok = build(
            Subcommand::AddWireguardPeer,
            &["k", "192.168.1.0/24,10.0.0.0/8,0.0.0.0/0", "none"],
        )
        .unwrap();
        assert!(ok.command().contains("allowed-ips 192.168.1.0/24,10.0.0.0/8,0.0.0.0/0 "));

        for bad in ["garbage", "10.0.0.0/8,", "10.0.0.0/33", "10.0.0.1"] {
            let err = build(Subcommand::AddWireguardPeer, &["k", bad, "none"]).unwrap_err();
            assert!(
                matches!(err, DispatchError::InvalidParameter { index: 1, .. }),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_password_is_redacted() {
        let action = build(Subcommand::ChangeAdminPassword, &["admin", "s3cret"]).unwrap();
        assert_eq!(action.command(), "passwd admin s3cret");
        assert_eq!(action.to_string(), "passwd <redacted>");
        assert!(!format!("{}", action).contains("s3cret"));
    }
}
