use crate::error::Result;
use serde::Serialize;
use sysinfo::Networks;

/// Target name meaning "sum every interface".
pub const AGGREGATE_TARGET: &str = "All";

/// Cumulative counters since interface (or OS) start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub sent: u64,
    pub recv: u64,
}

/// Source of cumulative byte counters for the monitored target.
pub trait CounterSource: Send {
    fn read(&mut self) -> Result<Counters>;
}

/// Reads counters from the OS network interface list.
pub struct SystemCounterSource {
    networks: Networks,
    target: String,
}

impl SystemCounterSource {
    pub fn new(target: String) -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            target,
        }
    }
}

impl CounterSource for SystemCounterSource {
    fn read(&mut self) -> Result<Counters> {
        self.networks.refresh(true);
        let readings = self
            .networks
            .iter()
            .map(|(name, data)| (name.as_str(), data.total_transmitted(), data.total_received()));
        Ok(select_counters(readings, &self.target))
    }
}

fn select_counters<'a>(
    readings: impl IntoIterator<Item = (&'a str, u64, u64)>,
    target: &str,
) -> Counters {
    let mut aggregate = Counters::default();
    let mut matched = None;

    for (name, sent, recv) in readings {
        aggregate.sent += sent;
        aggregate.recv += recv;
        if name == target {
            matched = Some(Counters { sent, recv });
        }
    }

    if target == AGGREGATE_TARGET {
        aggregate
    } else {
        // The configured interface can vanish mid-run (USB NIC unplugged,
        // VPN down). That read falls back to the aggregate total.
        matched.unwrap_or(aggregate)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub mac_address: String,
    pub mtu: u64,
    pub total_sent: u64,
    pub total_received: u64,
}

/// Non-loopback interfaces currently known to the OS, sorted by name.
pub fn list_interfaces() -> Vec<InterfaceInfo> {
    let networks = Networks::new_with_refreshed_list();
    let mut interfaces: Vec<InterfaceInfo> = networks
        .iter()
        .filter(|(name, _)| !is_loopback(name.as_str()))
        .map(|(name, data)| InterfaceInfo {
            name: name.clone(),
            mac_address: data.mac_address().to_string(),
            mtu: data.mtu(),
            total_sent: data.total_transmitted(),
            total_received: data.total_received(),
        })
        .collect();
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    interfaces
}

fn is_loopback(name: &str) -> bool {
    name == "lo" || name == "lo0" || name.starts_with("Loopback")
}
