use crate::scheduler::SchedulerKind;
use phf::phf_map;
use std::cell::OnceCell;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Killdevil and Dogwood compute nodes share the `c-<NNN>-<M>` naming scheme and
/// are told apart by the numeric node band.
pub const KILLDEVIL_NODE_BAND: (u32, u32) = (183, 199);
pub const DOGWOOD_NODE_BAND: (u32, u32) = (201, 211);

const SHARED_NODE_PREFIX: &str = "c-";

/// Identity of the machine the preparation run executes on.
///
/// The set is closed: anything that cannot be classified collapses onto
/// [`ClusterId::FallbackDesktop`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterId {
    Killdevil,
    Longleaf,
    Dogwood,
    Wiggins,
    Laptop,
    /// Hostname matched nothing known.
    FallbackDesktop,
}

static EXACT_HOSTS: phf::Map<&'static str, ClusterId> = phf_map! {
    "wiggins" => ClusterId::Wiggins,
};

const HOST_PREFIXES: &[(&str, ClusterId)] = &[
    ("killdevil", ClusterId::Killdevil),
    ("dogwood", ClusterId::Dogwood),
    ("longleaf", ClusterId::Longleaf),
    ("Lysis", ClusterId::Laptop),
];

impl ClusterId {
    pub const ALL: [ClusterId; 6] = [
        ClusterId::Killdevil,
        ClusterId::Longleaf,
        ClusterId::Dogwood,
        ClusterId::Wiggins,
        ClusterId::Laptop,
        ClusterId::FallbackDesktop,
    ];

    /// Batch-scheduler dialect spoken by this cluster, if it has one.
    pub fn scheduler(self) -> Option<SchedulerKind> {
        match self {
            ClusterId::Killdevil => Some(SchedulerKind::Lsf),
            ClusterId::Dogwood | ClusterId::Longleaf => Some(SchedulerKind::Slurm),
            ClusterId::Wiggins | ClusterId::Laptop | ClusterId::FallbackDesktop => None,
        }
    }

    /// Queue requested when the operator does not name one.
    pub fn default_queue(self) -> &'static str {
        match self {
            ClusterId::Killdevil => "week",
            _ => "auto",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClusterId::Killdevil => "killdevil",
            ClusterId::Longleaf => "longleaf",
            ClusterId::Dogwood => "dogwood",
            ClusterId::Wiggins => "wiggins",
            ClusterId::Laptop => "laptop",
            ClusterId::FallbackDesktop => "desktop",
        }
    }

    /// Classifies a hostname. Pure; never fails.
    pub fn classify(hostname: &str) -> ClusterId {
        if let Some(node) = shared_node_number(hostname) {
            if in_band(node, KILLDEVIL_NODE_BAND) {
                return ClusterId::Killdevil;
            }
            if in_band(node, DOGWOOD_NODE_BAND) {
                return ClusterId::Dogwood;
            }
        }
        if let Some(id) = EXACT_HOSTS.get(hostname) {
            return *id;
        }
        HOST_PREFIXES
            .iter()
            .find(|(prefix, _)| hostname.starts_with(prefix))
            .map(|(_, id)| *id)
            .unwrap_or(ClusterId::FallbackDesktop)
    }
}

fn shared_node_number(hostname: &str) -> Option<u32> {
    hostname
        .strip_prefix(SHARED_NODE_PREFIX)?
        .split('-')
        .next()?
        .parse()
        .ok()
}

fn in_band(node: u32, (lo, hi): (u32, u32)) -> bool {
    node >= lo && node <= hi
}

#[derive(Debug, Error)]
#[error("Unknown cluster name '{0}'")]
pub struct ParseClusterIdError(pub String);

impl FromStr for ClusterId {
    type Err = ParseClusterIdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "killdevil" => Ok(ClusterId::Killdevil),
            "longleaf" => Ok(ClusterId::Longleaf),
            "dogwood" => Ok(ClusterId::Dogwood),
            "wiggins" => Ok(ClusterId::Wiggins),
            "laptop" | "lysis" => Ok(ClusterId::Laptop),
            "desktop" | "fallback" => Ok(ClusterId::FallbackDesktop),
            _ => Err(ParseClusterIdError(s.to_string())),
        }
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Determines the [`ClusterId`] at most once per identifier instance.
///
/// A masquerade identity short-circuits detection entirely, which is how
/// tests and `--masquerade` pin a specific cluster.
#[derive(Debug, Default)]
pub struct ClusterIdentifier {
    masquerade: Option<ClusterId>,
    resolved: OnceCell<ClusterId>,
}

impl ClusterIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn masquerading_as(id: ClusterId) -> Self {
        Self {
            masquerade: Some(id),
            resolved: OnceCell::new(),
        }
    }

    pub fn identify(&self) -> ClusterId {
        *self.resolved.get_or_init(|| {
            if let Some(id) = self.masquerade {
                debug!("Masquerading as cluster '{}'.", id);
                return id;
            }
            let hostname = local_hostname();
            let id = ClusterId::classify(&hostname);
            if id == ClusterId::FallbackDesktop {
                warn!(
                    "Unrecognized hostname '{}'; assuming the fallback desktop identity.",
                    hostname
                );
            } else {
                debug!("Hostname '{}' identified as cluster '{}'.", hostname, id);
            }
            id
        })
    }
}

const HOSTNAME_FILES: [&str; 2] = ["/proc/sys/kernel/hostname", "/etc/hostname"];

fn local_hostname() -> String {
    let env = std::env::var("HOSTNAME").ok();
    let name = resolve_hostname(env.as_deref(), &HOSTNAME_FILES);
    if name.is_empty() {
        debug!("No hostname found; the cluster will fall back to a desktop.");
    }
    name
}

/// First non-empty name from the environment value, then the files in order.
fn resolve_hostname<P: AsRef<Path>>(env: Option<&str>, files: &[P]) -> String {
    if let Some(name) = env.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    debug!("HOSTNAME is unset or empty; reading the hostname from files.");
    files
        .iter()
        .find_map(|path| {
            let path: &Path = path.as_ref();
            match std::fs::read_to_string(path) {
                Ok(content) => Some(content.trim().to_string()).filter(|n| !n.is_empty()),
                Err(e) => {
                    debug!("Could not read '{}': {}", path.display(), e);
                    None
                }
            }
        })
        .unwrap_or_default()
}
