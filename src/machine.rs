//! Machine identity and address lookups.
//!
//! Addresses are found in two stages: the machine's network interfaces are
//! listed first, then the address-allocation table is searched once per
//! interface hardware address. Interfaces and allocations are joined by MAC
//! value only.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::api::{ApiClient, ApiError, Transport};

/// Collection holding virtual machine definitions.
pub const VMS_COLLECTION: &str = "vms";
/// Collection holding machine network interfaces.
pub const NICS_COLLECTION: &str = "machine_nics";
/// Collection holding allocated network addresses.
pub const ADDRESSES_COLLECTION: &str = "vnet_addresses";

/// Durable numeric identifier of a machine.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct MachineId(pub u64);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for MachineId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// How the caller identified the target machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MachineSelector {
    /// Numeric machine identifier, used as-is.
    Id(MachineId),
    /// Human-readable VM name, resolved once per run.
    Name(String),
}

impl fmt::Display for MachineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "machine {id}"),
            Self::Name(name) => write!(f, "machine '{name}'"),
        }
    }
}

/// Errors raised by machine lookups.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum MachineError {
    /// Raised when no VM carries the requested name.
    #[error("machine '{name}' not found")]
    NotFound {
        /// Name that matched nothing.
        name: String,
    },
    /// Wrapper for remote call failures.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A network interface as listed by the management API.
///
/// Only the hardware address is decoded; other fields, including the record
/// key, are ignored whatever their type.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct NetworkInterface {
    /// Hardware address; absent while unassigned.
    #[serde(rename = "macaddress", default)]
    pub mac: Option<String>,
}

impl NetworkInterface {
    /// Returns the hardware address when it is present and non-blank.
    #[must_use]
    pub fn hardware_address(&self) -> Option<&str> {
        self.mac
            .as_deref()
            .map(str::trim)
            .filter(|mac| !mac.is_empty())
    }
}

/// One row of the address-allocation table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct AddressBinding {
    /// Hardware address the allocation is bound to.
    #[serde(default)]
    pub mac: Option<String>,
    /// Allocated address; absent while allocation is pending.
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VmRecord {
    machine: MachineId,
}

/// Maps a VM name to its machine identifier with a single filtered query.
///
/// When several VMs share the name the first one listed wins.
///
/// # Errors
///
/// Returns [`MachineError::NotFound`] when no VM has the name and
/// [`MachineError::Api`] when the query fails.
pub async fn resolve_by_name<T: Transport>(
    client: &ApiClient<T>,
    token: &str,
    name: &str,
) -> Result<MachineId, MachineError> {
    let filter = format!("name eq '{name}'");
    let vms: Vec<VmRecord> = client
        .list(VMS_COLLECTION, token, &[("filter", filter.as_str())])
        .await?;

    if vms.len() > 1 {
        debug!("{} machines named '{name}', using the first", vms.len());
    }

    vms.first()
        .map(|vm| vm.machine)
        .ok_or_else(|| MachineError::NotFound {
            name: name.to_owned(),
        })
}

/// Lists the network interfaces attached to `machine`.
///
/// # Errors
///
/// Returns [`ApiError`] when the query fails.
pub async fn list_interfaces<T: Transport>(
    client: &ApiClient<T>,
    token: &str,
    machine: MachineId,
) -> Result<Vec<NetworkInterface>, ApiError> {
    let filter = format!("machine eq {machine}");
    client
        .list(
            NICS_COLLECTION,
            token,
            &[("filter", filter.as_str()), ("fields", "macaddress,$key")],
        )
        .await
}

/// Lists the allocation rows bound to one hardware address.
///
/// # Errors
///
/// Returns [`ApiError`] when the query fails.
pub async fn list_bindings<T: Transport>(
    client: &ApiClient<T>,
    token: &str,
    mac: &str,
) -> Result<Vec<AddressBinding>, ApiError> {
    let filter = format!("mac eq '{mac}'");
    client
        .list(ADDRESSES_COLLECTION, token, &[("filter", filter.as_str())])
        .await
}

/// Returns every address bound to `machine`'s interfaces in discovery
/// order.
///
/// Interfaces without a hardware address are skipped. An empty result is
/// not an error. Duplicates are kept.
///
/// # Errors
///
/// Returns [`ApiError`] when any query fails.
pub async fn resolve_addresses<T: Transport>(
    client: &ApiClient<T>,
    token: &str,
    machine: MachineId,
) -> Result<Vec<String>, ApiError> {
    let interfaces = list_interfaces(client, token, machine).await?;
    debug!("machine {machine} has {} interface(s)", interfaces.len());

    let mut addresses = Vec::new();
    for mac in interfaces.iter().filter_map(NetworkInterface::hardware_address) {
        let bindings = list_bindings(client, token, mac).await?;
        addresses.extend(
            bindings
                .into_iter()
                .filter_map(|binding| binding.ip)
                .map(|ip| ip.trim().to_owned())
                .filter(|ip| !ip.is_empty()),
        );
    }

    Ok(addresses)
}
