//! Device identity
//!
//! Known vendor/product ids, which framing each speaks, how enumerated HID
//! interfaces pair up into main and debug links, and a two-link device
//! wrapper.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::coordinator::ProtocolCoordinator;
use crate::error::{Result, WireError};
use crate::protocol::ProtocolVersion;
use crate::registry::MessageRegistry;
use crate::transport::ChunkTransport;

/// USB vendor/product pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceId {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

/// An entry of the known-device table
#[derive(Debug, Clone, Copy)]
pub struct KnownDevice {
    pub id: DeviceId,
    pub name: &'static str,
    pub version: ProtocolVersion,
}

pub const KNOWN_DEVICES: &[KnownDevice] = &[
    KnownDevice {
        id: DeviceId::new(0x534c, 0x0001),
        name: "TREZOR",
        version: ProtocolVersion::V1,
    },
    KnownDevice {
        id: DeviceId::new(0x1209, 0x53c0),
        name: "TREZORv2 Bootloader",
        version: ProtocolVersion::V2,
    },
    KnownDevice {
        id: DeviceId::new(0x1209, 0x53c1),
        name: "TREZORv2",
        version: ProtocolVersion::V2,
    },
];

pub fn lookup(vendor_id: u16, product_id: u16) -> Option<&'static KnownDevice> {
    let id = DeviceId::new(vendor_id, product_id);
    KNOWN_DEVICES.iter().find(|d| d.id == id)
}

/// Framing spoken by a device, by vendor/product id
pub fn protocol_for(vendor_id: u16, product_id: u16) -> Result<ProtocolVersion> {
    lookup(vendor_id, product_id)
        .map(|d| d.version)
        .ok_or(WireError::UnknownDevice {
            vendor_id,
            product_id,
        })
}

// =============================================================================
// Interface pairing
// =============================================================================

pub const MAIN_USAGE_PAGE: u16 = 0xFF00;
pub const DEBUG_USAGE_PAGE: u16 = 0xFF01;

/// Which logical channel an interface carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Main,
    Debug,
}

/// What enumeration reports about one HID interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: String,
    pub interface_number: i32,
    pub usage_page: u16,
}

impl InterfaceInfo {
    /// Usage page decides first, interface number second
    pub fn link_kind(&self) -> Option<LinkKind> {
        if self.usage_page == MAIN_USAGE_PAGE || self.interface_number == 0 {
            Some(LinkKind::Main)
        } else if self.usage_page == DEBUG_USAGE_PAGE || self.interface_number == 1 {
            Some(LinkKind::Debug)
        } else {
            None
        }
    }
}

/// Interface paths of one physical device
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct DevicePaths {
    pub main: Option<String>,
    pub debug: Option<String>,
}

/// Group known-device interfaces by serial number into main/debug pairs
pub fn pair_interfaces<I>(interfaces: I) -> Vec<DevicePaths>
where
    I: IntoIterator<Item = InterfaceInfo>,
{
    let mut devices: BTreeMap<String, DevicePaths> = BTreeMap::new();

    for info in interfaces {
        if lookup(info.vendor_id, info.product_id).is_none() {
            continue;
        }
        let Some(kind) = info.link_kind() else {
            continue;
        };

        let entry = devices.entry(info.serial_number.clone()).or_default();
        match kind {
            LinkKind::Main => entry.main = Some(info.path),
            LinkKind::Debug => entry.debug = Some(info.path),
        }
    }

    let mut paired: Vec<DevicePaths> = devices.into_values().collect();
    paired.sort();
    paired
}

// =============================================================================
// Two-link device
// =============================================================================

/// A device reached over a main link and optionally a debug link
///
/// The links share nothing: each has its own coordinator and session lock.
pub struct Device<M: MessageRegistry, D: MessageRegistry> {
    main: ProtocolCoordinator<M>,
    debug: Option<ProtocolCoordinator<D>>,
}

impl<M: MessageRegistry, D: MessageRegistry> Device<M, D> {
    pub fn new(main: ProtocolCoordinator<M>, debug: Option<ProtocolCoordinator<D>>) -> Self {
        Self { main, debug }
    }

    /// Open both links with the same framing
    pub fn open<T, U>(
        version: ProtocolVersion,
        main: (T, M),
        debug: Option<(U, D)>,
        config: &Config,
    ) -> Result<Self>
    where
        T: ChunkTransport + 'static,
        U: ChunkTransport + 'static,
    {
        let (transport, registry) = main;
        let main = ProtocolCoordinator::with_version(transport, version, registry, config)?;
        let debug = debug
            .map(|(transport, registry)| {
                ProtocolCoordinator::with_version(transport, version, registry, config)
            })
            .transpose()?;
        Ok(Self { main, debug })
    }

    pub fn main(&mut self) -> &mut ProtocolCoordinator<M> {
        &mut self.main
    }

    /// Debug link, failing if the device was opened without one
    pub fn debug(&mut self) -> Result<&mut ProtocolCoordinator<D>> {
        self.debug
            .as_mut()
            .ok_or_else(|| WireError::ProtocolState("device has no debug link".into()))
    }

    pub fn has_debug_link(&self) -> bool {
        self.debug.is_some()
    }

    pub fn write(&mut self, message: &M::Message) -> Result<()> {
        self.main.write(message)
    }

    pub fn read(&mut self) -> Result<Option<M::Message>> {
        self.main.read()
    }

    pub fn write_debug(&mut self, message: &D::Message) -> Result<()> {
        self.debug()?.write(message)
    }

    pub fn read_debug(&mut self) -> Result<Option<D::Message>> {
        self.debug()?.read()
    }

    pub fn close(&mut self) -> Result<()> {
        self.main.close()?;
        if let Some(debug) = self.debug.as_mut() {
            debug.close()?;
        }
        Ok(())
    }
}
