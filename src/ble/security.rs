//! Pairing and bonding.
//!
//! The gamepad has no display or keyboard, so pairing is Just Works. Keys
//! and GATT system attributes of bonded hosts live in a [`BondStore`];
//! every change wakes [`persist_bonds`], which writes the store to flash.
//! Restoring a bonded host's attributes brings back its CCCDs without any
//! CCCD write, so [`Bonder::wait_restored`] tells the connection about it.

use core::cell::RefCell;

use defmt::{debug, info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_storage_async::nor_flash::NorFlash;
use nrf_softdevice::ble::gatt_server;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{
    Address, AddressType, Connection, EncryptionInfo, IdentityKey, IdentityResolutionKey,
    MasterId, SecurityMode,
};
use nrf_softdevice::raw;
use static_cell::StaticCell;

use crate::config::SYS_ATTRS_MAX;
use crate::error::{BleError, Error};
use crate::storage::{flash, BondMasterId, BondRecord, BondStore};

pub struct Bonder {
    store: RefCell<BondStore>,
    persist: Signal<CriticalSectionRawMutex, ()>,
    restored: Signal<CriticalSectionRawMutex, ()>,
}

impl Bonder {
    fn new() -> Self {
        Self {
            store: RefCell::new(BondStore::new()),
            persist: Signal::new(),
            restored: Signal::new(),
        }
    }

    /// Restore bonds saved by a previous run.
    pub async fn load(&self, flash: &mut impl NorFlash) {
        let mut store = BondStore::new();
        if flash::load_from_flash(&mut store, flash).await.is_err() {
            warn!("starting without stored bonds");
        }
        *self.store.borrow_mut() = store;
    }

    /// Resolves after stored system attributes were applied to a connection.
    pub async fn wait_restored(&self) {
        self.restored.wait().await
    }

    fn request_persist(&self) {
        self.persist.signal(());
    }

    fn store_sys_attrs(&self, conn: &Connection) -> Result<(), Error> {
        let Some(bond) = self.find_for_peer(conn.peer_address()) else {
            return Ok(());
        };

        let mut buf = [0u8; SYS_ATTRS_MAX];
        let len = gatt_server::get_sys_attrs(conn, &mut buf).map_err(|e| {
            debug!("get_sys_attrs: {:?}", e);
            BleError::SysAttrsFailed
        })?;

        let dirty = {
            let mut store = self.store.borrow_mut();
            store.update_sys_attrs(&bond.peer_addr, &buf[..len]);
            store.is_dirty()
        };
        if dirty {
            self.request_persist();
        }
        Ok(())
    }

    /// Apply stored attributes, or defaults for an unknown host. Returns
    /// whether stored attributes were applied.
    fn restore_sys_attrs(&self, conn: &Connection) -> Result<bool, Error> {
        let bond = self.find_for_peer(conn.peer_address());
        let attrs = bond
            .as_ref()
            .map(|b| b.sys_attrs.as_slice())
            .filter(|a| !a.is_empty());

        gatt_server::set_sys_attrs(conn, attrs).map_err(|e| {
            debug!("set_sys_attrs: {:?}", e);
            BleError::SysAttrsFailed
        })?;
        Ok(attrs.is_some())
    }

    fn find_for_peer(&self, addr: Address) -> Option<BondRecord> {
        self.store
            .borrow()
            .iter()
            .find(|b| identity_key(b).is_match(addr))
            .cloned()
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::None
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        // With no IO the SoftDevice runs Just Works; accept it.
        true
    }

    fn display_passkey(&self, passkey: &[u8; 6]) {
        // Never asked for with no IO; log it in case a host forces it.
        info!("passkey: {:a}", passkey);
    }

    fn on_bonded(
        &self,
        conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        let record = BondRecord {
            master_id: BondMasterId {
                ediv: master_id.ediv,
                rand: master_id.rand,
            },
            ltk: key.ltk,
            ltk_flags: key.flags,
            irk: peer_id.irk.as_raw().irk,
            peer_addr_type: address_type_to_u8(peer_id.addr.address_type()),
            peer_addr: peer_id.addr.bytes(),
            sys_attrs: heapless::Vec::new(),
        };
        info!("bonded with {:?}", conn.peer_address());

        if let Some(evicted) = self.store.borrow_mut().upsert(record) {
            warn!("bond store full - evicted {:?}", evicted.peer_addr);
        }
        self.request_persist();
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        let id = BondMasterId {
            ediv: master_id.ediv,
            rand: master_id.rand,
        };
        self.store
            .borrow()
            .find_by_master_id(&id)
            .map(|b| EncryptionInfo {
                ltk: b.ltk,
                flags: b.ltk_flags,
            })
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("BLE security mode updated: {}", mode);
    }

    fn save_sys_attrs(&self, conn: &Connection) {
        if let Err(e) = self.store_sys_attrs(conn) {
            warn!("saving system attributes failed: {:?}", e);
        }
    }

    fn load_sys_attrs(&self, conn: &Connection) {
        match self.restore_sys_attrs(conn) {
            Ok(true) => self.restored.signal(()),
            Ok(false) => {}
            Err(e) => warn!("restoring system attributes failed: {:?}", e),
        }
    }
}

/// Write the bond store to flash whenever the bonder reports a change.
pub async fn persist_bonds(bonder: &Bonder, flash: &mut impl NorFlash) -> ! {
    loop {
        bonder.persist.wait().await;

        // Snapshot so no borrow is held across the flash write.
        let mut snapshot = {
            let mut store = bonder.store.borrow_mut();
            let snapshot = store.clone();
            store.mark_clean();
            snapshot
        };
        if flash::save_to_flash(&mut snapshot, flash).await.is_err() {
            bonder.store.borrow_mut().mark_dirty();
        }
    }
}

pub fn bonder() -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder::new())
}

fn identity_key(bond: &BondRecord) -> IdentityKey {
    IdentityKey {
        irk: IdentityResolutionKey::from_raw(raw::ble_gap_irk_t { irk: bond.irk }),
        addr: Address::new(address_type_from_u8(bond.peer_addr_type), bond.peer_addr),
    }
}

fn address_type_to_u8(ty: AddressType) -> u8 {
    match ty {
        AddressType::Public => 0,
        AddressType::RandomStatic => 1,
        AddressType::RandomPrivateResolvable => 2,
        AddressType::RandomPrivateNonResolvable => 3,
        AddressType::Anonymous => 4,
    }
}

fn address_type_from_u8(value: u8) -> AddressType {
    match value {
        0 => AddressType::Public,
        1 => AddressType::RandomStatic,
        2 => AddressType::RandomPrivateResolvable,
        3 => AddressType::RandomPrivateNonResolvable,
        4 => AddressType::Anonymous,
        _ => AddressType::RandomStatic,
    }
}
