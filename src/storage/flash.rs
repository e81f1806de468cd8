//! Bond persistence in internal flash.
//!
//! Uses the nRF52840's internal flash via the `sequential-storage` crate.
//! The serialized [`BondStore`] is one item of a key-value map; pages are
//! managed by `sequential-storage`, which handles wear levelling and GC.

use defmt::{debug, error, info};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;

use super::{BondStore, MAX_STORE_LEN};
use crate::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use crate::error::Error;

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Key of the bond list in the map storage.
const KEY_BONDS: u8 = 0x01;

/// Scratch buffer: key, item header and the largest store, word aligned.
const SCRATCH_LEN: usize = (MAX_STORE_LEN + 16 + 3) & !3;

/// Load bonds from flash into `store`.
///
/// A missing item leaves the store empty. A read error is logged and also
/// leaves the store empty; bonds are then re-created by pairing again.
pub async fn load_from_flash(store: &mut BondStore, flash: &mut impl NorFlash) -> Result<(), Error> {
    let mut buf = [0u8; SCRATCH_LEN];

    match sequential_storage::map::fetch_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &KEY_BONDS,
    )
    .await
    {
        Ok(Some(data)) => {
            store.deserialize_all(data);
            info!("Loaded {} bonds from flash", store.len());
            Ok(())
        }
        Ok(None) => {
            info!("No bonds in flash");
            store.deserialize_all(&[]);
            Ok(())
        }
        Err(e) => {
            error!("Flash read error: {:?}", defmt::Debug2Format(&e));
            store.deserialize_all(&[]);
            Err(Error::Storage)
        }
    }
}

/// Persist `store` to flash if it changed since the last save.
///
/// On error the RAM copy stays dirty so the next save retries.
pub async fn save_to_flash(store: &mut BondStore, flash: &mut impl NorFlash) -> Result<(), Error> {
    if !store.is_dirty() {
        debug!("BondStore: no changes to save");
        return Ok(());
    }

    let mut data = [0u8; MAX_STORE_LEN];
    let len = store.serialize_all(&mut data);
    let item = &data[..len];
    let mut buf = [0u8; SCRATCH_LEN];

    match sequential_storage::map::store_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &KEY_BONDS,
        &item,
    )
    .await
    {
        Ok(()) => {
            info!("Saved {} bonds to flash", store.len());
            store.mark_clean();
            Ok(())
        }
        Err(e) => {
            error!("Flash write error: {:?}", defmt::Debug2Format(&e));
            Err(Error::Storage)
        }
    }
}
