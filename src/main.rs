//! Firmware entry point: nRF52840 + SoftDevice S140.
//!
//! Brings up the HAL and the SoftDevice, registers the GATT server, loads
//! bonds from flash and hands control to the advertise / serve loop. Any
//! failure before the first advertisement is fatal.

#![no_std]
#![no_main]

use core::mem;

use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_nrf::interrupt::Priority;
use nrf_softdevice::{raw, Flash, Softdevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use bt_gamepad::ble::adv_data::{self, ADV_DATA};
use bt_gamepad::ble::gatt::{self, Server};
use bt_gamepad::ble::peripheral;
use bt_gamepad::ble::security::{self, Bonder};
use bt_gamepad::config;
use bt_gamepad::error::Error;

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn bond_storage_task(bonder: &'static Bonder, mut flash: Flash) -> ! {
    security::persist_bonds(bonder, &mut flash).await
}

#[embassy_executor::task]
async fn gamepad_task(sd: &'static Softdevice, server: &'static Server, bonder: &'static Bonder) -> ! {
    peripheral::run(sd, server, bonder).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("bt-gamepad {} starting", config::FIRMWARE_REVISION);

    // SoftDevice reserves priorities 0, 1 and 4.
    let mut hal_config = embassy_nrf::config::Config::default();
    hal_config.gpiote_interrupt_priority = Priority::P2;
    hal_config.time_interrupt_priority = Priority::P2;
    let _p = embassy_nrf::init(hal_config);

    let layout = config::REPORT_LAYOUT;
    let desc = unwrap!(layout.check_descriptor());
    info!(
        "report layout {}: {} byte input report, {} fields",
        layout,
        desc.input_report_len(),
        desc.fields.len()
    );
    unwrap!(adv_data::check_adv_data(&ADV_DATA));

    let sd_config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: config::ATT_MTU,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: config::DEVICE_NAME.as_ptr() as _,
            current_len: config::DEVICE_NAME.len() as u16,
            max_len: config::DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&sd_config);

    static SERVER: StaticCell<Server> = StaticCell::new();
    let registered = Server::new(sd).map_err(|_| Error::GattRegister);
    let server: &'static Server = SERVER.init(unwrap!(registered));
    unwrap!(gatt::init_values(server));

    let ret = unsafe { raw::sd_ble_gap_appearance_set(config::APPEARANCE_GAMEPAD) };
    if ret != raw::NRF_SUCCESS {
        warn!("sd_ble_gap_appearance_set failed: {}", ret);
    }

    unwrap!(spawner.spawn(softdevice_task(sd)));

    let bonder = security::bonder();
    let mut flash = Flash::take(sd);
    bonder.load(&mut flash).await;

    unwrap!(spawner.spawn(bond_storage_task(bonder, flash)));
    unwrap!(spawner.spawn(gamepad_task(sd, server, bonder)));
}
