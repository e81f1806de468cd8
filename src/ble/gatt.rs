//! GATT server: Battery, Device Information and HID services.
//!
//! Every characteristic requires an encrypted link (Just Works), so a host
//! has to pair before it can read the Report Map or subscribe to reports.

use defmt::{debug, info, warn};
use nrf_softdevice::raw;

use crate::config;
use crate::error::{BleError, Error};
use crate::session::{ControlPoint, GamepadEvent, ProtocolMode};

/// Report Map length for the layout this build advertises.
pub const REPORT_MAP_LEN: usize = config::REPORT_LAYOUT.descriptor().len();

const REPORT_MAP: [u8; REPORT_MAP_LEN] = to_array(config::REPORT_LAYOUT.descriptor());

/// Report Reference: report ID, report type (1 = input).
const INPUT_REPORT_REFERENCE: [u8; 2] = [config::HID_REPORT_ID, 0x01];

const HID_INFORMATION: [u8; 4] = [
    config::HID_VERSION.to_le_bytes()[0],
    config::HID_VERSION.to_le_bytes()[1],
    0x00, // country code
    config::HID_INFO_FLAGS,
];

const PROTOCOL_MODE_REPORT: [u8; 1] = [ProtocolMode::Report as u8];

const MANUFACTURER_LEN: usize = config::MANUFACTURER_NAME.len();
const MODEL_LEN: usize = config::MODEL_NUMBER.len();
const FIRMWARE_LEN: usize = config::FIRMWARE_REVISION.len();

const MANUFACTURER: [u8; MANUFACTURER_LEN] = to_array(config::MANUFACTURER_NAME.as_bytes());
const MODEL: [u8; MODEL_LEN] = to_array(config::MODEL_NUMBER.as_bytes());
const FIRMWARE: [u8; FIRMWARE_LEN] = to_array(config::FIRMWARE_REVISION.as_bytes());

const PNP_ID: [u8; 7] = [
    config::PNP_VENDOR_ID_SOURCE,
    config::PNP_VENDOR_ID.to_le_bytes()[0],
    config::PNP_VENDOR_ID.to_le_bytes()[1],
    config::PNP_PRODUCT_ID.to_le_bytes()[0],
    config::PNP_PRODUCT_ID.to_le_bytes()[1],
    config::PNP_PRODUCT_VERSION.to_le_bytes()[0],
    config::PNP_PRODUCT_VERSION.to_le_bytes()[1],
];

const fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let mut i = 0;
    while i < N {
        out[i] = bytes[i];
        i += 1;
    }
    out
}

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    #[characteristic(uuid = "2a19", security = "justworks", read, notify)]
    pub battery_level: u8,
}

#[nrf_softdevice::gatt_service(uuid = "180a")]
pub struct DeviceInformationService {
    #[characteristic(uuid = "2a29", security = "justworks", read, value = "MANUFACTURER")]
    pub manufacturer_name: [u8; MANUFACTURER_LEN],
    #[characteristic(uuid = "2a24", security = "justworks", read, value = "MODEL")]
    pub model_number: [u8; MODEL_LEN],
    #[characteristic(uuid = "2a26", security = "justworks", read, value = "FIRMWARE")]
    pub firmware_revision: [u8; FIRMWARE_LEN],
    #[characteristic(uuid = "2a50", security = "justworks", read, value = "PNP_ID")]
    pub pnp_id: [u8; 7],
}

#[nrf_softdevice::gatt_service(uuid = "1812")]
pub struct HidService {
    #[characteristic(
        uuid = "2a4d",
        security = "justworks",
        read,
        notify,
        descriptor(uuid = "2908", security = "justworks", value = "INPUT_REPORT_REFERENCE")
    )]
    pub input_report: [u8; config::REPORT_LEN],
    #[characteristic(uuid = "2a4b", security = "justworks", read, value = "REPORT_MAP")]
    pub report_map: [u8; REPORT_MAP_LEN],
    #[characteristic(uuid = "2a4a", security = "justworks", read, value = "HID_INFORMATION")]
    pub hid_information: [u8; 4],
    #[characteristic(uuid = "2a4c", security = "justworks", write_without_response)]
    pub control_point: u8,
    #[characteristic(
        uuid = "2a4e",
        security = "justworks",
        read,
        write_without_response,
        value = "PROTOCOL_MODE_REPORT"
    )]
    pub protocol_mode: u8,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub bas: BatteryService,
    pub dis: DeviceInformationService,
    pub hid: HidService,
}

/// Write runtime values into the attribute table.
pub fn init_values(server: &Server) -> Result<(), Error> {
    server
        .bas
        .battery_level_set(&config::BATTERY_LEVEL)
        .map_err(|_| BleError::SetValueFailed)?;
    Ok(())
}

/// Current Input Report CCCD value on connection `conn_handle`.
///
/// Fails with [`BleError::Raw`] while the connection's system attributes
/// have not been set.
pub fn input_report_cccd(server: &Server, conn_handle: u16) -> Result<u16, Error> {
    let mut buf = [0u8; 2];
    let mut value = raw::ble_gatts_value_t {
        len: buf.len() as u16,
        offset: 0,
        p_value: buf.as_mut_ptr(),
    };
    let ret = unsafe {
        raw::sd_ble_gatts_value_get(conn_handle, server.hid.input_report_cccd_handle, &mut value)
    };
    if ret != raw::NRF_SUCCESS {
        return Err(BleError::Raw(ret).into());
    }
    Ok(u16::from_le_bytes(buf))
}

/// Map a GATT write to a session event.
///
/// Writes the session does not care about (battery CCCD, out-of-range
/// values) are logged and dropped.
pub fn translate(event: ServerEvent, conn_handle: u16) -> Option<GamepadEvent> {
    match event {
        ServerEvent::Bas(e) => match e {
            BatteryServiceEvent::BatteryLevelCccdWrite { notifications } => {
                info!("battery notifications: {}", notifications);
                None
            }
        },
        ServerEvent::Dis(e) => match e {},
        ServerEvent::Hid(e) => match e {
            HidServiceEvent::InputReportCccdWrite { notifications } => {
                info!("input report notifications: {}", notifications);
                Some(GamepadEvent::InputReportEnable {
                    handle: conn_handle,
                    enabled: notifications,
                })
            }
            HidServiceEvent::ControlPointWrite(value) => match ControlPoint::from_u8(value) {
                Some(cmd) => {
                    debug!("control point: {}", cmd);
                    Some(GamepadEvent::ControlPoint(cmd))
                }
                None => {
                    warn!("unknown control point value {}", value);
                    None
                }
            },
            HidServiceEvent::ProtocolModeWrite(value) => match ProtocolMode::from_u8(value) {
                Some(mode) => {
                    info!("protocol mode: {}", mode);
                    Some(GamepadEvent::ProtocolMode(mode))
                }
                None => {
                    warn!("invalid protocol mode {}", value);
                    None
                }
            },
        },
    }
}
