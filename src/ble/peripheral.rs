//! Advertise / serve loop.
//!
//! One host at a time: advertise until a host connects, then run the GATT
//! server and the demo timer side by side until the link drops, then
//! advertise again. A bonded host whose Input Report subscription comes back
//! with its stored attributes starts the demo without writing the CCCD.

use core::cell::RefCell;

use defmt::{debug, info, warn};
use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker, Timer};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::Softdevice;

use super::adv_data::{ADV_DATA, SCAN_DATA};
use super::gatt::{self, Server};
use super::security::Bonder;
use crate::config;
use crate::error::{BleError, Error};
use crate::hid::EncodedReport;
use crate::session::{Action, GamepadEvent, Session};

pub async fn run(sd: &'static Softdevice, server: &'static Server, bonder: &'static Bonder) -> ! {
    let adv_config = peripheral::Config {
        interval: config::ADV_INTERVAL,
        ..Default::default()
    };

    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        info!("advertising as \"{}\"", config::DEVICE_NAME);

        let advertised = peripheral::advertise_pairable(sd, adv, &adv_config, bonder)
            .await
            .map_err(|e| {
                debug!("advertise_pairable: {:?}", e);
                Error::from(BleError::AdvertiseFailed)
            });
        let conn = match advertised {
            Ok(conn) => conn,
            Err(e) => {
                warn!("advertising failed: {:?}", e);
                Timer::after(Duration::from_millis(config::ADV_RETRY_MS)).await;
                continue;
            }
        };

        info!("connected to {:?}", conn.peer_address());
        serve(&conn, server, bonder).await;
    }
}

/// Run one connection until it drops.
async fn serve(conn: &Connection, server: &Server, bonder: &Bonder) {
    let Some(handle) = conn.handle() else {
        warn!("connection closed before serving");
        return;
    };

    let session = RefCell::new(Session::new(config::REPORT_LAYOUT));
    let start: Signal<NoopRawMutex, ()> = Signal::new();

    // Attributes may already be restored by the time the link is handed over.
    resume_subscription(server, handle, &session, &start);

    let gatt_fut = gatt_server::run(conn, server, |e| {
        let Some(event) = gatt::translate(e, handle) else {
            return;
        };
        let action = session.borrow_mut().handle(event);
        match action {
            Action::StartDemo => start.signal(()),
            Action::StopDemo => info!("demo stopped"),
            Action::RequestSend => flush(conn, server, &session),
            _ => {}
        }
    });
    let demo_fut = demo_loop(conn, server, &session, &start);
    let restore_fut = async {
        loop {
            bonder.wait_restored().await;
            resume_subscription(server, handle, &session, &start);
        }
    };

    match select3(gatt_fut, demo_fut, restore_fut).await {
        Either3::First(reason) => info!("disconnected: {:?}", reason),
        Either3::Second(()) | Either3::Third(_) => {}
    }

    if session.borrow_mut().handle(GamepadEvent::Disconnected) == Action::StopDemo {
        info!("demo stopped");
    }
}

/// Start the demo if the host's Input Report CCCD already has
/// notifications on.
fn resume_subscription(
    server: &Server,
    handle: u16,
    session: &RefCell<Session>,
    start: &Signal<NoopRawMutex, ()>,
) {
    let cccd = match gatt::input_report_cccd(server, handle) {
        Ok(cccd) => cccd,
        Err(e) => {
            // Expected until the connection's attributes are set.
            debug!("input report CCCD unavailable: {:?}", e);
            return;
        }
    };
    let action = session
        .borrow_mut()
        .handle(GamepadEvent::SubscriptionRestored { handle, cccd });
    if action == Action::StartDemo {
        info!("input report subscription restored");
        start.signal(());
    }
}

/// Wait for a subscription, then send one scripted report per period until
/// the session stops the demo.
async fn demo_loop(
    conn: &Connection,
    server: &Server,
    session: &RefCell<Session>,
    start: &Signal<NoopRawMutex, ()>,
) {
    loop {
        start.wait().await;
        info!("Start gamepad demo");

        // Neutral report queued on subscribe.
        flush(conn, server, session);

        let mut ticker = Ticker::every(Duration::from_millis(config::DEMO_PERIOD_MS));
        loop {
            ticker.next().await;
            let Some(tick) = session.borrow_mut().tick() else {
                break;
            };
            debug!("Demo {}: {}", tick.step, tick.label);
            if tick.action == Action::RequestSend {
                flush(conn, server, session);
            }
        }
    }
}

/// Hand the mailbox to the stack. The SoftDevice queues a notification as
/// soon as it is issued, so a send request is answered right away.
fn flush(conn: &Connection, server: &Server, session: &RefCell<Session>) {
    let action = session.borrow_mut().handle(GamepadEvent::CanSendNow);
    if let Action::Send(report) = action {
        if let Err(e) = send_report(conn, server, &report) {
            warn!("report dropped: {:?}", e);
        }
    }
}

fn send_report(conn: &Connection, server: &Server, report: &EncodedReport) -> Result<(), Error> {
    let value =
        <[u8; config::REPORT_LEN]>::try_from(report.as_bytes()).map_err(|_| Error::ReportLength)?;
    server.hid.input_report_notify(conn, &value).map_err(|e| {
        debug!("notify error: {:?}", e);
        BleError::NotifyFailed
    })?;
    Ok(())
}
