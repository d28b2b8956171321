//! Device Transport Adapter: finds and opens the Ledger over USB HID.
//!
//! HID framing is handled by `ledger-transport-hid`; this module only decides
//! which device to talk to and keeps the open handle for reuse.

use ledger_apdu::APDUCommand;
use ledger_transport_hid::{hidapi::HidApi, TransportNativeHID};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Status word for a successful APDU
pub const SW_OK: u16 = 0x9000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Ledger communication error: {0}")]
    Hid(String),
}

/// Status word and payload of one APDU exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReply {
    pub status: u16,
    pub data: Vec<u8>,
}

impl DeviceReply {
    pub fn is_ok(&self) -> bool {
        self.status == SW_OK
    }
}

/// Anything that can carry an APDU to the device and bring the reply back.
pub trait ApduExchange: Send + Sync {
    fn exchange(&self, command: &APDUCommand<Vec<u8>>) -> Result<DeviceReply, TransportError>;
}

/// An open HID connection to a Ledger.
pub struct HidTransport {
    inner: TransportNativeHID,
}

impl ApduExchange for HidTransport {
    fn exchange(&self, command: &APDUCommand<Vec<u8>>) -> Result<DeviceReply, TransportError> {
        debug!(
            "APDU -> CLA={:02X} INS={:02X} P1={:02X} P2={:02X} len={}",
            command.cla,
            command.ins,
            command.p1,
            command.p2,
            command.data.len()
        );
        match self.inner.exchange(command) {
            Ok(answer) => {
                let reply = DeviceReply {
                    status: answer.retcode(),
                    data: answer.data().to_vec(),
                };
                debug!("APDU <- SW={:04X} len={}", reply.status, reply.data.len());
                Ok(reply)
            }
            Err(e) => {
                // The handle is likely dead (unplugged, sleep); reopen next time
                release_transport();
                Err(TransportError::Hid(e.to_string()))
            }
        }
    }
}

/// Handle of the device opened by this process, if any.
static OPEN_TRANSPORT: OnceLock<Mutex<Option<Arc<HidTransport>>>> = OnceLock::new();

/// Serializes all HID access. Held on the blocking thread for the whole
/// exchange so a call abandoned by a timeout still finishes before the next.
static HID_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn open_slot() -> MutexGuard<'static, Option<Arc<HidTransport>>> {
    OPEN_TRANSPORT
        .get_or_init(|| Mutex::new(None))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Take the process-wide HID lock. Call only from a blocking context.
pub fn hid_lock() -> MutexGuard<'static, ()> {
    HID_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Acquire a transport to the Ledger.
///
/// Reuses the device already open in this process; otherwise opens the first
/// Ledger HID interface; if none is listed, refreshes the device list once and
/// tries again. Returns `None` when no device can be opened.
pub fn acquire_transport() -> Option<Arc<HidTransport>> {
    if let Some(open) = open_slot().as_ref() {
        debug!("Reusing open Ledger transport");
        return Some(Arc::clone(open));
    }

    let mut api = match HidApi::new() {
        Ok(api) => api,
        Err(e) => {
            warn!("Failed to initialize HID: {}", e);
            return None;
        }
    };

    let transport = match open_first_ledger(&api) {
        Some(t) => t,
        None => {
            info!("No Ledger listed, refreshing HID devices...");
            if let Err(e) = api.refresh_devices() {
                warn!("Failed to refresh HID devices: {}", e);
                return None;
            }
            open_first_ledger(&api)?
        }
    };

    let transport = Arc::new(transport);
    *open_slot() = Some(Arc::clone(&transport));
    Some(transport)
}

/// Drop the cached handle so the next acquire reopens the device.
pub fn release_transport() {
    if open_slot().take().is_some() {
        info!("Released Ledger transport");
    }
}

fn open_first_ledger(api: &HidApi) -> Option<HidTransport> {
    // Only the first device is used when several are connected
    let device = TransportNativeHID::list_ledgers(api).next()?;
    info!(
        "Opening Ledger {} (product id {:04X})",
        device.product_string().unwrap_or("Ledger"),
        device.product_id()
    );
    match TransportNativeHID::open_device(api, device) {
        Ok(inner) => Some(HidTransport { inner }),
        Err(e) => {
            warn!("Failed to open Ledger: {}", e);
            None
        }
    }
}
