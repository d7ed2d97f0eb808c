//! # Notification Dispatch
//!
//! One task per session drains the link's event channel and routes each
//! arrival: raw status acknowledgements feed the correlator and the
//! inventory state, decoded records feed the correlator or the outward
//! event streams. A routing failure is surfaced as a read-error event and
//! never tears the session down.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ReaderError;
use crate::link::transport::LinkEvent;
use crate::protocol::frame::{classify_status_frame, StatusFrame};
use crate::protocol::params::{clamp_power, ParameterSnapshot};
use crate::protocol::record::{DeviceRecord, TagObservation};
use crate::reader::event::ReaderEvent;
use crate::reader::session::SessionInner;
use crate::util::{encode_hex_upper, now_millis};

/// Spawn the dispatch task for a session. The task lives for as long as
/// the link keeps its sender half; an unsolicited disconnect is processed
/// in-stream so pendings fail instead of hanging.
pub(crate) fn spawn_dispatch(
    session: Arc<SessionInner>,
    mut events: mpsc::UnboundedReceiver<LinkEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                LinkEvent::DeviceDiscovered {
                    name,
                    address,
                    rssi,
                } => {
                    if session.record_discovery(&address, &name) {
                        session.emit(ReaderEvent::DeviceDiscovered {
                            name,
                            address,
                            rssi,
                        });
                    }
                }
                LinkEvent::ScanFailed { code } => {
                    session.emit(ReaderEvent::ScanError {
                        message: format!("Scan error: {code}"),
                    });
                }
                LinkEvent::Raw(bytes) => handle_raw_frame(&session, &bytes),
                LinkEvent::Record(record) => {
                    if let Err(error) = route_record(&session, record) {
                        warn!("failed to route notification record: {error}");
                        session.emit(ReaderEvent::ReadError {
                            message: error.to_string(),
                        });
                    }
                }
                LinkEvent::Disconnected => {
                    session.teardown(ReaderError::Disconnected);
                    session.emit(ReaderEvent::Disconnected);
                }
            }
        }
        debug!("link event channel closed, dispatch task exiting");
    })
}

/// Raw acknowledgement path: only status frames matter here, everything
/// else belongs to the decoded-record path.
fn handle_raw_frame(session: &SessionInner, bytes: &[u8]) {
    match classify_status_frame(bytes) {
        Some(StatusFrame::FlashAck) => {
            debug!("flash persist acknowledged");
            session.pending.flash.resolve(());
        }
        Some(StatusFrame::InventoryStartAck { ok }) => {
            session.apply_start_ack(ok);
        }
        Some(StatusFrame::InventoryStopAck { status }) => {
            debug!("inventory stop ack, status 0x{status:02X}");
            session.apply_stop_ack();
        }
        None => {
            debug!("raw notification is not a status frame ({} bytes)", bytes.len());
        }
    }
}

/// Rich-record path: resolve pendings, refresh the snapshot, or emit to
/// the tag / proximity / single-read streams.
fn route_record(session: &SessionInner, record: DeviceRecord) -> Result<(), ReaderError> {
    match record {
        DeviceRecord::Battery { level } => {
            session.pending.battery.resolve(level);
        }
        DeviceRecord::AllParams(params) => {
            let snapshot = ParameterSnapshot {
                power: clamp_power(i32::from(params.power)),
                q_value: params.q_value,
                session: params.session,
                freq: params.freq,
            };
            let config = snapshot.config();
            *session.snapshot.lock().unwrap() = Some(snapshot);
            session.pending.all_params.resolve(config);
        }
        DeviceRecord::Tag(tag) => route_tag_observation(session, &tag, true),
        DeviceRecord::TagOp(op) => {
            let epc = encode_hex_upper(&op.epc);
            let data = encode_hex_upper(&op.data);
            if epc.is_empty() && data.is_empty() {
                return Err(ReaderError::Unexpected(
                    "single-read result carried neither EPC nor data".into(),
                ));
            }
            session.emit(ReaderEvent::SingleReadResult {
                epc: if epc.is_empty() { "<empty>".into() } else { epc },
                data,
                status: op.status,
                timestamp: now_millis(),
            });
        }
        DeviceRecord::Unrecognized { category, tag } => match tag {
            // Some firmware delivers tag observations under odd category
            // codes; route those to the general stream.
            Some(tag) if !tag.epc.is_empty() => {
                debug!("tag observation under unrecognized category 0x{category:02X}");
                route_tag_observation(session, &tag, false);
            }
            _ => {
                debug!("dropping unrecognized record, category 0x{category:02X}");
            }
        },
    }
    Ok(())
}

fn route_tag_observation(session: &SessionInner, tag: &TagObservation, radar_eligible: bool) {
    if tag.epc.is_empty() {
        return;
    }
    let epc = encode_hex_upper(&tag.epc);

    if radar_eligible && session.radar_matches(&epc) {
        session.emit(ReaderEvent::ProximitySignal {
            epc,
            rssi: tag.rssi,
        });
    } else {
        session.emit(ReaderEvent::TagObserved {
            epc,
            rssi: tag.rssi,
            antenna: tag.antenna,
            timestamp: now_millis(),
        });
    }
}
