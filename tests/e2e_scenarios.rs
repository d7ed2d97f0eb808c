//! End-to-end scenarios against the mock link: full operation flows from
//! the call surface down to the bytes on the wire and back up through the
//! notification path.

use std::time::Duration;

use h103_rs::protocol::record::{AllParamRecord, TagObservation, TagOperation};
use h103_rs::{
    CommandAck, DeviceRecord, InventoryState, MockLink, MockLinkHandle, ReaderError,
    ReaderEvent, ReaderHandle, Region, SetAllParams,
};
use tokio::sync::mpsc::UnboundedReceiver;

const ADDR: &str = "AA:BB:CC:DD:EE:FF";
const FLASH_ACK: [u8; 7] = [0xCF, 0xFF, 0x00, 0x79, 0x00, 0xF3, 0x0D];

async fn connected_reader() -> (
    ReaderHandle<MockLink>,
    MockLinkHandle,
    UnboundedReceiver<ReaderEvent>,
) {
    let link = MockLink::new();
    let mock = link.handle();
    let (reader, mut events) = ReaderHandle::new(link);

    reader.start_scan().await.unwrap();
    mock.push_discovered("H103", ADDR, -50);
    tokio::time::sleep(Duration::from_millis(10)).await;
    reader.connect(ADDR).await.unwrap();

    mock.clear_written();
    while events.try_recv().is_ok() {}
    (reader, mock, events)
}

/// While disconnected a power write fails fast with the not-ready kind.
#[tokio::test(start_paused = true)]
async fn test_set_power_while_disconnected() {
    let link = MockLink::new();
    let (reader, _events) = ReaderHandle::new(link);

    assert_eq!(
        reader.set_output_power(20, true, false, -1).await,
        Err(ReaderError::NotReady)
    );
}

/// Connected with inventory running: the write stops inventory, caches the
/// clamped power, sends the persist frame and resolves once the 0x79 ack
/// arrives.
#[tokio::test(start_paused = true)]
async fn test_set_power_persist_full_flow() {
    let (reader, mock, _events) = connected_reader().await;

    reader.start_inventory().await.unwrap();
    mock.clear_written();

    // Past the stop settle, so the ack lands after the persist is armed
    let responder = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        responder.push_raw(&FLASH_ACK);
    });

    let ack = reader.set_output_power(20, true, false, -1).await.unwrap();
    assert_eq!(ack, CommandAck::FlashSaved);

    // Inventory was stopped for the write and, with resume unset, stays so
    assert_eq!(reader.inventory_state(), InventoryState::Stopped);

    let snapshot = reader.cached_parameters().unwrap();
    assert_eq!(snapshot.power, 20);

    let frames = mock.written_frames();
    assert_eq!(frames[0][3], 0x02); // stop before touching parameters
    assert_eq!(frames[1][3], 0x71); // parameter write
    assert_eq!(frames[1][5], 20); // clamped power on the wire
    assert_eq!(frames[2], FLASH_ACK.to_vec()); // persist frame, exact bytes
}

/// The flash deadline converts a silent reader into a timeout error, and
/// inventory still resumes when requested.
#[tokio::test(start_paused = true)]
async fn test_persist_timeout_still_resumes() {
    let (reader, mock, _events) = connected_reader().await;

    reader.start_inventory().await.unwrap();
    mock.clear_written();

    let result = reader.set_output_power(20, true, true, -1).await;
    assert_eq!(result, Err(ReaderError::Timeout("flash-persist")));
    assert_eq!(reader.inventory_state(), InventoryState::Running);
}

/// Full parameter write-and-persist with defaults, from an empty cache.
#[tokio::test(start_paused = true)]
async fn test_set_all_parameters_from_defaults() {
    let (reader, mock, _events) = connected_reader().await;

    let responder = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        responder.push_raw(&FLASH_ACK);
    });

    let ack = reader
        .set_all_parameters(SetAllParams {
            power: 40, // clamped to 33
            region: 1,
            ..SetAllParams::default()
        })
        .await
        .unwrap();
    assert_eq!(ack, CommandAck::FlashSaved);

    let snapshot = reader.cached_parameters().unwrap();
    assert_eq!(snapshot.power, 33);
    assert_eq!(snapshot.freq.region_id, 0x01);
    assert_eq!(snapshot.q_value, 4);
    assert_eq!(snapshot.session, 0);
}

/// A parameter read refreshes the snapshot wholesale and resolves with the
/// user-visible fields; a later region -1 write leaves the region alone.
#[tokio::test(start_paused = true)]
async fn test_parameter_read_then_partial_write() {
    let (reader, mock, _events) = connected_reader().await;

    let responder = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        responder.push_record(DeviceRecord::AllParams(AllParamRecord {
            power: 26,
            q_value: 6,
            session: 2,
            freq: Region::Fcc.frequency_table(),
        }));
    });

    let config = reader.get_all_parameters().await.unwrap();
    assert_eq!(config.power, 26);
    assert_eq!(config.region, 0x01);
    assert_eq!(config.q_value, 6);
    assert_eq!(config.session, 2);

    reader
        .set_output_power(12, false, false, -1)
        .await
        .unwrap();
    let snapshot = reader.cached_parameters().unwrap();
    assert_eq!(snapshot.power, 12);
    // Region, Q and session ride along unchanged from the cache
    assert_eq!(snapshot.freq.region_id, 0x01);
    assert_eq!(snapshot.q_value, 6);
    assert_eq!(snapshot.session, 2);
}

/// Battery: the call acknowledges the send, the level arrives as an event.
#[tokio::test(start_paused = true)]
async fn test_battery_round_trip() {
    let (reader, mock, mut events) = connected_reader().await;

    assert_eq!(reader.get_battery().await, Ok(CommandAck::Sent));
    assert_eq!(mock.written_commands(), vec![0x90]);

    mock.push_record(DeviceRecord::Battery { level: 73 });
    assert_eq!(
        events.recv().await.unwrap(),
        ReaderEvent::BatteryLevel { level: 73 }
    );
}

/// Single-tag read: EPC bank uses word pointer 2, others word 0; the
/// result comes back on the dedicated event.
#[tokio::test(start_paused = true)]
async fn test_read_single_tag_flow() {
    let (reader, mock, mut events) = connected_reader().await;

    assert_eq!(reader.read_single_tag(1).await, Ok(CommandAck::Sent));
    let frame = mock.written_frames().pop().unwrap();
    assert_eq!(&frame[10..13], &[0x00, 0x02, 6]);

    mock.clear_written();
    assert_eq!(reader.read_single_tag(2).await, Ok(CommandAck::Sent));
    let frame = mock.written_frames().pop().unwrap();
    assert_eq!(&frame[10..13], &[0x00, 0x00, 6]);

    mock.push_record(DeviceRecord::TagOp(TagOperation {
        epc: vec![0xE2, 0x00],
        data: vec![0xBE, 0xEF],
        status: 0,
    }));
    match events.recv().await.unwrap() {
        ReaderEvent::SingleReadResult {
            epc, data, status, ..
        } => {
            assert_eq!(epc, "E200");
            assert_eq!(data, "BEEF");
            assert_eq!(status, 0);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

/// Radar: tracking starts inventory when needed, diverts only the tracked
/// tag to the proximity stream, and stop-tracking stops the radio.
#[tokio::test(start_paused = true)]
async fn test_radar_tracking_flow() {
    let (reader, mock, mut events) = connected_reader().await;

    assert_eq!(
        reader.track_tag("").await,
        Err(ReaderError::InvalidArgument("EPC cannot be empty".into()))
    );

    assert_eq!(reader.track_tag("AABB").await, Ok(CommandAck::RadarStarted));
    assert_eq!(reader.inventory_state(), InventoryState::Running);
    assert_eq!(mock.written_commands(), vec![0x01]);

    mock.push_record(DeviceRecord::Tag(TagObservation {
        epc: vec![0xAA, 0xBB],
        rssi: -47,
        antenna: 1,
    }));
    assert_eq!(
        events.recv().await.unwrap(),
        ReaderEvent::ProximitySignal {
            epc: "AABB".into(),
            rssi: -47
        }
    );

    mock.push_record(DeviceRecord::Tag(TagObservation {
        epc: vec![0xCC, 0xDD],
        rssi: -80,
        antenna: 2,
    }));
    assert!(matches!(
        events.recv().await.unwrap(),
        ReaderEvent::TagObserved { .. }
    ));

    assert_eq!(reader.untrack_tag().await, Ok(CommandAck::RadarStopped));
    assert_eq!(reader.inventory_state(), InventoryState::Stopped);

    // With tracking cleared the tag goes to the general stream again
    mock.push_record(DeviceRecord::Tag(TagObservation {
        epc: vec![0xAA, 0xBB],
        rssi: -50,
        antenna: 1,
    }));
    assert!(matches!(
        events.recv().await.unwrap(),
        ReaderEvent::TagObserved { .. }
    ));
}

/// Tracking while inventory already runs does not restart the radio.
#[tokio::test(start_paused = true)]
async fn test_track_tag_with_inventory_running() {
    let (reader, mock, _events) = connected_reader().await;

    reader.start_inventory().await.unwrap();
    mock.clear_written();

    assert_eq!(reader.track_tag("AABB").await, Ok(CommandAck::RadarStarted));
    assert!(mock.written_commands().is_empty());
}

/// Disconnect clears the cached snapshot and forces inventory stopped.
#[tokio::test(start_paused = true)]
async fn test_disconnect_clears_session() {
    let (reader, mock, mut events) = connected_reader().await;

    let responder = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        responder.push_raw(&FLASH_ACK);
    });
    reader.set_output_power(20, true, false, -1).await.unwrap();
    reader.start_inventory().await.unwrap();

    reader.disconnect().await.unwrap();
    assert!(reader.cached_parameters().is_none());
    assert_eq!(reader.inventory_state(), InventoryState::Stopped);
    assert!(!reader.is_connected().await);

    let mut saw_disconnect = false;
    while let Ok(event) = events.try_recv() {
        saw_disconnect |= event == ReaderEvent::Disconnected;
    }
    assert!(saw_disconnect);
}
