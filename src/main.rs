use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use h103_rs::{
    build_save_flash_cmd, classify_status_frame, crc16, init_logger, log_info,
    protocol::record::{AllParamRecord, TagObservation},
    DeviceRecord, MockLink, ReaderHandle, Region,
};

#[derive(Parser)]
#[command(name = "h103")]
#[command(about = "CLI tool for the H103 RFID reader protocol")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the frame checksum over hex bytes
    Crc { hex: String },
    /// Print the flash-persist frame the reader expects
    PersistFrame,
    /// Classify a raw notification frame given as hex
    Classify { hex: String },
    /// Run a scripted session against the in-memory mock link
    Simulate,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Crc { hex } => {
            let bytes = h103_rs::util::decode_hex(&hex).map_err(|e| anyhow!("{e}"))?;
            let crc = crc16(&bytes, bytes.len());
            println!("{crc:04X}");
        }
        Commands::PersistFrame => {
            println!("{}", h103_rs::util::encode_hex_upper(&build_save_flash_cmd()));
        }
        Commands::Classify { hex } => {
            let bytes = h103_rs::util::decode_hex(&hex).map_err(|e| anyhow!("{e}"))?;
            match classify_status_frame(&bytes) {
                Some(frame) => println!("{frame:?}"),
                None => println!("not a status frame"),
            }
        }
        Commands::Simulate => simulate().await?,
    }

    Ok(())
}

/// Drive a full scripted session against the mock link and print every
/// outward event as a JSON line.
async fn simulate() -> Result<()> {
    let link = MockLink::new();
    let mock = link.handle();
    let (reader, mut events) = ReaderHandle::new(link);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("event serialization failed: {e}"),
            }
        }
    });

    reader.start_scan().await?;
    mock.push_discovered("H103-Reader", "AA:BB:CC:DD:EE:FF", -48);
    tokio::time::sleep(Duration::from_millis(50)).await;

    reader.connect("AA:BB:CC:DD:EE:FF").await?;
    log_info("connected to simulated reader");

    // Battery: answer the request from the "device" side
    reader.get_battery().await?;
    mock.push_record(DeviceRecord::Battery { level: 87 });

    // Parameter read
    let responder = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        responder.push_record(DeviceRecord::AllParams(AllParamRecord {
            power: 17,
            q_value: 4,
            session: 0,
            freq: Region::Etsi.frequency_table(),
        }));
    });
    let config = reader.get_all_parameters().await?;
    log_info(&format!("device config: {config:?}"));

    // Power write with persist: the ack frame releases the call
    let responder = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        responder.push_raw(&build_save_flash_cmd());
    });
    let ack = reader.set_output_power(20, true, false, -1).await?;
    log_info(&format!("power write: {ack:?}"));

    // Inventory with a few observations, one of them radar-tracked
    reader.start_inventory().await?;
    mock.push_raw(&[0xCF, 0xFF, 0x00, 0x01, 0x01, 0x00]); // start ack OK
    for (epc, rssi) in [(vec![0xE2, 0x00, 0x34, 0x12], -51), (vec![0xAA, 0xBB], -62)] {
        mock.push_record(DeviceRecord::Tag(TagObservation {
            epc,
            rssi,
            antenna: 1,
        }));
    }
    reader.track_tag("AABB").await?;
    mock.push_record(DeviceRecord::Tag(TagObservation {
        epc: vec![0xAA, 0xBB],
        rssi: -58,
        antenna: 1,
    }));
    tokio::time::sleep(Duration::from_millis(50)).await;

    reader.untrack_tag().await?;
    reader.stop_inventory().await?;
    reader.disconnect().await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();
    Ok(())
}
