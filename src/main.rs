use std::time::Duration;

use hapdb::chr;
use hapdb::svc;
use hapdb::AidRequest;
use hapdb::AttributeDb;
use hapdb::CharSpec;
use hapdb::DbConfig;
use hapdb::Result;
use hapdb::ServiceSpec;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    init_observability();

    let config = DbConfig::new()?.validate()?;
    let poll_interval = Duration::from_millis(config.database.poll_interval_ms);
    info!(?config, "Configuration loaded");

    let mut db = AttributeDb::open(config)?;
    register_demo_accessory(&mut db)?;
    let record = db.finalize()?;
    info!(
        version = record.version,
        hash = %record.hash_hex(),
        "Serving attribute database"
    );

    // Initializing Shutdown Signal
    let (graceful_tx, mut graceful_rx) = watch::channel(());
    tokio::spawn(async move {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for (observer, payload) in db.poll() {
                    debug!(%observer, bytes = payload.len(), "Notification ready");
                }
            }
            _ = graceful_rx.changed() => {
                info!("Poll loop stopped");
                break;
            }
        }
    }

    println!("Exiting program.");
    Ok(())
}

/// Information service plus a light bulb whose on/off state survives restarts.
fn register_demo_accessory(db: &mut AttributeDb) -> Result<()> {
    let aid = db.add_accessory(AidRequest::Exact(1))?;
    let info = db.add_service(aid, ServiceSpec::of(svc::ACCESSORY_INFORMATION)?)?;
    db.add_characteristic(info, CharSpec::of(chr::IDENTIFY)?)?;
    db.add_characteristic(info, CharSpec::of(chr::NAME)?.value("Demo Light"))?;
    db.add_characteristic(info, CharSpec::of(chr::MANUFACTURER)?)?;
    db.add_characteristic(info, CharSpec::of(chr::MODEL)?)?;
    db.add_characteristic(info, CharSpec::of(chr::SERIAL_NUMBER)?)?;
    db.add_characteristic(info, CharSpec::of(chr::FIRMWARE_REVISION)?)?;

    let light = db.add_service(
        aid,
        ServiceSpec::of(svc::LIGHT_BULB)?
            .primary()
            .on_update(|c| {
                info!(name = c.name(), value = %c.get_pending_value(), "Light updated");
                true
            }),
    )?;
    let on = db.add_characteristic(light, CharSpec::of(chr::ON)?.durable())?;
    db.add_characteristic(light, CharSpec::of(chr::BRIGHTNESS)?.durable())?;
    info!(on = %on.get_value(), "Demo accessory registered");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    if graceful_tx.send(()).is_err() {
        error!("Failed to send shutdown signal: poll loop already gone");
    }
    info!("Shutdown completed");
    Ok(())
}

fn init_observability() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
