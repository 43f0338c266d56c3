// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use clap::{CommandFactory, Parser, Subcommand};
use common::{
    identity::DeviceIdentity, permission::StaticPermissionGate, position::LocationSample,
    tracking_state::TrackingStatus,
};
use dirs::data_local_dir;
use document_store::{
    DEFAULT_COLLECTION, RemoteDocumentStore, fs_store::FileSystemDocumentStore,
    http_store::HttpDocumentStore,
};
use location::{
    LocationSource, SourceKind, constant_source::ConstantLocationSource,
    gpsd_source::GpsdLocationSource,
};
use location_sync::{LocationSyncService, SyncConfig};
use module_core::{EventBus, EventKind, Module, ModuleCtx};
use std::{path::PathBuf, str::FromStr, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracking::{TrackingController, persistence::FileTrackingStatePersistence};

const FAKE_VELOCITY: f64 = 10.0;
const FAKE_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address of the gpsd daemon used as high accuracy source, e.g. 127.0.0.1:2947
    #[arg(short = 'd', long)]
    gpsd: Option<String>,
    /// Report a simulated route as coarse source
    #[arg(short, long)]
    gps_fake: bool,
    /// CSV file with `longitude,latitude` rows of the simulated route
    #[arg(short = 'f', long)]
    gps_source_file: Option<String>,
    /// Folder of the file based document store
    #[arg(long)]
    store_dir: Option<PathBuf>,
    /// Base URL of the HTTP document store, takes precedence over --store-dir
    #[arg(long)]
    store_url: Option<String>,
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,
    /// Folder of the persisted tracking state
    #[arg(long)]
    state_dir: Option<PathBuf>,
    /// Overrides the detected device identity
    #[arg(long)]
    device_id: Option<String>,
    /// Treat location permissions as denied
    #[arg(long)]
    deny_permissions: bool,
    /// Time given to pending remote calls before the process exits
    #[arg(long, default_value_t = 1000)]
    shutdown_grace_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start tracking and report positions until Ctrl-C
    Start {
        #[arg(short, long)]
        name: String,
    },
    /// Persist the stopped state
    Stop,
    /// Print the persisted tracking status
    Status,
}

fn read_route_from_file(file_path: &str) -> Result<Vec<LocationSample>, ()> {
    let mut rdr = csv::Reader::from_path(file_path).map_err(|e| {
        error!("Failed to open route file {}. Error: {}", file_path, e);
    })?;
    let mut positions = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| error!("Invalid route record. Error: {}", e))?;
        let (Some(longitude), Some(latitude)) = (record.get(0), record.get(1)) else {
            error!("Route record {:?} needs longitude and latitude", record);
            return Err(());
        };
        let longitude = f64::from_str(longitude.trim())
            .map_err(|e| error!("Invalid longitude {}. Error: {}", longitude, e))?;
        let latitude = f64::from_str(latitude.trim())
            .map_err(|e| error!("Invalid latitude {}. Error: {}", latitude, e))?;
        positions.push(LocationSample::new(latitude, longitude));
    }
    debug!("length of route: {}", positions.len());
    Ok(positions)
}

fn create_sources(cli: &Cli) -> Result<Vec<Arc<dyn LocationSource>>, ()> {
    let mut sources: Vec<Arc<dyn LocationSource>> = Vec::new();
    if let Some(address) = &cli.gpsd {
        let gpsd = GpsdLocationSource::new(address)
            .map_err(|e| error!("Failed to create gpsd source. Error: {}", e))?;
        sources.push(Arc::new(gpsd));
    }
    if cli.gps_fake {
        let Some(source_file) = &cli.gps_source_file else {
            error!("Failed to create simulated source. Error: gps_source_file not set");
            let _ = Cli::command().print_help();
            return Err(());
        };
        let route = read_route_from_file(source_file)?;
        let fake = ConstantLocationSource::new(
            "simulated",
            SourceKind::Coarse,
            &route,
            FAKE_VELOCITY,
            FAKE_INTERVAL,
        )
        .map_err(|e| error!("Failed to create simulated source. Error: {}", e))?;
        sources.push(Arc::new(fake));
    }
    if sources.is_empty() {
        error!("No location source specified. Use --gpsd or --gps-fake");
        let _ = Cli::command().print_help();
        return Err(());
    }
    Ok(sources)
}

fn get_data_dir(sub_dir: &str) -> Result<PathBuf, ()> {
    let mut dir = data_local_dir().ok_or_else(|| {
        error!("Could not determine local data directory");
    })?;
    dir.push("tracker");
    dir.push(sub_dir);
    Ok(dir)
}

fn create_store(cli: &Cli) -> Result<Arc<dyn RemoteDocumentStore>, ()> {
    if let Some(url) = &cli.store_url {
        let store = HttpDocumentStore::new(url, &cli.collection)
            .map_err(|e| error!("Failed to create http document store. Error: {}", e))?;
        return Ok(Arc::new(store));
    }
    let store_dir = match &cli.store_dir {
        Some(dir) => dir.clone(),
        None => get_data_dir("documents")?,
    };
    Ok(Arc::new(FileSystemDocumentStore::new(&store_dir, &cli.collection)))
}

fn create_controller(
    cli: &Cli,
    ctx: ModuleCtx,
    permissions: Arc<StaticPermissionGate>,
) -> Result<TrackingController, ()> {
    let state_dir = match &cli.state_dir {
        Some(dir) => dir.clone(),
        None => get_data_dir("state")?,
    };
    let identity = match &cli.device_id {
        Some(id) => DeviceIdentity::new(id),
        None => DeviceIdentity::detect(),
    };
    info!("Device identity: {}", identity);
    Ok(TrackingController::new(
        ctx,
        identity,
        Arc::new(FileTrackingStatePersistence::new(&state_dir)),
        permissions,
    ))
}

/// Logs user facing events and ends the modules once tracking went offline.
async fn supervise(
    mut ctx: ModuleCtx,
    mut shutdown: mpsc::UnboundedReceiver<()>,
    grace: Duration,
) -> Result<(), ()> {
    loop {
        tokio::select! {
            Some(()) = shutdown.recv() => {
                info!("Shutdown requested, stopping tracking");
                let _ = ctx.publish_event(EventKind::StopTrackingRequestEvent);
            }
            event = ctx.receiver.recv() => {
                match event {
                    Ok(event) => match event.kind {
                        EventKind::UserMessageEvent(message) => info!("{}", message),
                        EventKind::TrackingStatusEvent(status) => {
                            info!("Status: {}", status.label());
                            if *status == TrackingStatus::Offline {
                                tokio::time::sleep(grace).await;
                                let _ = ctx.publish_event(EventKind::QuitEvent);
                                return Ok(());
                            }
                        }
                        _ => (),
                    },
                    Err(e) => warn!("Failed to receive event in supervisor. Error: {e}"),
                }
            }
        }
    }
}

async fn run_tracking(cli: &Cli, name: &str) -> Result<(), ()> {
    let sources = create_sources(cli)?;
    let store = create_store(cli)?;
    let granted = !cli.deny_permissions;
    let permissions = Arc::new(StaticPermissionGate::new(granted, granted));

    let eb = EventBus::default();
    let mut service = LocationSyncService::new(
        eb.context(),
        sources,
        store,
        permissions.clone(),
        SyncConfig::default(),
    );
    let mut controller = create_controller(cli, eb.context(), permissions)?;
    let restored = controller
        .restore()
        .await
        .map_err(|e| error!("Failed to restore tracking state. Error: {}", e))?;
    if restored.is_online() {
        warn!("Previous tracking session was not stopped, resetting it");
        controller
            .stop()
            .await
            .map_err(|e| error!("Failed to reset tracking state. Error: {}", e))?;
    }
    let supervisor_ctx = eb.context();

    let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .map_err(|e| error!("Failed to install Ctrl-C handler. Error: {}", e))?;

    controller
        .start(name)
        .await
        .map_err(|e| error!("Failed to start tracking. Error: {}", e))?;

    info!("Starting modules...");
    let grace = Duration::from_millis(cli.shutdown_grace_ms);
    tokio::join!(
        controller.run(),
        service.run(),
        supervise(supervisor_ctx, shutdown_rx, grace)
    )
    .0
}

async fn print_status(cli: &Cli) -> Result<(), ()> {
    let eb = EventBus::default();
    let mut controller =
        create_controller(cli, eb.context(), Arc::new(StaticPermissionGate::denied()))?;
    let status = controller
        .restore()
        .await
        .map_err(|e| error!("Failed to restore tracking state. Error: {}", e))?;
    println!("{}", status.label());
    if status.is_online() {
        warn!("Positions are only reported while a `start` process is running");
    }
    Ok(())
}

async fn stop_tracking(cli: &Cli) -> Result<(), ()> {
    let eb = EventBus::default();
    let mut controller =
        create_controller(cli, eb.context(), Arc::new(StaticPermissionGate::denied()))?;
    controller
        .restore()
        .await
        .map_err(|e| error!("Failed to restore tracking state. Error: {}", e))?;
    controller
        .stop()
        .await
        .map_err(|e| error!("Failed to stop tracking. Error: {}", e))?;
    println!("{}", controller.status().label());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match &cli.command {
        Command::Start { name } => run_tracking(&cli, name).await,
        Command::Stop => stop_tracking(&cli).await,
        Command::Status => print_status(&cli).await,
    }
}
