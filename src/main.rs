use bridge_light_node::bridge::{BridgeStore, LoggingLink, RemoteId};
use bridge_light_node::config::{Config, load_dotenv};
use bridge_light_node::device::LightDriver;
use bridge_light_node::matter::Node;
use bridge_light_node::matter::clusters::color_control::feature::hue_saturation;
use bridge_light_node::matter::clusters::on_off;
use bridge_light_node::matter::data_model::DriverHandle;
use bridge_light_node::matter::endpoints::{aggregator, color_temperature_light, root_node};
use bridge_light_node::matter::lifecycle::{ChannelObserver, LifecycleEvent, PowerSaveObserver};
use clap::Parser;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

const LIGHT_DRIVER: DriverHandle = DriverHandle(1);

#[derive(Parser)]
#[command(name = "bridge-light-node")]
#[command(about = "Matter light node with a radio device bridge")]
struct Args {
    /// Bridged device store (JSON)
    #[arg(long, env = "BRIDGE_STORE_PATH")]
    store: Option<PathBuf>,

    /// Maximum endpoint count, root endpoint included
    #[arg(long, env = "MAX_ENDPOINTS")]
    max_endpoints: Option<usize>,

    /// Bridge a simulated on/off remote device with this id
    #[arg(long)]
    simulate_remote: Option<String>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // Environment first, while this is still the only thread.
    load_dotenv();
    init_logger();
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start tokio runtime: {}", e);
            return;
        }
    };
    runtime.block_on(run(args));
}

async fn run(args: Args) {
    info!("Starting Bridge Light Node");

    let mut config = Config::from_env();
    if let Some(store) = args.store {
        config.bridge.store_path = store;
    }
    if let Some(max) = args.max_endpoints {
        config.node.max_endpoints = max;
    }
    info!("Configuration loaded:");
    info!("  Node Label: {}", config.node.node_label);
    info!("  Vendor ID: 0x{:04X}", config.node.vendor_id);
    info!("  Product ID: 0x{:04X}", config.node.product_id);
    info!("  Max Endpoints: {}", config.node.max_endpoints);
    info!("  Provisioned: {}", config.node.provisioned);
    info!("  Bridge Store: {:?}", config.bridge.store_path);

    let mut node = Node::new(config.node.max_endpoints);

    // Lifecycle observers. Events are logged by the channel task below.
    let power_save = Arc::new(PowerSaveObserver::new(config.node.provisioned));
    let (channel_observer, mut lifecycle_rx) = ChannelObserver::new();
    node.lifecycle().add_observer(power_save.clone());
    node.lifecycle().add_observer(Arc::new(channel_observer));

    // Construction. A failing endpoint is reported and the rest still serve.
    if let Err(e) = root_node::configure(node.model(), &config.basic_information()) {
        error!("Failed to configure root endpoint: {}", e);
    }

    let driver = Arc::new(LightDriver::new(LIGHT_DRIVER, node.model().clone()));
    let light = match color_temperature_light::create(
        node.model(),
        &config.light_endpoint(),
        Some(LIGHT_DRIVER),
    ) {
        Ok(light) => {
            node.dispatcher().register_hooks(light, driver.clone());
            if let Err(e) = hue_saturation::add(node.model(), light, &config.hue_saturation()) {
                warn!("Hue/saturation not available: {}", e);
            }
            Some(light)
        }
        Err(e) => {
            error!("Failed to create light endpoint: {}", e);
            None
        }
    };

    let aggregator = match aggregator::create(node.model()) {
        Ok(id) => Some(id),
        Err(e) => {
            error!("Failed to create aggregator endpoint: {}", e);
            None
        }
    };

    let store = Arc::new(BridgeStore::new(config.bridge.store_path.clone()));
    let mut registry = node
        .new_bridge(Arc::new(LoggingLink))
        .with_store(store.clone());
    if let Some(aggregator) = aggregator {
        registry = registry.with_parent(aggregator);
    }
    let bridge = node.attach_bridge(registry);

    node.start();

    let report = bridge.resume(store.get_all());
    for (remote, endpoint) in &report.renumbered {
        warn!("Bridged device {} now on endpoint {}", remote, endpoint);
    }

    if let Some(light) = light
        && let Err(e) = driver.set_defaults(light)
    {
        error!("Failed to apply light defaults: {}", e);
    }

    info!("Bridge Light Node is running");
    info!("  - Light endpoint: {:?}", light);
    info!("  - Bridged devices: {}", bridge.len());
    info!("  - Press Ctrl+C to exit");

    let lifecycle = node.lifecycle().clone();
    let lifecycle_task = tokio::spawn(async move {
        while let Some(event) = lifecycle_rx.recv().await {
            let Some(text) = event.describe() else {
                debug!("[Lifecycle] Ignoring stack event {}", event);
                continue;
            };
            let snapshot = lifecycle.snapshot();
            let power_save = if power_save.power_save_disabled() {
                "off"
            } else {
                "on"
            };
            if event == LifecycleEvent::CommissioningFailed {
                warn!("[Lifecycle] {} (power save {})", text, power_save);
            } else {
                info!(
                    "[Lifecycle] {} (state {}, {} event(s), power save {})",
                    text, snapshot.state, snapshot.events_seen, power_save
                );
            }
        }
    });

    // Simulated radio device toggling every 30 seconds
    let simulate_task = args.simulate_remote.map(|id| {
        let bridge = bridge.clone();
        tokio::spawn(async move {
            let remote = RemoteId::new(id);
            let endpoint = match bridge.endpoint_for(&remote) {
                Some(endpoint) => endpoint,
                None => {
                    let joined = {
                        let bridge = bridge.clone();
                        let remote = remote.clone();
                        tokio::task::spawn_blocking(move || {
                            bridge.on_device_joined(
                                remote,
                                vec![on_off::cluster(&on_off::Config::default())],
                            )
                        })
                        .await
                    };
                    match joined {
                        Ok(Ok(endpoint)) => endpoint,
                        Ok(Err(e)) => {
                            error!("Simulated remote {} could not join: {}", remote, e);
                            return;
                        }
                        Err(e) => {
                            error!("Simulated join task failed: {}", e);
                            return;
                        }
                    }
                }
            };

            let mut on = false;
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(30));
            loop {
                interval.tick().await;
                on = !on;
                info!("Simulating write to remote {}...", remote);
                if let Err(e) = bridge.route_write(
                    endpoint,
                    on_off::ID,
                    on_off::attributes::ON_OFF,
                    on.into(),
                ) {
                    warn!("Simulated write failed: {}", e);
                }
            }
        })
    });

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    if let Some(task) = simulate_task {
        task.abort();
    }
    lifecycle_task.abort();

    info!("Bridge Light Node stopped");
}
