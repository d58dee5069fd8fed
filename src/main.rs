//! devinput - Linux input device inspector
//!
//! Lists and classifies `/dev/input/event*` devices and prints their events.

use dev_input::app::cli::{Cli, Commands, ConfigAction};
use dev_input::app::config::Config;
use dev_input::{CancellationToken, DeviceRecord, EventRecord, KeyboardSignature, Registry};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config (init replaces it, so a broken file must not block it)
    let initializing = matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Init { .. }
        }
    );
    let config = if initializing {
        Config::default()
    } else if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    let registry = config.registry();
    let signature = config.keyboard_signature();

    // Execute command
    match cli.command {
        Commands::List { detailed } => {
            let devices = registry.devices()?;
            print_devices(&devices, detailed, &signature);
        }
        Commands::Keyboards => {
            print_devices(&registry.keyboards(&signature)?, false, &signature);
        }
        Commands::Pointers => {
            print_devices(&registry.pointers()?, false, &signature);
        }
        Commands::Mice => {
            print_devices(&registry.mice()?, false, &signature);
        }
        Commands::Touch => {
            print_devices(&registry.touch_devices()?, false, &signature);
        }
        Commands::Show { id } => {
            run_show(&registry, id, &signature)?;
        }
        Commands::Listen { ids, json, exit_on } => {
            run_listen(&registry, &ids, json, exit_on)?;
        }
        Commands::Config { action } => {
            run_config(action, &config, cli.config)?;
        }
    }

    Ok(())
}

fn print_devices(devices: &[DeviceRecord], detailed: bool, signature: &KeyboardSignature) {
    if devices.is_empty() {
        println!("  (none)");
        return;
    }

    for device in devices {
        println!("  {}  {}", device.path().display(), device.name());
        if detailed {
            let classes: Vec<String> = device
                .classes(signature)
                .iter()
                .map(|c| c.to_string())
                .collect();
            let events: Vec<String> = device
                .capabilities()
                .supported_events()
                .map(|t| t.to_string())
                .collect();
            println!(
                "      classes: {}",
                if classes.is_empty() {
                    "-".to_string()
                } else {
                    classes.join(", ")
                }
            );
            println!("      events:  {}", events.join(" "));
        }
    }
}

fn run_show(registry: &Registry, id: u32, signature: &KeyboardSignature) -> anyhow::Result<()> {
    let device = registry
        .device(id)?
        .ok_or_else(|| anyhow::anyhow!("No input device event{} under {:?}", id, registry.sysfs_root()))?;

    let caps = device.capabilities();
    let classes: Vec<String> = device
        .classes(signature)
        .iter()
        .map(|c| c.to_string())
        .collect();
    let events: Vec<String> = caps.supported_events().map(|t| t.to_string()).collect();
    let keys: Vec<u16> = caps.supported_keys().collect();

    println!("Device event{}", device.id());
    println!("  name:    {}", device.name());
    println!("  node:    {}", device.path().display());
    println!("  sysfs:   {}", device.sysfs_path().display());
    println!("  classes: {}", classes.join(", "));
    println!("  events:  {}", events.join(" "));
    println!(
        "  keys:    {} supported ({}-bit segments)",
        keys.len(),
        caps.keys().segment_width()
    );
    for chunk in keys.chunks(16) {
        let line: Vec<String> = chunk.iter().map(|k| k.to_string()).collect();
        println!("           {}", line.join(" "));
    }

    Ok(())
}

fn run_listen(
    registry: &Registry,
    ids: &[u32],
    json: bool,
    exit_on: Option<u16>,
) -> anyhow::Result<()> {
    let mut devices = Vec::with_capacity(ids.len());
    for &id in ids {
        let device = registry
            .device(id)?
            .ok_or_else(|| anyhow::anyhow!("No input device event{}", id))?;
        devices.push(device);
    }

    // One token stops every device
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })?;

    let mut handles = Vec::with_capacity(devices.len());
    for device in &devices {
        let id = device.id();
        let stop_token = token.clone();
        let handle = device.start_streaming(&token, move |event| {
            print_event(id, &event, json);
            if let Some(code) = exit_on {
                if event.is_key() && event.code == code && event.value == 1 {
                    stop_token.cancel();
                }
            }
        })?;
        info!("Listening to {} ({})", device.path().display(), device.name());
        handles.push(handle);
    }

    info!("Press Ctrl+C to stop");

    let mut failures = 0;
    for handle in handles {
        let path = handle.path().to_path_buf();
        let termination = handle.join();
        match termination.error() {
            Some(e) => {
                error!("{}: {}", path.display(), e);
                failures += 1;
            }
            None if termination.is_stream_end() => {
                warn!("{}: device went away", path.display());
            }
            None => info!("{}: {}", path.display(), termination),
        }
    }

    if failures > 0 {
        anyhow::bail!("{} device(s) failed", failures);
    }
    Ok(())
}

fn print_event(device: u32, event: &EventRecord, json: bool) {
    let time = format_timestamp(event);
    if json {
        let line = serde_json::json!({
            "device": device,
            "time": time,
            "sec": event.sec,
            "usec": event.usec,
            "type": event.event_type,
            "type_name": event.event_type.name(),
            "code": event.code,
            "value": event.value,
        });
        println!("{}", line);
    } else {
        println!(
            "{}  event{:<3} {:<8} code {:<5} value {}",
            time,
            device,
            event.event_type.to_string(),
            event.code,
            event.value
        );
    }
}

fn format_timestamp(event: &EventRecord) -> String {
    event
        .timestamp()
        .and_then(|ts| {
            let sec = i64::try_from(ts.as_secs()).ok()?;
            chrono::DateTime::from_timestamp(sec, ts.subsec_nanos())
        })
        .map(|utc| {
            utc.with_timezone(&chrono::Local)
                .format("%H:%M:%S%.6f")
                .to_string()
        })
        .unwrap_or_else(|| format!("{}.{:06}", event.sec, event.usec))
}

fn run_config(
    action: ConfigAction,
    config: &Config,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(Config::default_path);
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", path);
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {:?}. Use --force to overwrite.",
                    path
                );
            }

            let default_config = Config::default();
            default_config.save(&path)?;
            println!("Created config at {:?}", path);
            println!("\nConfig content:\n{}", default_config.to_toml()?);
        }
    }

    Ok(())
}
