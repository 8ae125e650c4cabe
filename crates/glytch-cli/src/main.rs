//! `glytch` – the GLYTCH wristband companion.
//!
//! This binary runs the phone-side core on a desktop host.  It:
//!
//! 1. Checks for `~/.glytch/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Connects to the wristband stream and keeps reconnecting after losses.
//! 3. Speaks, displays and escalates resolved intents on the console.
//! 4. Drops the caregiver into an **interactive REPL** for setting the
//!    question / medicine context and reading the history.
//! 5. Intercepts **Ctrl-C** to drain the pipeline and exit safely.
//!
//! With `device = "stdin"` the telemetry is read from standard input and the
//! REPL is not started.

mod config;
mod console;
mod device;
mod repl;
mod supervisor;

use colored::Colorize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use glytch_middleware::{Topic, TopicReceiver};
use glytch_runtime::{Engine, IngestionPipeline, StaticLocation, init_tracing};

use crate::config::{Config, Language};
use crate::console::ConsoleSink;
use crate::device::{DEVICE_NAME, DeviceTarget};

fn main() {
    let _telemetry = init_tracing("glytch");

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    let target = match DeviceTarget::parse(&cfg.device) {
        Ok(target) => target,
        Err(e) => {
            println!("{}: {}", "Device error".red(), e);
            std::process::exit(2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    // ── Shutdown signal ───────────────────────────────────────────────────
    let (stop_tx, stop_rx) = watch::channel(false);
    let stop = Arc::new(stop_tx);

    let stop_ctrlc = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – draining and shutting down …".yellow().bold());
        stop_ctrlc.send_replace(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Engine + ingestion ────────────────────────────────────────────────
    let engine = Engine::with_location(
        cfg.engine_settings(),
        Box::new(StaticLocation(cfg.emergency_location.clone())),
    );
    let pipeline = IngestionPipeline::new(engine.clone(), Box::new(ConsoleSink::new(cfg.language)))
        .with_config(cfg.pipeline_config());

    let alerts = runtime.spawn(print_alerts(engine.bus().subscribe_to(Topic::SystemAlerts)));
    println!("  Listening for {} on {}", DEVICE_NAME.bold(), target.to_string().bold());
    // Piped input cannot be reopened.
    let reconnect_delay = match target {
        DeviceTarget::Stdin => None,
        _ => cfg.reconnect_delay(),
    };
    let session = runtime.spawn(supervisor::supervise(
        pipeline,
        target.clone(),
        reconnect_delay,
        stop_rx,
    ));

    // ── Interactive REPL ──────────────────────────────────────────────────
    // The REPL blocks on stdin, so it gets its own thread; the process exits
    // once the ingestion session has drained.
    if target != DeviceTarget::Stdin {
        println!();
        println!("  Type {} for a list of commands.\n", "/help".bold().cyan());
        let repl_engine = engine.clone();
        let repl_stop = stop.clone();
        let repl_cfg = cfg.clone();
        std::thread::spawn(move || repl::run(&repl_engine, repl_cfg, repl_stop));
    }

    if let Err(e) = runtime.block_on(session) {
        warn!(error = %e, "ingestion supervisor failed");
    }
    alerts.abort();

    let summary = engine.summary();
    println!(
        "\n  {} {} samples · {}",
        "Session summary:".bold(),
        summary.total,
        summary.trend_text
    );
    println!("{}", "  ✓ Exiting GLYTCH.".green());
}

async fn print_alerts(mut alerts: TopicReceiver) {
    while let Some(event) = alerts.recv().await {
        if let Some(line) = console::alert_line(&event) {
            println!("  {line}");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║       GLYTCH First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up GLYTCH.\n");

    let mut cfg = Config::default();

    println!("  Where should the {} stream be read from?", DEVICE_NAME.bold());
    println!("    tcp://host:port   serial-to-TCP bridge (default)");
    println!("    /dev/rfcomm0      paired Bluetooth serial port");
    println!("    stdin             piped telemetry");
    cfg.device = repl::prompt_line(&format!("  Device [{}]: ", cfg.device), &cfg.device);

    println!("  Spoken language?");
    println!("    1) English  (default)");
    println!("    2) Tamil");
    let choice = repl::prompt_line("  Enter choice [1]: ", "1");
    cfg.language = match choice.trim() {
        "2" => Language::Ta,
        other => Language::parse(other).unwrap_or(Language::En),
    };

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }

    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ________  ____________________ __"#.bold().cyan());
    println!("{}", r#"  / ____/ / \ \/ /_  __/ ____/ / / /"#.bold().cyan());
    println!("{}", r#" / / __/ /   \  / / / / /   / /_/ / "#.bold().cyan());
    println!("{}", r#"/ /_/ / /___ / / / / / /___/ __  /  "#.bold().cyan());
    println!("{}", r#"\____/_____//_/ /_/  \____/_/ /_/   "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "GLYTCH".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Wristband gesture & emotion companion");
    println!();
}
