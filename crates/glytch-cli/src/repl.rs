//! REPL – the caregiver's console.
//!
//! Supported slash-commands:
//!   /question <text>  – ask a yes/no question
//!   /medicine <name>  – offer a medicine
//!   /idle             – clear the context
//!   /status           – status board snapshot
//!   /summary          – calm/stress summary
//!   /history          – emotion samples, oldest first
//!   /log              – caregiver event log
//!   /fall on|off      – fall detection setting (falls always escalate)
//!   /emotion on|off   – toggle emotion tracking
//!   /settings         – edit `~/.glytch/config.toml`
//!   /help             – show this list
//!   /quit | /exit     – shut down

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use glytch_memory::history::clock_seconds;
use glytch_runtime::Engine;
use tokio::sync::watch;

use crate::config::{self, Config, Language};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Question(String),
    Medicine(String),
    Idle,
    Status,
    Summary,
    History,
    Log,
    Fall(bool),
    Emotion(bool),
    Settings,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };
    let required = |usage: &str| {
        if arg.is_empty() {
            Err(format!("Usage: {usage}"))
        } else {
            Ok(arg.to_string())
        }
    };
    let switch = |usage: &str| match arg.to_ascii_lowercase().as_str() {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(format!("Usage: {usage}")),
    };

    match name {
        "/question" => required("/question <text>").map(Command::Question),
        "/medicine" => required("/medicine <name>").map(Command::Medicine),
        "/idle" => Ok(Command::Idle),
        "/status" => Ok(Command::Status),
        "/summary" => Ok(Command::Summary),
        "/history" => Ok(Command::History),
        "/log" => Ok(Command::Log),
        "/fall" => switch("/fall on|off").map(Command::Fall),
        "/emotion" => switch("/emotion on|off").map(Command::Emotion),
        "/settings" => Ok(Command::Settings),
        "/help" => Ok(Command::Help),
        "/quit" | "/exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command: '{other}'")),
    }
}

/// Entry point for the interactive REPL.
///
/// Returns on `/quit`, end of input, or once `stop` has been signalled
/// elsewhere; `/quit` signals `stop` itself.
pub fn run(engine: &Engine, mut cfg: Config, stop: Arc<watch::Sender<bool>>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if *stop.borrow() {
            break;
        }

        print!("{} ", "glytch>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse(&line) {
            Ok(Command::Quit) => {
                println!("{}", "Goodbye.".green());
                break;
            }
            Ok(Command::Settings) => cmd_settings(engine, &mut cfg),
            Ok(command) => execute(engine, command),
            Err(e) => println!(
                "{} Type {} for available commands.",
                e.red(),
                "/help".bold()
            ),
        }
    }
    stop.send_replace(true);
}

fn execute(engine: &Engine, command: Command) {
    match command {
        Command::Question(text) => {
            engine.set_question(text);
            println!("  Context → {}", engine.current_context().to_string().yellow());
        }
        Command::Medicine(name) => {
            engine.set_medicine(name);
            println!("  Context → {}", engine.current_context().to_string().yellow());
        }
        Command::Idle => {
            engine.set_idle();
            println!("  Context → {}", "Idle".yellow());
        }
        Command::Status => cmd_status(engine),
        Command::Summary => cmd_summary(engine),
        Command::History => cmd_history(engine),
        Command::Log => cmd_log(engine),
        Command::Fall(on) => {
            engine.set_fall_detection(on);
            println!("  Fall detection {} (falls still escalate)", on_off(on));
        }
        Command::Emotion(on) => {
            engine.set_emotion_detection(on);
            println!("  Emotion detection {}", on_off(on));
        }
        Command::Help => cmd_help(),
        Command::Settings | Command::Quit => {}
    }
}

fn on_off(on: bool) -> colored::ColoredString {
    if on { "on".green() } else { "off".yellow() }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "GLYTCH Commands".bold().underline());
    println!("  {} – ask a yes/no question", "/question <text>".bold().cyan());
    println!("  {} – offer a medicine", "/medicine <name>".bold().cyan());
    println!("  {}            – clear the current context", "/idle".bold().cyan());
    println!("  {}          – status board", "/status".bold().cyan());
    println!("  {}         – calm / stress summary", "/summary".bold().cyan());
    println!("  {}         – recent emotion samples", "/history".bold().cyan());
    println!("  {}             – caregiver event log", "/log".bold().cyan());
    println!("  {}    – fall detection setting", "/fall on|off".bold().cyan());
    println!("  {} – emotion tracking", "/emotion on|off".bold().cyan());
    println!("  {}        – edit ~/.glytch/config.toml", "/settings".bold().cyan());
    println!("  {}     – exit", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_status(engine: &Engine) {
    let status = engine.status();
    println!("{}", "Status".bold().underline());
    println!("  {}", status.text.bold());
    println!("  Connection : {}", status.connection);
    println!("  Context    : {}", status.context);
    match status.current_emotion {
        Some(label) => println!("  Emotion    : {label}"),
        None => println!("  Emotion    : {}", "no data".dimmed()),
    }
    if let Some(gesture) = status.last_gesture {
        println!(
            "  Last line  : {} ({})",
            gesture.raw_text.dimmed(),
            clock_seconds(gesture.timestamp)
        );
    }
    println!(
        "  Detection  : fall {} · emotion {}",
        on_off(engine.fall_detection_enabled()),
        on_off(engine.emotion_detection_enabled())
    );
}

fn cmd_summary(engine: &Engine) {
    let summary = engine.summary();
    println!("{}", "Summary".bold().underline());
    println!(
        "  Calm     : {} ({:.0}%)",
        summary.calm_count,
        summary.calm_percent() * 100.0
    );
    println!(
        "  Stressed : {} ({:.0}%)",
        summary.stress_count,
        summary.stress_percent() * 100.0
    );
    println!("  Samples  : {}", summary.total);
    println!("  {}", summary.trend_text.italic());
}

fn cmd_history(engine: &Engine) {
    let history = engine.emotion_history();
    if history.is_empty() {
        println!("  {}", "No emotion samples yet.".dimmed());
        return;
    }
    for sample in history {
        println!("  {}  {}", clock_seconds(sample.timestamp).dimmed(), sample.label);
    }
}

fn cmd_log(engine: &Engine) {
    let log = engine.event_log();
    if log.is_empty() {
        println!("  {}", "Event log is empty.".dimmed());
        return;
    }
    for entry in log {
        println!("  • {entry}");
    }
}

fn cmd_settings(engine: &Engine, cfg: &mut Config) {
    println!("{}", "Settings Editor".bold().underline());
    println!("  (press Enter to keep the current value)");

    cfg.device = prompt_line(&format!("  Device [{}]: ", cfg.device), &cfg.device);

    let language = prompt_line(
        &format!("  Language (en / ta) [{}]: ", cfg.language),
        &cfg.language.to_string(),
    );
    match Language::parse(&language) {
        Some(language) => cfg.language = language,
        None => println!("  {} '{}'", "Unknown language:".red(), language.yellow()),
    }

    cfg.emergency_location = prompt_line(
        &format!("  Emergency location [{}]: ", cfg.emergency_location),
        &cfg.emergency_location,
    );
    cfg.fall_detection_enabled = prompt_bool("  Fall detection", cfg.fall_detection_enabled);
    cfg.emotion_detection_enabled =
        prompt_bool("  Emotion detection", cfg.emotion_detection_enabled);

    engine.set_fall_detection(cfg.fall_detection_enabled);
    engine.set_emotion_detection(cfg.emotion_detection_enabled);

    match config::save(cfg) {
        Ok(()) => {
            println!(
                "{} {}",
                "✓ Settings saved to".green(),
                config::config_path().display().to_string().bold()
            );
            println!("  Device, language and location apply on next start.");
        }
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn prompt_line(msg: &str, default: &str) -> String {
    print!("{}", msg);
    io::stdout().flush().ok();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}

fn prompt_bool(label: &str, current: bool) -> bool {
    let current_text = if current { "on" } else { "off" };
    let answer = prompt_line(&format!("{label} (on / off) [{current_text}]: "), current_text);
    match answer.to_ascii_lowercase().as_str() {
        "on" | "yes" | "y" | "true" => true,
        "off" | "no" | "n" | "false" => false,
        _ => current,
    }
}
