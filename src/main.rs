//! Entry point for **hyprpool**.
//!
//! Without arguments the binary runs the daemon: it builds the pools,
//! spawns the command listener and the Hyprland event source on background
//! threads and processes their messages on the main thread.
//!
//! With arguments it acts as a client: the arguments are joined into one
//! request, sent to the running daemon, and the result is printed.
//!
//! ```text
//! hyprpool go-to-workspace 2
//! hyprpool focus-next-monitor
//! hyprpool shutdown
//! ```
//!
//! SIGINT, SIGTERM and SIGHUP stop the daemon like `shutdown` does.

use hyprpool::config::ConfigSource;
use hyprpool::hyprland::compositor::HyprlandCompositor;
use hyprpool::hyprland::events::HyprlandEventSource;
use hyprpool::ipc::client;
use hyprpool::ipc::listener::UnixSocketListener;
use hyprpool::plugin::{Flow, Plugin};
use hyprpool::signals::SignalSource;
use hyprpool::traits::{CommandSource, Compositor, Message};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::mpsc;

/// Variable naming the Hyprland commit hyprpool must run against.  Read at
/// build time, and at run time when the build did not pin one.
const HOST_VERSION_VAR: &str = "HYPRPOOL_HYPRLAND_VERSION";

/// Host version hyprpool was built against, if pinned at build time.
const BUILT_HOST_VERSION: Option<&str> = option_env!("HYPRPOOL_HYPRLAND_VERSION");

const USAGE: &str = "\
usage: hyprpool                 run the daemon
       hyprpool <command> [n]   send a command to the running daemon

commands:
  go-to-workspace <n>           switch to the n-th workspace of this monitor
  move-to-workspace <n>         move the active window there and follow
  move-to-workspace-silent <n>  move the active window there
  focus-next-monitor
  move-to-next-monitor
  shutdown                      unpin all pools and stop the daemon

The daemon refuses to start when Hyprland's commit differs from
HYPRPOOL_HYPRLAND_VERSION, taken from the build environment or, failing
that, from the daemon's environment.  With neither set the check is skipped.
";

/// The host version to insist on: the pinned build value wins over the
/// runtime environment.  Empty values count as unset.
fn expected_host_version(built: Option<&str>, runtime: Option<String>) -> Option<String> {
    built
        .map(str::to_string)
        .or(runtime)
        .filter(|v| !v.trim().is_empty())
}

/// Default socket path for the command listener.
fn default_socket_path() -> PathBuf {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(runtime).join("hyprpool.sock")
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/hyprpool`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("hyprpool")
}

//  Main

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print!("{}", USAGE);
    } else if args.is_empty() {
        run_daemon();
    } else {
        run_client(&args.join(" "));
    }
}

/// Client mode: forward one request to the daemon.
fn run_client(request: &str) {
    let path = default_socket_path();
    match client::send(&path, request) {
        Ok(result) => {
            println!("{}", result.message);
            if !result.success {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("hyprpool: {}: {}", path.display(), e);
            std::process::exit(2);
        }
    }
}

/// Daemon mode.
fn run_daemon() {
    // Installed before any pool exists.
    let signals = match SignalSource::new() {
        Ok(signals) => signals,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let runtime_version = std::env::var(HOST_VERSION_VAR).ok();
    let expected = expected_host_version(BUILT_HOST_VERSION, runtime_version);
    if expected.is_none() {
        warn!("{} not set, skipping the host version check", HOST_VERSION_VAR);
    }

    let source = ConfigSource::File(config_dir().join("config.json"));
    let compositor = HyprlandCompositor::new();
    let mut plugin = match Plugin::init(compositor, source, expected.as_deref()) {
        Ok(plugin) => plugin,
        Err(e) => {
            error!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, rx) = mpsc::channel::<Message>();
    spawn_sources(tx, signals);

    run_loop(&mut plugin, rx);

    if let Err(e) = plugin.shutdown() {
        error!("teardown incomplete: {}", e);
    }
    info!("hyprpool stopped");
}

//  Event loop

fn run_loop<C: Compositor>(plugin: &mut Plugin<C>, rx: mpsc::Receiver<Message>) {
    info!("hyprpool running");
    for msg in rx {
        match plugin.handle(msg) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => return,
            Err(e) => error!("hook failed: {}", e),
        }
    }
    info!("all sources closed, exiting");
}

//  Helpers

fn spawn_sources(tx: mpsc::Sender<Message>, mut signals: SignalSource) {
    {
        let tx = tx.clone();
        std::thread::spawn(move || {
            if let Err(e) = signals.run(tx) {
                error!("signal source error: {}", e);
            }
        });
    }
    {
        let tx = tx.clone();
        let path = default_socket_path();
        std::thread::spawn(move || {
            let mut source = UnixSocketListener::new(&path);
            if let Err(e) = source.run(tx) {
                error!("socket listener error: {}", e);
            }
        });
    }

    // The event source may end (compositor restart); commands keep working.
    std::thread::spawn(move || {
        let mut source = HyprlandEventSource::new();
        if let Err(e) = source.run(tx) {
            error!("event source error: {}", e);
        }
    });
}
