//! stripwm driver
//!
//! Reads host events as JSON lines from stdin (or a script file), runs them
//! through the layout engine, and writes one JSON response per line to
//! stdout. Logs go to stderr.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use stripwm_core_layout::Rect;
use stripwm_daemon::{AppState, Config, Timer};
use stripwm_ipc::encode_response;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "stripwm")]
#[command(author, version, about = "Scrollable tiling layout driver")]
struct Args {
    /// Config file (defaults to the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read events from this file instead of stdin
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Width of the simulated screen
    #[arg(long, default_value_t = 1920)]
    screen_width: i32,

    /// Height of the simulated screen
    #[arg(long, default_value_t = 1080)]
    screen_height: i32,
}

/// Events that the driver loop processes.
enum DaemonEvent {
    /// One line of input.
    Input(String),
    /// The input reached EOF or failed.
    InputClosed,
    /// A debounce delay expired.
    Timer(Timer),
}

impl DaemonEvent {
    fn kind(&self) -> &'static str {
        match self {
            DaemonEvent::Input(_) => "input line",
            DaemonEvent::InputClosed => "end of input",
            DaemonEvent::Timer(_) => "timer",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        // Can't use tracing yet
        eprintln!("Failed to load configuration: {:#}. Using defaults.", e);
        Config::default()
    });

    let log_level = match config.behavior.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    for w in config.validate() {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("stripwm driver starting, version {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: gaps={}x{}, presets=\"{}\", scroll={:?}",
        config.layout.gap_horizontal,
        config.layout.gap_vertical,
        config.behavior.preset_widths,
        config.scrolling.policy
    );

    let screen = Rect::new(0, 0, args.screen_width, args.screen_height);
    let mut state = AppState::new(config, screen).with_config_path(args.config.clone());

    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(100);

    let reader = match &args.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open script: {}", path.display()))?;
            spawn_reader(file, event_tx.clone())
        }
        None => spawn_reader(tokio::io::stdin(), event_tx.clone()),
    };

    let mut stdout = tokio::io::stdout();
    let mut timers: HashMap<Timer, JoinHandle<()>> = HashMap::new();

    while let Some(event) = event_rx.recv().await {
        match event {
            DaemonEvent::Input(line) => {
                let outcome = state.handle_line(&line);
                for timer in outcome.timers {
                    schedule(&mut timers, timer, event_tx.clone());
                }

                let encoded = match encode_response(&outcome.response) {
                    Ok(encoded) => encoded,
                    Err(e) => {
                        error!("Failed to encode response: {}", e);
                        continue;
                    }
                };
                stdout.write_all(encoded.as_bytes()).await?;
                stdout.flush().await?;

                if outcome.stop {
                    break;
                }
            }
            DaemonEvent::Timer(timer) => {
                timers.remove(&timer);
                state.fire(timer);
            }
            DaemonEvent::InputClosed => {
                // Settle whatever is still pending so the final layout is stable.
                for (timer, handle) in timers.drain() {
                    handle.abort();
                    state.fire(timer);
                }
                break;
            }
        }
    }

    reader.abort();
    for (_, handle) in timers.drain() {
        handle.abort();
    }
    info!("stripwm driver stopped");
    Ok(())
}

/// Forwards input lines to the driver loop. Blank lines and `#` comments are
/// skipped.
fn spawn_reader<R>(input: R, event_tx: mpsc::Sender<DaemonEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(input).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }
                    if !forward(&event_tx, DaemonEvent::Input(line)).await {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            }
        }
        forward(&event_tx, DaemonEvent::InputClosed).await;
    })
}

/// Sends `event` to the driver loop. Returns `false` once the loop is gone.
async fn forward(event_tx: &mpsc::Sender<DaemonEvent>, event: DaemonEvent) -> bool {
    match event_tx.send(event).await {
        Ok(()) => true,
        Err(mpsc::error::SendError(event)) => {
            debug!("Driver loop closed, dropping {}", event.kind());
            false
        }
    }
}

/// (Re)starts the delay for `timer`, cancelling a pending one.
fn schedule(timers: &mut HashMap<Timer, JoinHandle<()>>, timer: Timer, event_tx: mpsc::Sender<DaemonEvent>) {
    if let Some(pending) = timers.remove(&timer) {
        pending.abort();
        debug!("restarting {:?}", timer);
    }
    let delay = Duration::from_millis(timer.delay_ms());
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        forward(&event_tx, DaemonEvent::Timer(timer)).await;
    });
    timers.insert(timer, handle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["stripwm"]);
        assert_eq!(args.screen_width, 1920);
        assert_eq!(args.screen_height, 1080);
        assert!(args.config.is_none());
        assert!(args.script.is_none());
    }

    #[test]
    fn test_args_script_and_screen() {
        let args = Args::parse_from(["stripwm", "--script", "events.jsonl", "--screen-width", "2560"]);
        assert_eq!(args.script, Some(PathBuf::from("events.jsonl")));
        assert_eq!(args.screen_width, 2560);
    }

    #[tokio::test]
    async fn test_reader_skips_comments_and_reports_eof() {
        let (tx, mut rx) = mpsc::channel(8);
        let input: &'static [u8] = b"# comment\n\n{\"type\":\"gesture_finished\"}\n";
        spawn_reader(input, tx);

        match rx.recv().await {
            Some(DaemonEvent::Input(line)) => assert_eq!(line, "{\"type\":\"gesture_finished\"}"),
            _ => panic!("expected an input line"),
        }
        assert!(matches!(rx.recv().await, Some(DaemonEvent::InputClosed)));
    }

    #[tokio::test]
    async fn test_forward_reports_closed_loop() {
        let (tx, rx) = mpsc::channel(1);
        assert!(forward(&tx, DaemonEvent::InputClosed).await);
        drop(rx);
        assert!(!forward(&tx, DaemonEvent::Input("{}".to_string())).await);
    }

    #[tokio::test]
    async fn test_schedule_restarts_pending_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = HashMap::new();
        let timer = Timer::UserResizeSettled { desktop: 1 };
        schedule(&mut timers, timer, tx.clone());
        schedule(&mut timers, timer, tx);
        assert_eq!(timers.len(), 1);

        match rx.recv().await {
            Some(DaemonEvent::Timer(fired)) => assert_eq!(fired, timer),
            _ => panic!("expected the timer"),
        }
        timers.clear();
        assert!(rx.try_recv().is_err());
    }
}
