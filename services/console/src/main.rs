use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use clap::Parser;
use switchboard_console::config::{Config, NOTICE_CAPACITY, WAVEFORM_HEIGHT, WAVEFORM_WIDTH};
use switchboard_console::console::{self, ConsoleCommand, HELP};
use switchboard_console::system_dialer::SystemDialer;
use switchboard_console::terminal::TextSurface;
use switchboard_console::vapi_adapter::VapiAdapter;
use switchboard_core::agent::AgentCatalog;
use switchboard_core::context::CallContext;
use switchboard_core::desk::CallDesk;
use switchboard_core::dialer::Dialer;
use switchboard_core::error::CallError;
use switchboard_core::session_provider::SessionProvider;
use switchboard_core::waveform::{Channel, ChannelControls, Waveform, spawn_animation};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::fmt::time::ChronoLocal;

type SharedSurface = Arc<Mutex<TextSurface>>;
type SharedControls = Arc<Mutex<ChannelControls>>;

#[derive(Parser)]
#[command(version, about = "Operator console for voice agent calls")]
struct Cli {
    /// JSON agent catalog to use instead of AGENT_CATALOG or the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Do not draw the call waveform
    #[arg(long)]
    no_waveform: bool,
}

/// Keeps the in-place waveform line from mixing with regular output.
#[derive(Default)]
struct Screen {
    waveform_shown: bool,
}

impl Screen {
    fn say(&mut self, text: &str) {
        if self.waveform_shown {
            print!("\r\x1b[2K");
            self.waveform_shown = false;
        }
        println!("{}", text);
    }

    fn waveform(&mut self, line: &str) {
        print!("\r\x1b[2K{}", line);
        if let Err(e) = std::io::stdout().flush() {
            tracing::debug!("Failed to flush waveform line: {}", e);
        }
        self.waveform_shown = true;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    // Logs go to stderr so they do not interleave with the console on stdout.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded successfully. Starting switchboard console...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Load the Agent Catalog ---
    let catalog = match args.catalog.as_ref().or(config.agent_catalog.as_ref()) {
        Some(path) => AgentCatalog::load(path)
            .with_context(|| format!("Failed to load agent catalog from {}", path.display()))?,
        None => AgentCatalog::builtin().context("Failed to load the built-in agent catalog")?,
    };
    tracing::info!("Loaded {} agents.", catalog.len());

    // --- 5. Initialize the Provider Client ---
    let client = vapi_realtime::Client::new(
        vapi_realtime::Config::builder()
            .with_base_url(&config.vapi_base_url)
            .with_api_key(config.vapi_api_key)
            .build(),
    );

    // --- 6. Open the Calling Surface ---
    let (context, mut notices) = CallContext::new(NOTICE_CAPACITY);
    let mut desk = CallDesk::open(context.clone(), VapiAdapter::new(client), SystemDialer)
        .context("Failed to subscribe to provider events")?;

    let controls: SharedControls = Arc::new(Mutex::new(ChannelControls::default()));
    let mut surfaces: Vec<SharedSurface> = Vec::new();
    if !args.no_waveform {
        for channel in [Channel::Synthetic, Channel::Counterpart] {
            let surface = Arc::new(Mutex::new(TextSurface::new(WAVEFORM_WIDTH, WAVEFORM_HEIGHT)));
            let context = context.clone();
            let controls = controls.clone();
            let is_active = move || {
                let controls = *controls.lock().unwrap_or_else(PoisonError::into_inner);
                controls.is_active(channel, context.is_call_active())
            };
            desk.attach_animation(spawn_animation(
                Waveform::new(channel),
                surface.clone(),
                is_active,
                config.frame_interval,
            ));
            surfaces.push(surface);
        }
    }

    // --- 7. Run the Console ---
    let mut screen = Screen::default();
    screen.say(HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut refresh = tokio::time::interval(config.waveform_refresh);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => {
                        if let Some(text) = run_command(command, &mut desk, &catalog, &controls).await {
                            screen.say(&text);
                        }
                    }
                    Err(e) => screen.say(&e.to_string()),
                }
            }
            Some(notice) = notices.recv() => {
                if let Some(text) = console::describe_notice(&notice) {
                    screen.say(&text);
                }
            }
            _ = refresh.tick(), if !surfaces.is_empty() => {
                if context.is_call_active() {
                    screen.waveform(&waveform_line(&surfaces));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }

    tracing::info!("Shutting down...");
    desk.leave().await;
    while let Ok(notice) = notices.try_recv() {
        if let Some(text) = console::describe_notice(&notice) {
            screen.say(&text);
        }
    }
    Ok(())
}

async fn run_command<P, D>(
    command: ConsoleCommand,
    desk: &mut CallDesk<P, D>,
    catalog: &AgentCatalog,
    controls: &SharedControls,
) -> Option<String>
where
    P: SessionProvider,
    D: Dialer,
{
    match command {
        ConsoleCommand::Agents => Some(console::agent_table(
            catalog,
            desk.current_session().as_ref(),
        )),
        ConsoleCommand::Propose { agent_id, action } => {
            let Some(agent) = catalog.get(&agent_id) else {
                return Some(format!("Error: {}", CallError::UnknownAgent(agent_id)));
            };
            match desk.propose(agent, action) {
                // The prompt arrives as a notice.
                Ok(true) => None,
                Ok(false) => Some("Another action is awaiting confirmation; answer it first.".to_string()),
                Err(e) => Some(format!("Error: {}", e)),
            }
        }
        ConsoleCommand::Confirm => match desk.confirm().await {
            Err(CallError::NothingPending) => Some("Nothing to confirm.".to_string()),
            // Outcomes and failures arrive as notices.
            _ => None,
        },
        ConsoleCommand::Cancel => Some(match desk.cancel() {
            Some(action) => format!("Cancelled: {}", action.prompt()),
            None => "Nothing to cancel.".to_string(),
        }),
        ConsoleCommand::Stop => match desk.stop().await {
            Ok(()) => Some("Ending call...".to_string()),
            Err(CallError::NoActiveSession) => Some("No call in progress.".to_string()),
            Err(_) => None,
        },
        ConsoleCommand::Status => Some(console::status_line(desk.current_session().as_ref())),
        ConsoleCommand::Pause => {
            let paused = controls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .toggle_pause();
            Some(if paused { "Waveform paused." } else { "Waveform resumed." }.to_string())
        }
        ConsoleCommand::Mute(channel) => {
            let muted = controls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .toggle_mute(channel);
            Some(format!(
                "{} channel {}.",
                channel.name(),
                if muted { "muted" } else { "unmuted" }
            ))
        }
        ConsoleCommand::Help => Some(HELP.to_string()),
        ConsoleCommand::Quit => None,
    }
}

fn waveform_line(surfaces: &[SharedSurface]) -> String {
    surfaces
        .iter()
        .map(|surface| {
            surface
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .line()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
