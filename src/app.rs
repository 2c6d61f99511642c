use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use fluxdash::config::Config;
use fluxdash::flux::{FluxClient, QueryService};
use fluxdash::state::DashboardState;
use fluxdash::{poll, ui};
use std::fs::OpenOptions;
use std::path::Path;
use std::process;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub fn run(cli: Cli) {
    // Handle subcommands first
    if let Some(command) = cli.command {
        match command {
            Commands::CheckConfig => handle_check_config(&cli.config),
            Commands::RenderQueries => handle_render_queries(&cli.config),
        }
        return;
    }

    if let Err(e) = run_dashboard(&cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run_dashboard(cli: &Cli) -> Result<()> {
    init_logging();

    let config = Config::load(&cli.config).context("failed to load dashboard config")?;

    let client = FluxClient::new(&cli.host, cli.org.clone(), cli.token.clone())
        .context("failed to build query client")?;
    let service: Arc<dyn QueryService> = Arc::new(client);

    let state = Arc::new(DashboardState::new());

    // One channel feeds the UI loop: the input thread sends terminal
    // events and ticks, the poll workers send data-changed signals.
    let (event_tx, event_rx) = mpsc::channel();
    ui::spawn_event_thread(event_tx.clone());

    let interval = Duration::from_secs(cli.interval.max(1));
    let poller = poll::spawn_pollers(&config, service, Arc::clone(&state), event_tx, interval);

    let result = ui::run_ui(&config, &state, event_rx).context("terminal UI failed");

    poller.shutdown();
    result
}

/// Route diagnostics to a logfile in the working directory; the
/// alternate screen owns stdout/stderr while the dashboard runs.
fn init_logging() {
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open("fluxdash.log")
    else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn handle_check_config(path: &Path) {
    match Config::load(path) {
        Ok(config) => {
            println!(
                "Config OK: {} row(s), {} widget(s)",
                config.rows.len(),
                config.widgets().count()
            );
            for (i, row) in config.rows.iter().enumerate() {
                for widget in &row.widgets {
                    println!(
                        "- row {} | {} (column {}, height {}, span {}, limit {}{})",
                        i,
                        widget.title,
                        widget.column,
                        widget.height,
                        widget.span,
                        widget.limit,
                        if widget.template.is_some() {
                            ", templated"
                        } else {
                            ""
                        },
                    );
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn handle_render_queries(path: &Path) {
    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    for widget in config.widgets() {
        match poll::query_text(widget) {
            Ok(query) => {
                println!("=== {}", widget.title);
                println!("{}", query);
            }
            Err(e) => {
                eprintln!("Error rendering query for {}: {}", widget.title, e);
                process::exit(1);
            }
        }
    }
}
