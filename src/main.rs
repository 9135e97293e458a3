use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info, info_span};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod domain;
mod editor;
mod inputter;
mod layout;
mod model;
mod sort;
mod table;
mod ui;

use controller::Controller;
use domain::{GridConfig, GridError};
use model::{Model, Status};
use table::Table;
use ui::TableUI;

/// A tui data grid with sortable, resizable, reorderable and editable columns.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Data file (csv, parquet or arrow) with make, model and price columns.
    /// Without it the built in vehicle list is shown.
    data: Option<String>,

    /// Minimum column width
    #[arg(long, default_value_t = 4)]
    min_width: u16,

    /// Cells a column grows or shrinks per resize step
    #[arg(long, default_value_t = 1)]
    step: u16,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Log file, the terminal is used by the grid
    #[arg(long, default_value = "~/.vgrid.log")]
    log_file: String,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Do not access the system clipboard
    #[arg(long)]
    no_clipboard: bool,
}

fn expand_path(path: &str) -> Result<PathBuf, GridError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| GridError::LoadingFailed(format!("Can not expand {path}: {e}")))
}

fn init_logging(args: &Args) -> Result<(), GridError> {
    let path = expand_path(&args.log_file)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            error!("Exiting with error: {:?}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), GridError> {
    let _span = info_span!("vgrid").entered();
    info!("Starting vgrid!");

    let data_path = args.data.as_deref().map(expand_path).transpose()?;
    let config = GridConfig::default()
        .event_poll_time(args.poll_ms)
        .min_column_width(args.min_width)
        .resize_step(args.step)
        .clipboard(!args.no_clipboard)
        .data_path(data_path);

    let table = match &config.data_path {
        Some(path) => Table::load_data_file(path.clone())?,
        None => Table::seed(),
    };

    let mut terminal = ratatui::init();
    let result = event_loop(&config, table, &mut terminal);
    ratatui::restore();
    result
}

fn event_loop(
    config: &GridConfig,
    table: Table,
    terminal: &mut DefaultTerminal,
) -> Result<(), GridError> {
    let size = terminal.size()?;
    let mut model = Model::init(config, table, size.width as usize, size.height as usize)?;
    let mut ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }
    info!("Bye!");
    Ok(())
}
