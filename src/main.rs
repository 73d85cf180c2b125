use std::path::PathBuf;
use std::process::Command as ProcessCommand;

use clap::{Parser, Subcommand};

use neurohub::catalog;
use neurohub::catalog::Dataset;
use neurohub::config;
use neurohub::download;
use neurohub::feedback;
use neurohub::state::StateStore;
use neurohub::telemetry::{self, DownloadEvent, Reporter};
use neurohub::{atlas, loganalysis};

#[derive(Parser)]
#[command(
    name = "neurohub",
    version,
    about = "Discover and download neuroimaging datasets and brain atlases"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all datasets in the catalog
    List,
    /// Search datasets by keyword
    Search {
        query: String,
    },
    /// Show full details for one dataset
    Info {
        dataset_id: String,
    },
    /// List dataset categories with counts
    Categories,
    /// Catalog statistics plus local download counters
    Stats,
    /// Download a dataset
    Pull {
        dataset_id: String,
        /// Destination directory
        path: PathBuf,
        /// Short note attached to the telemetry event (if enabled)
        #[arg(long)]
        note: Option<String>,
        /// Print the download command without running it
        #[arg(long)]
        dry_run: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Brain atlas lookup tables
    Atlas {
        #[command(subcommand)]
        command: AtlasCommands,
    },
    /// Give feedback about neurohub
    Feedback,
    /// Telemetry consent and status
    Telemetry {
        #[command(subcommand)]
        command: TelemetryCommands,
    },
    /// Local state management
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    /// Check that external download tools are available
    Check,
    /// Summarize a download log (errors, warnings, categories)
    Analyze {
        /// Log file path; defaults to this session's download log
        log_path: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AtlasCommands {
    /// List embedded atlases
    List,
    /// Show details for one atlas
    Info { atlas_id: String },
    /// Copy one atlas lookup table to a directory
    Download {
        atlas_id: String,
        /// Destination directory (default: current dir)
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Copy every atlas lookup table to a directory
    DownloadAll {
        /// Destination directory (default: current dir)
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Print citations for the embedded atlases
    Attribution,
}

#[derive(Subcommand)]
enum TelemetryCommands {
    /// Show consent state, counters and endpoint
    Status,
    /// Grant telemetry consent
    Enable,
    /// Withdraw telemetry consent
    Disable,
}

#[derive(Subcommand)]
enum StateCommands {
    /// Reset all counters and consent flags to defaults
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

fn print_dataset_line(dataset: &Dataset) {
    let lock = if dataset.auth_required { " [auth]" } else { "" };
    println!(
        "{:<12} {:<10} {:>8}{lock}  {}",
        dataset.id, dataset.category, dataset.size, dataset.name
    );
}

fn cmd_list() -> i32 {
    let datasets = catalog::all();
    if datasets.is_empty() {
        println!("The catalog is empty.");
        return 0;
    }
    for dataset in datasets {
        print_dataset_line(dataset);
    }
    println!("\n{} datasets. `neurohub info <id>` for details.", datasets.len());
    0
}

fn cmd_search(query: &str) -> i32 {
    let matches = catalog::search(query);
    if matches.is_empty() {
        println!("No datasets match '{query}'.");
        return 1;
    }
    for dataset in matches {
        print_dataset_line(dataset);
    }
    0
}

fn cmd_info(dataset_id: &str) -> i32 {
    let Some(dataset) = catalog::get(dataset_id) else {
        eprintln!("[neurohub] unknown dataset '{dataset_id}' (try `neurohub search`)");
        return 1;
    };
    println!("{}", dataset.name);
    println!("  id:       {}", dataset.id);
    println!("  category: {}", dataset.category);
    println!("  size:     {}", dataset.size);
    println!("  method:   {}", dataset.download_method);
    println!("  source:   {}", dataset.source);
    println!("  access:   {}", if dataset.auth_required { "requires approval" } else { "open" });
    println!();
    println!("  {}", dataset.description);
    0
}

fn cmd_categories() -> i32 {
    for (category, count) in catalog::categories() {
        println!("{category:<12} {count}");
    }
    0
}

fn cmd_stats(store: &StateStore) -> anyhow::Result<i32> {
    #[derive(serde::Serialize)]
    struct Stats {
        catalog: catalog::CatalogStats,
        local_successful_downloads: u64,
        local_failed_downloads: u64,
    }
    let stats = Stats {
        catalog: catalog::stats(),
        local_successful_downloads: store.get_successful_runs(),
        local_failed_downloads: store.get_failed_runs(),
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(0)
}

fn cmd_pull(
    store: &mut StateStore,
    dataset_id: &str,
    dest: &std::path::Path,
    note: Option<&str>,
    dry_run: bool,
    force: bool,
) -> anyhow::Result<i32> {
    let Some(dataset) = catalog::get(dataset_id) else {
        eprintln!("[neurohub] unknown dataset '{dataset_id}' (try `neurohub search`)");
        return Ok(1);
    };

    println!("{} ({}, {})", dataset.name, dataset.download_method, dataset.size);
    if dry_run {
        let (program, args) = download::command_for(dataset, dest);
        println!("{}", download::render_command(program, &args));
        return Ok(0);
    }

    if !force {
        let proceed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Download ~{} to {}?",
                dataset.size,
                dest.display()
            ))
            .default(true)
            .interact()
            .unwrap_or(false);
        if !proceed {
            println!("Aborted.");
            return Ok(0);
        }
    }

    if !download::check_auth(dataset) {
        eprintln!("[neurohub] access to '{}' is not configured", dataset.id);
        return Ok(1);
    }

    let outcome = download::run(store, dataset, dest);

    let settings = config::load();
    let mut reporter = Reporter::from_settings(&settings);

    if outcome.succeeded {
        println!("Download of '{}' completed.", dataset.id);
        telemetry::prompt_consent_if_needed(store);
    } else {
        eprintln!("[neurohub] download of '{}' failed", dataset.id);
        if let Some(log_path) = &outcome.log_path {
            eprintln!("[neurohub] session log: {}", log_path.display());
        }
    }

    reporter.record_download_event(
        store,
        DownloadEvent {
            dataset_id: &dataset.id,
            succeeded: outcome.succeeded,
            metadata_received: outcome.succeeded,
            resume_attempts: outcome.resume_attempts,
            note,
        },
    );

    if outcome.succeeded {
        feedback::maybe_prompt(store, reporter.endpoint(), false);
        Ok(0)
    } else {
        Ok(1)
    }
}

fn cmd_atlas(command: &AtlasCommands) -> i32 {
    match command {
        AtlasCommands::List => {
            for atlas in atlas::list() {
                println!("{:<18} {:>4} regions  {}", atlas.id, atlas.regions, atlas.name);
            }
            0
        }
        AtlasCommands::Info { atlas_id } => {
            let Some(info) = atlas::info(atlas_id) else {
                eprintln!("[neurohub] unknown atlas '{atlas_id}' (see `neurohub atlas list`)");
                return 1;
            };
            println!("{}", info.name);
            println!("  id:      {}", info.id);
            println!("  regions: {}", info.regions);
            println!("  space:   {}", info.space);
            println!("  cite:    {}", info.reference);
            println!();
            println!("  {}", info.description);
            0
        }
        AtlasCommands::Download { atlas_id, output } => match atlas::copy(atlas_id, output) {
            Ok(path) => {
                println!("Wrote {}", path.display());
                0
            }
            Err(e) => {
                eprintln!("[neurohub] error: {e:#}");
                1
            }
        },
        AtlasCommands::DownloadAll { output } => match atlas::copy_all(output) {
            Ok(paths) => {
                for path in &paths {
                    println!("Wrote {}", path.display());
                }
                println!("{} atlases written.", paths.len());
                0
            }
            Err(e) => {
                eprintln!("[neurohub] error: {e:#}");
                1
            }
        },
        AtlasCommands::Attribution => {
            println!("When publishing results, please cite:");
            for line in atlas::attribution() {
                println!("  - {line}");
            }
            0
        }
    }
}

fn cmd_telemetry(store: &StateStore, command: &TelemetryCommands) -> anyhow::Result<i32> {
    match command {
        TelemetryCommands::Status => {
            let settings = config::load();
            let reporter = Reporter::from_settings(&settings);
            println!("{}", serde_json::to_string_pretty(&reporter.status(store))?);
        }
        TelemetryCommands::Enable => {
            store.set_telemetry_consent(true);
            println!("Telemetry enabled.");
        }
        TelemetryCommands::Disable => {
            store.set_telemetry_consent(false);
            println!("Telemetry disabled. Nothing will be sent.");
        }
    }
    Ok(0)
}

fn cmd_feedback(store: &StateStore) -> i32 {
    let settings = config::load();
    feedback::maybe_prompt(store, &settings.endpoint, true);
    0
}

fn cmd_state(store: &StateStore, command: &StateCommands) -> i32 {
    match command {
        StateCommands::Reset { force } => {
            if !force {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt("Reset all counters and consent flags?")
                    .default(false)
                    .interact()
                    .unwrap_or(false);
                if !confirmed {
                    println!("Nothing changed.");
                    return 0;
                }
            }
            store.reset();
            println!("State reset to defaults ({}).", store.path().display());
            0
        }
    }
}

fn cmd_check() -> i32 {
    let tools: [(&str, &[&str]); 3] = [
        ("aws", &["--version"]),
        ("aria2c", &["--version"]),
        ("datalad", &["--version"]),
    ];

    let mut missing = 0;
    for (tool, args) in tools {
        let found = ProcessCommand::new(tool)
            .args(args)
            .output()
            .is_ok_and(|out| out.status.success());
        if found {
            println!("{tool:<10} ok");
        } else {
            println!("{tool:<10} missing");
            missing += 1;
        }
    }
    if missing > 0 {
        println!("\n{missing} tool(s) missing; some datasets will not be downloadable.");
    }
    0
}

fn cmd_analyze(store: &StateStore, log_path: Option<&PathBuf>) -> anyhow::Result<i32> {
    let path = match log_path {
        Some(path) => path.clone(),
        None => match store.current_download_log_path() {
            Some(path) => path.to_path_buf(),
            None => {
                eprintln!("[neurohub] no log path given and no session log recorded");
                return Ok(1);
            }
        },
    };
    let summary = loganalysis::summarize(&path, 1000);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(0)
}

fn main() {
    let cli = Cli::parse();

    let mut store = match StateStore::open_default() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("[neurohub] error: {e:#}");
            std::process::exit(1);
        }
    };

    let exit_code = match &cli.command {
        Commands::List => cmd_list(),
        Commands::Search { query } => cmd_search(query),
        Commands::Info { dataset_id } => cmd_info(dataset_id),
        Commands::Categories => cmd_categories(),
        Commands::Stats => cmd_stats(&store).unwrap_or_else(|e| {
            eprintln!("[neurohub] error: {e:#}");
            1
        }),
        Commands::Pull {
            dataset_id,
            path,
            note,
            dry_run,
            force,
        } => cmd_pull(&mut store, dataset_id, path, note.as_deref(), *dry_run, *force)
            .unwrap_or_else(|e| {
                eprintln!("[neurohub] error: {e:#}");
                1
            }),
        Commands::Atlas { command } => cmd_atlas(command),
        Commands::Feedback => cmd_feedback(&store),
        Commands::Telemetry { command } => cmd_telemetry(&store, command).unwrap_or_else(|e| {
            eprintln!("[neurohub] error: {e:#}");
            1
        }),
        Commands::State { command } => cmd_state(&store, command),
        Commands::Check => cmd_check(),
        Commands::Analyze { log_path } => {
            cmd_analyze(&store, log_path.as_ref()).unwrap_or_else(|e| {
                eprintln!("[neurohub] error: {e:#}");
                1
            })
        }
    };
    std::process::exit(exit_code);
}
