// Entry point and interactive menu.
//
// - Option [1] loads and classifies the CSV, printing diagnostics.
// - Options [2]-[4] and [7]-[9] edit the active filters.
// - Option [5] previews the cascading facet options.
// - Option [6] writes the filtered view, group summaries and metrics.
use anyhow::Context as _;
use chrono::Local;
use clap::Parser;
use frontier_works::facets::FacetOptions;
use frontier_works::filter::SavedFilters;
use frontier_works::reports::GroupSummaryRow;
use frontier_works::{loader, output, util, Dataset, EngineConfig, Facet, FilterState, QuickFilter};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Border works classification and filtering")]
struct Cli {
    /// CSV export of the operations sheet.
    #[arg(short, long, default_value = "operations.csv")]
    input: PathBuf,

    /// Optional JSON engine configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for generated reports.
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// JSON file holding saved filter configurations.
    #[arg(long, default_value = "saved_filters.json")]
    snapshots: PathBuf,
}

/// Everything the menu needs between choices. Filters are replaced whole on
/// every edit.
struct App {
    cli: Cli,
    config: EngineConfig,
    data: Option<Dataset>,
    filters: FilterState,
    saved: SavedFilters,
}

/// Print `prompt` and read one trimmed line.
fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn handle_load(app: &mut App) {
    match loader::load_records(&app.cli.input) {
        Ok((raws, report)) => {
            let data = Dataset::load(raws, Local::now().naive_local(), &app.config);
            println!(
                "Processing dataset... ({} rows read, {} works kept)",
                util::format_int(report.total_rows),
                util::format_int(report.kept_rows)
            );
            if report.parse_errors > 0 || report.blank_rows > 0 {
                println!(
                    "Note: {} undecodable and {} blank rows skipped.",
                    util::format_int(report.parse_errors),
                    util::format_int(report.blank_rows)
                );
            }
            println!("Classified against {}\n", data.classified_at().format("%Y-%m-%d %H:%M"));
            app.filters = data.default_filters();
            app.data = Some(data);
        }
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
}

fn require_data(app: &App) -> Option<&Dataset> {
    if app.data.is_none() {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
    }
    app.data.as_ref()
}

fn handle_quick_filter(app: &mut App) {
    let Some(data) = require_data(app) else { return };
    let names: Vec<&str> = QuickFilter::ALL.iter().map(|q| q.as_str()).collect();
    println!("Presets: {}", names.join(", "));
    match read_line("Preset: ").parse::<QuickFilter>() {
        Ok(preset) => {
            app.filters = data.quick_filter(preset);
            print_view_size(app);
        }
        Err(e) => println!("{e}\n"),
    }
}

fn handle_search(app: &mut App) {
    let mut next = app.filters.clone();
    next.set_search(read_line("Search text (empty to clear): "));
    app.filters = next;
    print_view_size(app);
}

/// Reads `facet=value1,value2`; an empty value list clears the facet.
fn handle_select(app: &mut App) {
    let input = read_line("Selection (facet=value1,value2): ");
    let Some((key, values)) = input.split_once('=') else {
        println!("Expected facet=values.\n");
        return;
    };
    let facet = match key.parse::<Facet>() {
        Ok(f) => f,
        Err(e) => {
            println!("{e}\n");
            return;
        }
    };
    let mut next = app.filters.clone();
    next.set_selection(
        facet,
        values.split(',').map(str::trim).filter(|v| !v.is_empty()),
    );
    app.filters = next;
    print_view_size(app);
}

fn print_view_size(app: &App) {
    if let Some(data) = &app.data {
        let view = data.filtered_view(&app.filters);
        let counts = app.filters.active_counts();
        println!(
            "{} of {} works match ({} active constraints).\n",
            util::format_int(view.len()),
            util::format_int(data.len()),
            counts.total
        );
    }
}

fn print_options(options: &FacetOptions) {
    for (facet, set) in options.iter() {
        let shown: Vec<String> = set
            .values
            .iter()
            .take(8)
            .map(|v| format!("{} ({})", v, set.count(v)))
            .collect();
        let more = set.values.len().saturating_sub(shown.len());
        let suffix = if more > 0 { format!(" ... +{more}") } else { String::new() };
        println!("{:<18} {}{}", facet.as_str(), shown.join(", "), suffix);
    }
    println!();
}

fn handle_options(app: &App) {
    let Some(data) = require_data(app) else { return };
    let eval = data.evaluate(&app.filters);
    println!("Filtered view: {} works\n", util::format_int(eval.view.len()));
    print_options(&eval.options);
    output::preview_table_rows(&output::preview_rows(&eval.view, 5), 5);
}

fn handle_generate_reports(app: &App) -> anyhow::Result<()> {
    let Some(data) = require_data(app) else { return Ok(()) };
    let view = data.filtered_view(&app.filters);
    std::fs::create_dir_all(&app.cli.out_dir)
        .with_context(|| format!("creating {}", app.cli.out_dir.display()))?;

    println!("Generating reports...\n");
    let file = app.cli.out_dir.join("filtered_works.csv");
    output::export_view(&file, &view)?;
    println!("Filtered works exported to {}\n", file.display());

    for facet in [Facet::Frontier, Facet::WorkCategory, Facet::RiskLevel] {
        let groups = data.group_by(&app.filters, facet);
        let rows: Vec<GroupSummaryRow> = groups.iter().map(GroupSummaryRow::from).collect();
        let file = app.cli.out_dir.join(format!("by_{}.csv", facet.as_str()));
        output::write_csv(&file, &rows)?;
        println!("Summary by {}", facet.as_str());
        output::preview_table_rows(&rows, 6);
        println!("(Full table exported to {})\n", file.display());
    }

    let metrics = data.metrics(&app.filters);
    let file = app.cli.out_dir.join("metrics.json");
    output::write_json(&file, &metrics)?;
    println!(
        "{{\"total_works\": {}, \"total_sanctioned\": {}, \"utilization_rate\": {}}}\n",
        metrics.total_works,
        util::format_number(metrics.total_sanctioned, 2),
        util::format_number(metrics.utilization_rate, 1)
    );
    info!(works = view.len(), dir = %app.cli.out_dir.display(), "reports written");
    Ok(())
}

fn handle_save(app: &mut App) -> anyhow::Result<()> {
    let name = read_line("Save filters as: ");
    if name.is_empty() {
        return Ok(());
    }
    app.saved.save(app.filters.snapshot(name));
    output::save_saved_filters(&app.cli.snapshots, &app.saved)?;
    println!("Saved.\n");
    Ok(())
}

fn handle_restore(app: &mut App) {
    let names: Vec<&str> = app.saved.names().collect();
    if names.is_empty() {
        println!("No saved filters.\n");
        return;
    }
    println!("Saved: {}", names.join(", "));
    match app.saved.load(&read_line("Load: ")) {
        Ok(state) => {
            app.filters = state;
            print_view_size(app);
        }
        Err(e) => println!("{e}\n"),
    }
}

fn handle_reset(app: &mut App) {
    if let Some(data) = &app.data {
        app.filters = data.default_filters();
    } else {
        app.filters = FilterState::default();
    }
    print_view_size(app);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let saved = output::load_saved_filters(&cli.snapshots)
        .with_context(|| format!("reading saved filters {}", cli.snapshots.display()))?;
    let mut app = App {
        cli,
        config,
        data: None,
        filters: FilterState::default(),
        saved,
    };

    loop {
        println!("Select an action:");
        println!("[1] Load the file");
        println!("[2] Quick filter");
        println!("[3] Search");
        println!("[4] Select facet values");
        println!("[5] Show filter options");
        println!("[6] Generate reports");
        println!("[7] Save filters");
        println!("[8] Load saved filters");
        println!("[9] Reset filters");
        println!("[0] Exit\n");
        let result = match read_line("Enter choice: ").as_str() {
            "1" => {
                handle_load(&mut app);
                Ok(())
            }
            "2" => {
                handle_quick_filter(&mut app);
                Ok(())
            }
            "3" => {
                handle_search(&mut app);
                Ok(())
            }
            "4" => {
                handle_select(&mut app);
                Ok(())
            }
            "5" => {
                handle_options(&app);
                Ok(())
            }
            "6" => handle_generate_reports(&app),
            "7" => handle_save(&mut app),
            "8" => {
                handle_restore(&mut app);
                Ok(())
            }
            "9" => {
                handle_reset(&mut app);
                Ok(())
            }
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 0-9.\n");
                Ok(())
            }
        };
        if let Err(e) = result {
            error!("{e:#}");
        }
    }
    Ok(())
}
