// Entry point and the interactive menu.
//
// Option [1] loads the orders file, derives the year/hour/period columns and
// computes every aggregate once. The remaining options show one dashboard
// tab each, or dump all aggregates as JSON, from that loaded snapshot.
mod config;
mod dashboard;
mod derive;
mod error;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use config::Config;
use dashboard::Tab;
use error::Result;
use reports::{Aggregates, LoadReport};
use std::io::{self, Write};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing from `DASHBOARD_LOG`, defaulting to `info`.
///
/// Logs go to stderr so they never interleave with the rendered tables.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("DASHBOARD_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Read a single line of input after printing the "Enter choice:" prompt.
///
/// End of input reads as "0" so a closed stdin exits the loop.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => "0".to_string(),
        Ok(_) => buf.trim().to_string(),
    }
}

/// Load, derive and aggregate in one go. Either everything succeeds or
/// nothing is kept.
fn load(config: &Config) -> Result<(Aggregates, LoadReport)> {
    let raw = loader::load_raw(&config.data_path)?;
    let data = derive::derive_columns(raw)?;
    let report = reports::generate_load_report(&data);
    let aggregates = Aggregates::compute(&data, config.report_year);
    info!(
        rows = report.total_rows,
        orders = report.distinct_orders,
        customers = report.distinct_customers,
        "dashboard ready"
    );
    Ok((aggregates, report))
}

fn handle_load(config: &Config) -> Option<Aggregates> {
    match load(config) {
        Ok((aggregates, report)) => {
            println!(
                "Processing dataset... ({} rows loaded, {} orders, {} customers)",
                util::format_int(report.total_rows),
                util::format_int(report.distinct_orders),
                util::format_int(report.distinct_customers)
            );
            if report.unapproved_rows > 0 {
                println!(
                    "Note: {} rows have no approval timestamp and no order year.",
                    util::format_int(report.unapproved_rows)
                );
            }
            println!();
            Some(aggregates)
        }
        Err(e) => {
            error!(path = %config.data_path.display(), "load failed: {}", e);
            eprintln!("Failed to load file: {}\n", e);
            None
        }
    }
}

fn print_menu() {
    println!("E-Commerce Public Dashboard");
    println!("[1] Load the file");
    for (idx, tab) in Tab::ALL.iter().enumerate() {
        println!("[{}] {}", idx + 2, tab.title());
    }
    println!("[7] Export aggregates (JSON)");
    println!("[0] Exit\n");
}

/// Menu entries 2..=6 map onto the tabs in order.
fn tab_for_choice(choice: &str) -> Option<Tab> {
    let n: usize = choice.parse().ok()?;
    Tab::ALL.get(n.checked_sub(2)?).copied()
}

fn print_not_loaded() {
    println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
}

fn main() {
    init_tracing();
    let config = Config::from_env();
    info!(path = %config.data_path.display(), year = config.report_year, "starting dashboard");

    // Replaced wholesale on every successful load, never mutated in place.
    let mut loaded: Option<Aggregates> = None;
    loop {
        print_menu();
        let choice = read_choice();
        println!();
        match choice.as_str() {
            "1" => {
                if let Some(aggregates) = handle_load(&config) {
                    loaded = Some(aggregates);
                }
            }
            "7" => match loaded.as_ref() {
                Some(aggregates) => {
                    if let Err(e) = output::print_json(aggregates) {
                        error!("export failed: {}", e);
                        eprintln!("Export error: {}\n", e);
                    }
                }
                None => print_not_loaded(),
            },
            "0" => {
                println!("Exiting the program.");
                break;
            }
            other => match (tab_for_choice(other), loaded.as_ref()) {
                (Some(tab), Some(aggregates)) => tab.render(aggregates, &config),
                (Some(_), None) => print_not_loaded(),
                (None, _) => println!("Invalid choice. Please enter a number from 0 to 7.\n"),
            },
        }
    }
}
