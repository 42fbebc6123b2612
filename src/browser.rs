use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::info;

use crate::args::{Args, Command};
use crate::config::ScanConfig;
use crate::controller::{Controller, StartOutcome};
use crate::cookies::CookieJar;
use crate::fetch::HttpFetcher;
use crate::model::{ControlMessage, LogEntry};
use crate::opener::{PrintOpener, SystemOpener, TabOpener};
use crate::patterns::MarkerMatcher;
use crate::scanner::Scanner;
use crate::sqlite::{self, CookieSchema};
use crate::store::{default_store_path, Store};
use crate::utils::format_number;

pub fn open_store(args: &Args) -> Result<Arc<Store>> {
    let path = match &args.store {
        Some(path) => path.clone(),
        None => default_store_path()?,
    };
    Ok(Arc::new(Store::open(&path)?))
}

/// Snapshot of the selected browser's cookies, taken fresh for each batch.
pub fn load_browser_cookies(args: &Args) -> Result<CookieJar> {
    let schema = CookieSchema::for_browser(&args.browser)?;
    let cookie_path = match &args.cookies {
        Some(path) => path.clone(),
        None => sqlite::get_browser_cookie_path(&args.browser)?,
    };
    let jar = sqlite::load_cookie_jar(&cookie_path, schema, args.temp_path.as_deref())?;
    info!(action = "loaded", component = "cookie_jar", cookie_count = jar.len(), "Loaded browser cookies");
    Ok(jar)
}

pub async fn run(args: &Args) -> Result<()> {
    let store = open_store(args)?;
    let mut controller = Controller::new(store.clone());
    controller.load()?;

    match &args.command {
        Command::Scan {
            timeout,
            max_pages,
            user_agent,
            marker,
            marker_regex,
        } => {
            let config = ScanConfig {
                timeout: Duration::from_secs(*timeout),
                max_pages: *max_pages,
                user_agent: user_agent.clone(),
                matcher: MarkerMatcher::from_options(marker.as_deref(), marker_regex.as_deref())?,
            };
            run_scan(args, &mut controller, store, config).await?;
            print_scan_results(&controller);
        }
        Command::Sites => {
            if controller.sites_text().is_empty() {
                println!("No sites configured");
            } else {
                println!("{}", controller.sites_text());
            }
        }
        Command::Save { file } => {
            let text = fs::read_to_string(file)
                .with_context(|| format!("Failed to read site list {:?}", file))?;
            controller.set_sites_text(text);
            controller.save_sites()?;
            print_log(controller.log());
        }
        Command::Import { file } => {
            let json = fs::read_to_string(file)
                .with_context(|| format!("Failed to read import file {:?}", file))?;
            let imported = controller.import_sites(&json);
            if imported.is_ok() {
                controller.save_sites()?;
            }
            print_log(controller.log());
            imported?;
        }
        Command::Export { dir } => {
            let export = controller.export_sites(Local::now().date_naive());
            print_log(controller.log());
            let export = export?;
            let path = dir.join(&export.file_name);
            fs::write(&path, &export.json)
                .with_context(|| format!("Failed to write export file {:?}", path))?;
            println!("Wrote {}", path.display());
        }
        Command::Results => print_scan_results(&controller),
        Command::Open { print } => {
            let opener: &dyn TabOpener = if *print { &PrintOpener } else { &SystemOpener };
            let opened = controller.open_all(opener);
            print_log(controller.log());
            opened?;
        }
        Command::Clear => {
            controller.clear_results()?;
            print_log(controller.log());
        }
    }

    Ok(())
}

/// Starts a batch on a worker task and relays its messages to the controller
/// until the stream closes.
pub async fn run_scan(
    args: &Args,
    controller: &mut Controller,
    store: Arc<Store>,
    config: ScanConfig,
) -> Result<()> {
    let total_start_time = Instant::now();

    match controller.begin_scan()? {
        StartOutcome::Started => {}
        StartOutcome::AlreadyScanning | StartOutcome::NotConfigured => {
            print_log(controller.log());
            return Ok(());
        }
    }
    print_log(controller.log());

    let setup = load_browser_cookies(args).and_then(|jar| {
        let fetcher = HttpFetcher::new(config.user_agent.clone(), config.timeout)?;
        Ok(Scanner::new(config, jar, fetcher))
    });
    let scanner = match setup {
        Ok(scanner) => scanner,
        Err(e) => {
            controller.scan_finished();
            return Err(e);
        }
    };

    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(scanner.serve(store, control_rx, tx));

    control_tx.send(ControlMessage::StartScan)?;
    drop(control_tx);

    while let Some(message) = rx.recv().await {
        controller.handle_message(message)?;
        if let Some(entry) = controller.log().last() {
            print_log_entry(entry);
        }
    }
    controller.scan_finished();

    worker.await.context("Scan worker panicked")??;

    info!(
        action = "complete",
        component = "scan",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Scan finished"
    );
    Ok(())
}

fn print_log_entry(entry: &LogEntry) {
    let marker = if entry.is_error { "!" } else { " " };
    println!("[{}]{} {}", entry.timestamp.format("%H:%M:%S"), marker, entry.text);
}

fn print_log(log: &[LogEntry]) {
    for entry in log {
        print_log_entry(entry);
    }
}

pub fn print_scan_results(controller: &Controller) {
    let summary = controller.summary();
    let sites = controller.medal_sites();

    println!("\n--- Medal Scan Results ---");

    if sites.is_empty() {
        println!("No medals found. Run `medalscan scan` to check your sites.");
        return;
    }

    println!(
        "Sites with medals: {}",
        format_number(summary.sites_with_medals)
    );
    println!("Total medals: {}", format_number(summary.total_medals));
    println!();

    for site in sites {
        println!(
            "- {}: {} medals\n  {}",
            site.site_name,
            format_number(site.count),
            site.url
        );
    }
}
