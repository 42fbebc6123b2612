use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

use crate::config::MEDAL_PAGE_PATH;
use crate::model::{LogEntry, ScanMessage, ScanResultEntry, SiteConfig, SiteFile, SiteRecord};
use crate::opener::TabOpener;
use crate::stats::ScanSummary;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The caller should now send `ControlMessage::StartScan`.
    Started,
    AlreadyScanning,
    NotConfigured,
}

/// A rendered export file.
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub json: String,
    pub site_count: usize,
}

/// User-facing state: the editable site list, the session log, the cached
/// results and whether a batch is running.
pub struct Controller {
    store: Arc<Store>,
    sites_text: String,
    log: Vec<LogEntry>,
    results: Vec<ScanResultEntry>,
    scanning: bool,
}

fn valid_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.contains('|'))
        .map(|line| line.trim().to_string())
        .collect()
}

impl Controller {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            sites_text: String::new(),
            log: Vec::new(),
            results: Vec::new(),
            scanning: false,
        }
    }

    /// Pulls the saved site list and last results from the store.
    pub fn load(&mut self) -> Result<()> {
        self.sites_text = self.store.sites()?.join("\n");
        self.results = self.store.results()?.unwrap_or_default();
        Ok(())
    }

    pub fn sites_text(&self) -> &str {
        &self.sites_text
    }

    pub fn set_sites_text(&mut self, text: impl Into<String>) {
        self.sites_text = text.into();
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn results(&self) -> &[ScanResultEntry] {
        &self.results
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn add_log(&mut self, text: impl Into<String>, is_error: bool) {
        let entry = LogEntry::new(text, is_error);
        debug!(component = "controller", is_error, "{}", entry.text);
        self.log.push(entry);
    }

    /// Stores every line of the site text that contains `|`. Returns the
    /// number of sites saved; zero means nothing was written.
    pub fn save_sites(&mut self) -> Result<usize> {
        let sites = valid_lines(&self.sites_text);
        if sites.is_empty() {
            self.add_log("Save failed: no valid site entries", true);
            return Ok(0);
        }

        self.store.set_sites(&sites)?;
        self.add_log(format!("Saved configuration ({} sites)", sites.len()), false);
        Ok(sites.len())
    }

    /// Replaces the site text with the contents of an import file. Nothing is
    /// saved until [`Controller::save_sites`] runs.
    pub fn import_sites(&mut self, json: &str) -> Result<usize> {
        match parse_import(json) {
            Ok(lines) => {
                let count = lines.len();
                self.sites_text = lines.join("\n");
                self.add_log(format!("Imported {} sites", count), false);
                Ok(count)
            }
            Err(e) => {
                self.add_log(format!("Import failed: {}", e), true);
                Err(e)
            }
        }
    }

    pub fn export_sites(&mut self, date: NaiveDate) -> Result<Export> {
        let sites: Vec<SiteRecord> = valid_lines(&self.sites_text)
            .iter()
            .filter_map(|line| SiteConfig::parse(line))
            .map(|site| SiteRecord {
                name: site.name,
                url: site
                    .url
                    .strip_suffix(MEDAL_PAGE_PATH)
                    .unwrap_or(&site.url)
                    .to_string(),
            })
            .collect();

        if sites.is_empty() {
            self.add_log("Export failed: no valid configuration", true);
            anyhow::bail!("No valid sites to export");
        }

        let site_count = sites.len();
        let json = serde_json::to_string_pretty(&SiteFile { sites })?;
        self.add_log(format!("Exported {} site configurations", site_count), false);

        Ok(Export {
            file_name: format!("PT_Config_{}.json", date.format("%Y-%m-%d")),
            json,
            site_count,
        })
    }

    /// Guards against overlapping batches and checks that sites are saved.
    pub fn begin_scan(&mut self) -> Result<StartOutcome> {
        if self.scanning {
            self.add_log("A scan is already in progress...", true);
            return Ok(StartOutcome::AlreadyScanning);
        }

        if self.store.sites()?.is_empty() {
            self.add_log("Configure sites before scanning", true);
            return Ok(StartOutcome::NotConfigured);
        }

        self.scanning = true;
        self.log.clear();
        self.add_log("Scan started...", false);
        Ok(StartOutcome::Started)
    }

    pub fn handle_message(&mut self, message: ScanMessage) -> Result<()> {
        match message {
            ScanMessage::ScanLog { text, is_error } => self.add_log(text, is_error),
            ScanMessage::ScanResult { data } => {
                self.scanning = false;
                self.store.set_results(&data)?;
                self.results = data;
                self.add_log("Scan complete", false);
            }
        }
        Ok(())
    }

    /// Called once the scanner's stream has closed. Clears the flag when the
    /// batch ended without a result, e.g. after the empty-config abort.
    pub fn scan_finished(&mut self) {
        self.scanning = false;
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary::from_results(&self.results)
    }

    pub fn medal_sites(&self) -> Vec<&ScanResultEntry> {
        self.results.iter().filter(|r| r.count > 0).collect()
    }

    /// Opens every stored site with at least one medal. Returns how many were opened.
    pub fn open_all(&mut self, opener: &dyn TabOpener) -> Result<usize> {
        let results = match self.store.results()? {
            Some(results) if !results.is_empty() => results,
            _ => {
                self.add_log("No scan results available", true);
                return Ok(0);
            }
        };

        let with_medals: Vec<_> = results.iter().filter(|r| r.count > 0).collect();
        if with_medals.is_empty() {
            self.add_log("No medals detected", true);
            return Ok(0);
        }

        for site in &with_medals {
            opener.open(&site.url)?;
        }
        self.add_log(
            format!("Opened {} sites in the background", with_medals.len()),
            false,
        );
        Ok(with_medals.len())
    }

    pub fn clear_results(&mut self) -> Result<()> {
        self.store.clear_results()?;
        self.results.clear();
        self.add_log("Cleared all scan results", false);
        Ok(())
    }
}

fn parse_import(json: &str) -> Result<Vec<String>> {
    let file: SiteFile = serde_json::from_str(json).context("Missing required sites array")?;

    file.sites
        .iter()
        .map(|site| {
            if site.name.trim().is_empty() || site.url.trim().is_empty() {
                anyhow::bail!("Invalid site entry");
            }
            let url = format!("{}{}", site.url.trim_end_matches('/'), MEDAL_PAGE_PATH);
            Ok(format!("{}|{}", site.name, url))
        })
        .collect()
}
