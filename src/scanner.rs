use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::config::ScanConfig;
use crate::cookies::{cookie_header, merge_unique, CookieStore};
use crate::domain::cookie_domain;
use crate::fetch::{FetchError, Fetcher};
use crate::model::{ControlMessage, ScanMessage, ScanResultEntry, SiteConfig};
use crate::patterns::has_page_link;
use crate::store::Store;

/// Walks the configured sites one at a time and streams progress to a
/// [`ScanMessage`] channel.
pub struct Scanner<C, F> {
    config: ScanConfig,
    cookies: C,
    fetcher: F,
}

/// Forwards a message to the controller and mirrors it to tracing.
fn emit(tx: &UnboundedSender<ScanMessage>, message: ScanMessage) {
    if let ScanMessage::ScanLog { text, is_error } = &message {
        if *is_error {
            warn!(component = "scanner", "{}", text);
        } else {
            info!(component = "scanner", "{}", text);
        }
    }
    // A closed receiver means nobody is listening; the batch still completes.
    let _ = tx.send(message);
}

impl<C: CookieStore, F: Fetcher> Scanner<C, F> {
    pub fn new(config: ScanConfig, cookies: C, fetcher: F) -> Self {
        Self {
            config,
            cookies,
            fetcher,
        }
    }

    /// Runs one batch over the sites in `store`.
    ///
    /// An empty configuration emits a single error log and nothing else.
    /// Otherwise the results replace the stored set and one `ScanResult`
    /// message closes the stream.
    pub async fn run(
        &self,
        store: &Store,
        tx: &UnboundedSender<ScanMessage>,
    ) -> Result<Vec<ScanResultEntry>> {
        let batch_start = Instant::now();
        let sites = store.sites()?;

        if sites.is_empty() {
            emit(tx, ScanMessage::error("Error: no sites configured for scanning"));
            return Ok(Vec::new());
        }

        info!(action = "start", component = "scanner", site_count = sites.len(), "Starting scan batch");

        let mut results = Vec::new();
        for line in &sites {
            let site = match SiteConfig::parse(line) {
                Some(site) => site,
                None => {
                    emit(tx, ScanMessage::error(format!("Invalid site entry: {}", line)));
                    continue;
                }
            };
            if let Some(entry) = self.scan_site(&site, tx).await {
                results.push(entry);
            }
        }

        store.set_results(&results)?;
        emit(
            tx,
            ScanMessage::ScanResult {
                data: results.clone(),
            },
        );

        info!(
            action = "complete",
            component = "scanner",
            result_count = results.len(),
            duration_ms = batch_start.elapsed().as_millis(),
            "Scan batch completed"
        );
        Ok(results)
    }

    /// Worker loop: runs a batch for every `StartScan` until the control
    /// channel closes. Dropping `tx` on return closes the message stream.
    pub async fn serve(
        self,
        store: Arc<Store>,
        mut control: UnboundedReceiver<ControlMessage>,
        tx: UnboundedSender<ScanMessage>,
    ) -> Result<()> {
        while let Some(message) = control.recv().await {
            match message {
                ControlMessage::StartScan => {
                    self.run(&store, &tx).await?;
                }
            }
        }
        Ok(())
    }

    /// Scans one site. `None` means the site was skipped; the reason has
    /// already been logged.
    pub async fn scan_site(
        &self,
        site: &SiteConfig,
        tx: &UnboundedSender<ScanMessage>,
    ) -> Option<ScanResultEntry> {
        match self.try_scan_site(site, tx).await {
            Ok(entry) => entry,
            Err(FetchError::Timeout) => {
                emit(
                    tx,
                    ScanMessage::error(format!(
                        "Request timed out: {} (no response in {} seconds)",
                        site.name,
                        self.config.timeout.as_secs()
                    )),
                );
                None
            }
            Err(FetchError::Status(status)) => {
                emit(
                    tx,
                    ScanMessage::error(format!("Request failed: {} (HTTP {})", site.name, status)),
                );
                None
            }
            Err(FetchError::Network(reason)) => {
                emit(
                    tx,
                    ScanMessage::error(format!("Scan failed: {} ({})", site.name, reason)),
                );
                None
            }
        }
    }

    async fn try_scan_site(
        &self,
        site: &SiteConfig,
        tx: &UnboundedSender<ScanMessage>,
    ) -> Result<Option<ScanResultEntry>, FetchError> {
        let domain = cookie_domain(&site.url);
        let (by_url, by_domain) = tokio::join!(
            self.cookies.cookies_for_url(&site.url),
            self.cookies.cookies_for_domain(&domain)
        );
        let by_url = by_url.map_err(|e| FetchError::Network(format!("{:#}", e)))?;
        let by_domain = by_domain.map_err(|e| FetchError::Network(format!("{:#}", e)))?;
        let cookies = merge_unique([by_url, by_domain]);

        if cookies.is_empty() {
            emit(
                tx,
                ScanMessage::error(format!("Warning: no valid cookies found for {}", site.name)),
            );
            return Ok(None);
        }

        let header = cookie_header(&cookies);
        let mut html = self.fetcher.get(&site.url, &header).await?;
        let mut count = self.config.matcher.count(&html);
        let mut pages = 1;

        for index in 1..self.config.max_pages {
            if !has_page_link(&html, index) {
                break;
            }

            let page_url = format!("{}?page={}", site.url, index);
            match self.fetcher.get(&page_url, &header).await {
                Ok(page) => {
                    count += self.config.matcher.count(&page);
                    pages += 1;
                    html = page;
                }
                Err(FetchError::Timeout) => {
                    emit(
                        tx,
                        ScanMessage::error(format!(
                            "Page request timed out: {} page {}",
                            site.name, index
                        )),
                    );
                    break;
                }
                Err(e) => {
                    emit(
                        tx,
                        ScanMessage::error(format!(
                            "Page request failed: {} page {} ({})",
                            site.name, index, e
                        )),
                    );
                    break;
                }
            }
        }

        emit(
            tx,
            ScanMessage::log(format!(
                "{}: {} page(s), found {} purchasable medal(s)",
                site.name, pages, count
            )),
        );

        Ok(Some(ScanResultEntry {
            site_name: site.name.clone(),
            count,
            url: site.url.clone(),
        }))
    }
}
