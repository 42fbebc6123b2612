use std::time::Duration;

use crate::patterns::MarkerMatcher;

/// Per-request timeout applied to the base page and every paginated page.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Upper bound on pages visited per site, base page included.
pub const DEFAULT_MAX_PAGES: usize = 15;

/// Path appended to imported site URLs and stripped again on export.
pub const MEDAL_PAGE_PATH: &str = "/medal.php";

/// Form value that marks a medal as purchasable.
pub const DEFAULT_MARKER: &str = r#"value="购买""#;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Settings for one scan batch.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub timeout: Duration,
    pub max_pages: usize,
    pub user_agent: String,
    pub matcher: MarkerMatcher,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_pages: DEFAULT_MAX_PAGES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            matcher: MarkerMatcher::default(),
        }
    }
}
