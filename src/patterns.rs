use anyhow::{Context, Result};
use regex::Regex;

use crate::config::DEFAULT_MARKER;

/// Strategy for counting medal markers in a page.
#[derive(Debug, Clone)]
pub enum MarkerMatcher {
    /// Non-overlapping literal substring occurrences.
    Literal(String),
    /// Non-overlapping regex matches.
    Pattern(Regex),
}

impl Default for MarkerMatcher {
    fn default() -> Self {
        MarkerMatcher::Literal(DEFAULT_MARKER.to_string())
    }
}

impl MarkerMatcher {
    /// Picks a matcher from CLI input; a regex wins over a literal, and neither
    /// falls back to the default marker.
    pub fn from_options(literal: Option<&str>, pattern: Option<&str>) -> Result<Self> {
        if let Some(pattern) = pattern {
            let regex = Regex::new(pattern)
                .with_context(|| format!("Invalid marker pattern: {}", pattern))?;
            return Ok(MarkerMatcher::Pattern(regex));
        }

        match literal {
            Some(s) if s.is_empty() => anyhow::bail!("Marker must not be empty"),
            Some(s) => Ok(MarkerMatcher::Literal(s.to_string())),
            None => Ok(MarkerMatcher::default()),
        }
    }

    pub fn count(&self, html: &str) -> usize {
        match self {
            MarkerMatcher::Literal(marker) => html.matches(marker.as_str()).count(),
            MarkerMatcher::Pattern(regex) => regex.find_iter(html).count(),
        }
    }
}

/// Whether `html` links to `?page=<index>` through an `href` attribute.
pub fn has_page_link(html: &str, index: usize) -> bool {
    // The pattern is built from an integer, so it always compiles.
    Regex::new(&format!(r#"href\s*=\s*["']\?page={}["']"#, index))
        .map(|regex| regex.is_match(html))
        .unwrap_or(false)
}
