use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One configured tracker: a display name and its medal page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
}

impl SiteConfig {
    /// Parses a `name|url` line. Fields past the second `|` are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split('|');
        let name = fields.next()?.trim();
        let url = fields.next()?.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            url: url.to_string(),
        })
    }

    pub fn to_line(&self) -> String {
        format!("{}|{}", self.name, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResultEntry {
    pub site_name: String,
    pub count: usize,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub text: String,
    pub is_error: bool,
    pub timestamp: DateTime<Local>,
}

impl LogEntry {
    pub fn new(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            text: text.into(),
            is_error,
            timestamp: Local::now(),
        }
    }
}

/// Messages streamed from the scanner to the controller. A batch emits any
/// number of `ScanLog` messages followed by at most one `ScanResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScanMessage {
    #[serde(rename_all = "camelCase")]
    ScanLog { text: String, is_error: bool },
    ScanResult { data: Vec<ScanResultEntry> },
}

impl ScanMessage {
    pub fn log(text: impl Into<String>) -> Self {
        ScanMessage::ScanLog {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ScanMessage::ScanLog {
            text: text.into(),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlMessage {
    StartScan,
}

/// One entry of an import/export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Import/export file layout: `{ "sites": [{ "name", "url" }] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFile {
    pub sites: Vec<SiteRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_site_line() {
        let site = SiteConfig::parse(" A | http://a.test/medal.php ").unwrap();
        assert_eq!(site.name, "A");
        assert_eq!(site.url, "http://a.test/medal.php");
        assert_eq!(site.to_line(), "A|http://a.test/medal.php");
    }

    #[test]
    fn parse_rejects_missing_url() {
        assert!(SiteConfig::parse("no separator").is_none());
        assert!(SiteConfig::parse("A|").is_none());
        assert_eq!(
            SiteConfig::parse("A|http://a.test|extra").unwrap().url,
            "http://a.test"
        );
    }

    #[test]
    fn messages_use_extension_wire_shape() {
        let log = serde_json::to_value(ScanMessage::error("boom")).unwrap();
        assert_eq!(
            log,
            serde_json::json!({"type": "scanLog", "text": "boom", "isError": true})
        );

        let result = serde_json::to_value(ScanMessage::ScanResult {
            data: vec![ScanResultEntry {
                site_name: "A".into(),
                count: 3,
                url: "http://a.test/medal.php".into(),
            }],
        })
        .unwrap();
        assert_eq!(
            result,
            serde_json::json!({
                "type": "scanResult",
                "data": [{"siteName": "A", "count": 3, "url": "http://a.test/medal.php"}]
            })
        );

        let start: ControlMessage = serde_json::from_str(r#"{"action":"startScan"}"#).unwrap();
        assert_eq!(start, ControlMessage::StartScan);
    }
}
