use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Result as SqliteResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::cookies::{Cookie, CookieJar};

/// 1601-01-01T00:00:00Z as seconds relative to the Unix epoch.
const CHROME_EPOCH_OFFSET_SECS: i64 = -11_644_473_600;

/// On-disk cookie database layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSchema {
    /// `cookies` table used by Chrome, Chromium, Edge, Vivaldi and Brave.
    Chromium,
    /// `moz_cookies` table used by Firefox.
    Firefox,
}

impl CookieSchema {
    pub fn for_browser(browser: &str) -> Result<Self> {
        match browser.to_lowercase().as_str() {
            "chrome" | "chromium" | "edge" | "vivaldi" | "brave" => Ok(CookieSchema::Chromium),
            "firefox" => Ok(CookieSchema::Firefox),
            other => anyhow::bail!("Unsupported browser '{}'", other),
        }
    }
}

pub fn get_browser_cookie_path(browser: &str) -> Result<PathBuf> {
    let system = env::consts::OS;
    let home = PathBuf::from(env::var("HOME").or_else(|_| env::var("USERPROFILE"))?);

    let browser_key = browser.to_lowercase();
    if browser_key == "firefox" {
        let profiles_dir = match system {
            "windows" => PathBuf::from(env::var("APPDATA")?).join("Mozilla/Firefox/Profiles"),
            "macos" => home.join("Library/Application Support/Firefox/Profiles"),
            "linux" => home.join(".mozilla/firefox"),
            _ => anyhow::bail!("Unsupported operating system '{}'", system),
        };
        let path = find_firefox_profile(&profiles_dir)?.join("cookies.sqlite");
        info!(action = "resolve", component = "cookie_path", browser = browser, path = ?path, "Browser cookie path resolved");
        return Ok(path);
    }

    let profile_dir = match (browser_key.as_str(), system) {
        ("chrome", "windows") => {
            PathBuf::from(env::var("LOCALAPPDATA")?).join("Google/Chrome/User Data/Default")
        }
        ("chrome", "macos") => home.join("Library/Application Support/Google/Chrome/Default"),
        ("chrome", "linux") => home.join(".config/google-chrome/Default"),
        ("chromium", "windows") => {
            PathBuf::from(env::var("LOCALAPPDATA")?).join("Chromium/User Data/Default")
        }
        ("chromium", "macos") => home.join("Library/Application Support/Chromium/Default"),
        ("chromium", "linux") => home.join(".config/chromium/Default"),
        ("edge", "windows") => {
            PathBuf::from(env::var("LOCALAPPDATA")?).join("Microsoft/Edge/User Data/Default")
        }
        ("edge", "macos") => home.join("Library/Application Support/Microsoft Edge/Default"),
        ("edge", "linux") => home.join(".config/microsoft-edge/Default"),
        ("vivaldi", "windows") => {
            PathBuf::from(env::var("LOCALAPPDATA")?).join("Vivaldi/User Data/Default")
        }
        ("vivaldi", "macos") => home.join("Library/Application Support/Vivaldi/Default"),
        ("vivaldi", "linux") => home.join(".config/vivaldi/Default"),
        ("brave", "windows") => PathBuf::from(env::var("LOCALAPPDATA")?)
            .join("BraveSoftware/Brave-Browser/User Data/Default"),
        ("brave", "macos") => {
            home.join("Library/Application Support/BraveSoftware/Brave-Browser/Default")
        }
        ("brave", "linux") => home.join(".config/BraveSoftware/Brave-Browser/Default"),
        _ => anyhow::bail!(
            "Unsupported browser '{}' or operating system '{}'",
            browser,
            system
        ),
    };

    // Chromium 96+ moved the database under Network/
    let network = profile_dir.join("Network/Cookies");
    let path = if network.exists() {
        network
    } else {
        profile_dir.join("Cookies")
    };

    info!(action = "resolve", component = "cookie_path", browser = browser, path = ?path, "Browser cookie path resolved");
    Ok(path)
}

fn find_firefox_profile(profiles_dir: &Path) -> Result<PathBuf> {
    let mut profiles: Vec<PathBuf> = fs::read_dir(profiles_dir)
        .with_context(|| format!("Firefox profile directory not found at {:?}", profiles_dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    profiles.sort();

    for suffix in [".default-release", ".default"] {
        if let Some(profile) = profiles.iter().find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(suffix))
        }) {
            return Ok(profile.clone());
        }
    }

    anyhow::bail!("No default Firefox profile found in {:?}", profiles_dir)
}

pub fn copy_cookie_database(cookie_path: &Path, temp_path: Option<&Path>) -> Result<PathBuf> {
    let start_time = Instant::now();
    info!(action = "start", component = "database_copy", "Copying browser cookie database");

    let temp_path = temp_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| env::temp_dir().join("medalscan_cookies_copy.db"));

    info!(action = "copy", component = "database_copy", source = ?cookie_path, destination = ?temp_path, "Database copy paths");

    if !cookie_path.exists() {
        anyhow::bail!("Cookie database not found at {:?}", cookie_path);
    }

    fs::copy(cookie_path, &temp_path)?;

    let copy_time = start_time.elapsed();
    info!(action = "complete", component = "database_copy", duration_ms = copy_time.as_millis(), "Database copy completed");
    Ok(temp_path)
}

/// Reads every usable cookie from an opened cookie database.
///
/// Rows without a plaintext value are skipped; Chromium normally keeps the
/// value only in the encrypted column. Expired cookies are dropped for both
/// schemas.
pub fn read_cookies(conn: &Connection, schema: CookieSchema) -> Result<Vec<Cookie>> {
    let start_time = Instant::now();
    info!(action = "start", component = "cookie_query", schema = ?schema, "Querying cookie rows");

    let rows: Vec<(Cookie, Option<DateTime<Utc>>)> = match schema {
        CookieSchema::Chromium => conn
            .prepare(
                "SELECT host_key, name, value, path, is_secure, expires_utc, has_expires FROM cookies",
            )?
            .query_map([], |row| {
                let has_expires = row.get::<_, i64>(6)? != 0;
                let expires = if has_expires {
                    chromium_time(row.get(5)?)
                } else {
                    None
                };
                Ok((
                    Cookie {
                        domain: row.get(0)?,
                        name: row.get(1)?,
                        value: row.get(2)?,
                        path: row.get(3)?,
                        secure: row.get::<_, i64>(4)? != 0,
                    },
                    expires,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()
            .context("Failed to query Chromium cookies")?,
        CookieSchema::Firefox => conn
            .prepare("SELECT host, name, value, path, isSecure, expiry FROM moz_cookies")?
            .query_map([], |row| {
                Ok((
                    Cookie {
                        domain: row.get(0)?,
                        name: row.get(1)?,
                        value: row.get(2)?,
                        path: row.get(3)?,
                        secure: row.get::<_, i64>(4)? != 0,
                    },
                    unix_time(row.get(5)?),
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()
            .context("Failed to query Firefox cookies")?,
    };

    let now = Utc::now();
    let total = rows.len();
    let mut empty_values = 0usize;
    let mut expired = 0usize;
    let mut cookies = Vec::with_capacity(total);

    for (cookie, expires) in rows {
        if cookie.value.is_empty() {
            empty_values += 1;
            continue;
        }
        if expires.is_some_and(|at| at < now) {
            expired += 1;
            continue;
        }
        cookies.push(cookie);
    }

    if empty_values > 0 {
        warn!(
            action = "filter",
            component = "cookie_query",
            skipped = empty_values,
            "Skipped cookies without a plaintext value"
        );
    }
    if schema == CookieSchema::Chromium && cookies.is_empty() && empty_values > 0 {
        warn!(
            action = "filter",
            component = "cookie_query",
            "No plaintext Chromium cookies; encrypted values are not supported, try --browser firefox"
        );
    }

    info!(
        action = "complete",
        component = "cookie_query",
        total_rows = total,
        usable = cookies.len(),
        expired,
        duration_ms = start_time.elapsed().as_millis(),
        "Cookie query completed"
    );
    Ok(cookies)
}

/// Chromium stores times as microseconds since 1601-01-01. Out-of-range
/// values yield `None` and are treated as never expiring.
fn chromium_time(micros: i64) -> Option<DateTime<Utc>> {
    let chrome_epoch = DateTime::from_timestamp(CHROME_EPOCH_OFFSET_SECS, 0)?;
    chrome_epoch.checked_add_signed(Duration::microseconds(micros))
}

/// Firefox stores seconds since the Unix epoch; zero or less means a session cookie.
fn unix_time(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

/// Copies the cookie database aside, reads it into a jar and removes the copy.
pub fn load_cookie_jar(
    cookie_path: &Path,
    schema: CookieSchema,
    temp_path: Option<&Path>,
) -> Result<CookieJar> {
    let temp_cookie_path = copy_cookie_database(cookie_path, temp_path)?;

    let conn = Connection::open(&temp_cookie_path)?;
    let cookies = read_cookies(&conn, schema);
    drop(conn);

    if let Err(e) = fs::remove_file(&temp_cookie_path) {
        warn!(action = "cleanup", component = "database_copy", error = %e, "Failed to remove temporary file");
    }

    Ok(CookieJar::new(cookies?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Microseconds between 1601-01-01 and 1970-01-01.
    const EPOCH_DELTA_MICROS: i64 = 11_644_473_600_000_000;

    fn chromium_db(path: &Path) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE cookies (host_key TEXT, name TEXT, value TEXT, encrypted_value BLOB,
                path TEXT, expires_utc INTEGER, is_secure INTEGER, has_expires INTEGER);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn chromium_rows_skip_expired_and_encrypted() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("Cookies");
        let conn = chromium_db(&db);

        let future = (Utc::now().timestamp() + 86_400) * 1_000_000 + EPOCH_DELTA_MICROS;
        let past = (Utc::now().timestamp() - 86_400) * 1_000_000 + EPOCH_DELTA_MICROS;
        conn.execute(
            "INSERT INTO cookies VALUES ('.example.com', 'uid', '1', x'', '/', ?1, 0, 1)",
            [future],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO cookies VALUES ('.example.com', 'old', '2', x'', '/', ?1, 0, 1)",
            [past],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO cookies VALUES ('.example.com', 'enc', '', x'763130', '/', 0, 1, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO cookies VALUES ('pt.example.com', 'session', 's', x'', '/', 0, 1, 0)",
            [],
        )
        .unwrap();
        drop(conn);

        let copy = dir.path().join("copy.db");
        let jar = load_cookie_jar(&db, CookieSchema::Chromium, Some(&copy)).unwrap();
        assert_eq!(jar.len(), 2);
        assert!(!copy.exists());
    }

    #[test]
    fn firefox_rows_are_read() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("cookies.sqlite");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE moz_cookies (id INTEGER PRIMARY KEY, name TEXT, value TEXT, host TEXT,
                path TEXT, expiry INTEGER, isSecure INTEGER);
             INSERT INTO moz_cookies (name, value, host, path, expiry, isSecure)
                VALUES ('uid', '1', '.a.test', '/', 0, 0);",
        )
        .unwrap();

        let cookies = read_cookies(&conn, CookieSchema::Firefox).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].domain, ".a.test");
        assert!(!cookies[0].secure);
    }

    #[test]
    fn firefox_rows_skip_expired() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("cookies.sqlite");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE moz_cookies (id INTEGER PRIMARY KEY, name TEXT, value TEXT, host TEXT,
                path TEXT, expiry INTEGER, isSecure INTEGER);",
        )
        .unwrap();
        let future = Utc::now().timestamp() + 86_400;
        let past = Utc::now().timestamp() - 86_400;
        conn.execute(
            "INSERT INTO moz_cookies (name, value, host, path, expiry, isSecure)
                VALUES ('uid', '1', '.a.test', '/', ?1, 1)",
            [future],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO moz_cookies (name, value, host, path, expiry, isSecure)
                VALUES ('old', '2', '.a.test', '/', ?1, 0)",
            [past],
        )
        .unwrap();

        let cookies = read_cookies(&conn, CookieSchema::Firefox).unwrap();
        let names: Vec<&str> = cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["uid"]);
        assert!(cookies[0].secure);
    }

    #[test]
    fn out_of_range_expiry_is_kept() {
        let dir = TempDir::new().unwrap();
        let conn = chromium_db(&dir.path().join("Cookies"));
        conn.execute(
            "INSERT INTO cookies VALUES ('.example.com', 'far', 'f', x'', '/', ?1, 0, 1)",
            [i64::MAX],
        )
        .unwrap();

        assert!(chromium_time(i64::MAX).is_none());
        let cookies = read_cookies(&conn, CookieSchema::Chromium).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "far");
    }

    #[test]
    fn chromium_time_matches_unix_epoch() {
        let at = chromium_time(EPOCH_DELTA_MICROS).unwrap();
        assert_eq!(at.timestamp(), 0);
    }

    #[test]
    fn missing_database_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = load_cookie_jar(
            &dir.path().join("missing"),
            CookieSchema::Chromium,
            Some(&dir.path().join("copy.db")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn firefox_profile_prefers_default_release() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("abc.default")).unwrap();
        fs::create_dir(dir.path().join("xyz.default-release")).unwrap();
        let profile = find_firefox_profile(dir.path()).unwrap();
        assert!(profile.ends_with("xyz.default-release"));
    }

    #[test]
    fn schema_by_browser_name() {
        assert_eq!(CookieSchema::for_browser("Vivaldi").unwrap(), CookieSchema::Chromium);
        assert_eq!(CookieSchema::for_browser("firefox").unwrap(), CookieSchema::Firefox);
        assert!(CookieSchema::for_browser("netscape").is_err());
    }
}
