use anyhow::{Context, Result};
use std::env;
use std::process::{Command, Stdio};

/// Opens a URL in the user's browser.
pub trait TabOpener {
    fn open(&self, url: &str) -> Result<()>;
}

/// Hands URLs to the operating system's default handler.
pub struct SystemOpener;

impl TabOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let mut command = match env::consts::OS {
            "windows" => {
                let mut c = Command::new("cmd");
                c.args(["/C", "start", "", url]);
                c
            }
            "macos" => {
                let mut c = Command::new("open");
                c.args(["-g", url]);
                c
            }
            _ => {
                let mut c = Command::new("xdg-open");
                c.arg(url);
                c
            }
        };

        command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to open {}", url))?;
        Ok(())
    }
}

/// Prints URLs instead of opening them.
pub struct PrintOpener;

impl TabOpener for PrintOpener {
    fn open(&self, url: &str) -> Result<()> {
        println!("{}", url);
        Ok(())
    }
}
