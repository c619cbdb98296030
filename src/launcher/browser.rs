use std::io;

use crate::launcher::error::LauncherError;

/// Something that can show a URL to the user.
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// The platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        tracing::info!("opening {url} in the default browser");
        webbrowser::open(url)
    }
}

/// Open `url`, translating the failure into the message shown in the output log.
pub fn open(browser: &dyn Browser, url: &str) -> Result<(), LauncherError> {
    browser
        .open(url)
        .map_err(|err| browser_error(std::env::consts::OS, err))
}

fn browser_error(os: &str, err: io::Error) -> LauncherError {
    match err.kind() {
        io::ErrorKind::Unsupported => LauncherError::UnsupportedPlatform(os.to_string()),
        _ => LauncherError::Browser(err),
    }
}
