//! Opening wallet installation pages.
//!
//! When `connect` finds the selected wallet not ready, the session opens the
//! wallet's URL so the user can install it. [`BrowserOpener`] hands the URL to the
//! system browser via the `open` crate; tests and headless hosts plug in their own
//! [`UrlOpener`].

use std::io;

pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs in the default system browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserOpener;

impl UrlOpener for BrowserOpener {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

/// Ignores every URL. For servers and other hosts without a browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOpener;

impl UrlOpener for NoopOpener {
    fn open(&self, _url: &str) -> io::Result<()> {
        Ok(())
    }
}
