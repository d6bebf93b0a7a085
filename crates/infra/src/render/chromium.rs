//! Headless-Chromium PDF engine.
//!
//! Host-proximate infrastructure: requires a Chromium binary on the host.
//! Everything above this module only depends on `PdfEngine`.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::Browser;

use super::{PdfEngine, RenderError};

/// A4 portrait, in inches.
const PAPER_WIDTH_IN: f64 = 8.27;
const PAPER_HEIGHT_IN: f64 = 11.69;

/// Pause after load so web fonts and embedded images settle before capture.
const DEFAULT_SETTLE: Duration = Duration::from_millis(300);

pub struct ChromiumEngine {
    browser: Arc<Browser>,
    settle: Duration,
}

impl ChromiumEngine {
    /// Launch a headless browser for the lifetime of the engine.
    pub fn launch() -> Result<Self, RenderError> {
        let browser = Browser::default().map_err(|e| RenderError::Capture(e.to_string()))?;
        Ok(Self {
            browser: Arc::new(browser),
            settle: DEFAULT_SETTLE,
        })
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

impl PdfEngine for ChromiumEngine {
    fn capture(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| RenderError::Capture(e.to_string()))?;

        let url = format!("data:text/html;base64,{}", BASE64.encode(html));
        tab.navigate_to(&url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| RenderError::Capture(e.to_string()))?;

        std::thread::sleep(self.settle);

        let options = PrintToPdfOptions {
            print_background: Some(true),
            display_header_footer: Some(false),
            prefer_css_page_size: Some(false),
            paper_width: Some(PAPER_WIDTH_IN),
            paper_height: Some(PAPER_HEIGHT_IN),
            margin_top: Some(0.0),
            margin_bottom: Some(0.0),
            margin_left: Some(0.0),
            margin_right: Some(0.0),
            ..PrintToPdfOptions::default()
        };

        let pdf = tab
            .print_to_pdf(Some(options))
            .map_err(|e| RenderError::Capture(e.to_string()))?;

        let _ = tab.close(true);
        Ok(pdf)
    }
}
