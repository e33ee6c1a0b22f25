//! # encounter-driver
//!
//! The browser seam used by encounter-copy. Everything the game model needs
//! from a browser goes through the [`Driver`] trait: navigate, run a script and
//! get JSON back, look an element up, click it, and open/close popup sub-forms.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use encounter_driver::{BrowserConfig, Driver, EokaDriver};
//!
//! # #[tokio::main]
//! # async fn main() -> encounter_driver::Result<()> {
//! let mut driver = EokaDriver::launch(&BrowserConfig::default()).await?;
//! driver.goto("http://demo.en.cx/").await?;
//! let title: String = driver.eval("document.title").await?;
//! println!("{title}");
//! driver.close().await?;
//! # Ok(())
//! # }
//! ```

mod eoka_driver;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod popup;
pub mod settle;

pub use eoka_driver::{BrowserConfig, EokaDriver, Viewport};
pub use popup::close_after;
pub use settle::{settle, Presence};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a [`Driver`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    /// A script threw, or the page it ran in went away.
    #[error("script fault: {0}")]
    Script(String),

    #[error("element not found: {0}")]
    NotFound(String),

    /// A popup could not be opened, or none was open when closing.
    #[error("popup error: {0}")]
    Popup(String),

    #[error("unexpected script result: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Faults that a fresh login and a reload of the page usually clear:
    /// stale popups and scripts that died with an expired session.
    pub fn is_script_fault(&self) -> bool {
        matches!(self, Error::Script(_) | Error::Popup(_))
    }
}

/// Snapshot of one DOM element, as returned by [`Driver::find`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Element {
    /// Lowercase tag name.
    #[serde(default)]
    pub tag: String,
    /// `textContent`, trimmed.
    #[serde(default)]
    pub text: String,
    /// `value` for form controls.
    #[serde(default)]
    pub value: Option<String>,
    /// `checked` for radios and checkboxes.
    #[serde(default)]
    pub checked: bool,
    /// `href` attribute (not resolved).
    #[serde(default)]
    pub href: Option<String>,
}

impl Element {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn with_href(href: impl Into<String>) -> Self {
        Self {
            tag: "a".into(),
            href: Some(href.into()),
            ..Default::default()
        }
    }

    pub fn checked() -> Self {
        Self {
            tag: "input".into(),
            checked: true,
            ..Default::default()
        }
    }
}

/// A single browser session driving one site.
///
/// Implementations are used strictly sequentially; a popup opened with
/// [`Driver::open_popup`] becomes the active window until
/// [`Driver::close_popup`] puts the main window back in focus.
#[allow(async_fn_in_trait)]
pub trait Driver {
    /// Navigate the active window.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// URL of the active window.
    async fn url(&mut self) -> Result<String>;

    /// Evaluate a script expression in the active window and return its value.
    async fn run_script(&mut self, js: &str) -> Result<Value>;

    /// Look up the first element matching a CSS selector.
    async fn find(&mut self, selector: &str) -> Result<Option<Element>>;

    /// Click the first element matching a CSS selector.
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Run `script` (typically a `GameEditor(...)` call or a `javascript:` href)
    /// and switch focus to the window it opens.
    async fn open_popup(&mut self, script: &str) -> Result<()>;

    /// Close the focused popup and switch back to the main window.
    async fn close_popup(&mut self) -> Result<()>;

    /// Fixed delay in milliseconds.
    async fn wait(&mut self, ms: u64);

    /// PNG screenshot of the active window.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Evaluate a script and decode its value.
    async fn eval<T: DeserializeOwned>(&mut self, js: &str) -> Result<T> {
        let value = self.run_script(js).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Run a script for its side effects.
    async fn exec(&mut self, js: &str) -> Result<()> {
        self.run_script(js).await.map(|_| ())
    }

    async fn exists(&mut self, selector: &str) -> Result<bool> {
        Ok(self.find(selector).await?.is_some())
    }

    /// Like [`Driver::find`], but a missing element is an error.
    async fn require(&mut self, selector: &str) -> Result<Element> {
        self.find(selector)
            .await?
            .ok_or_else(|| Error::NotFound(selector.to_string()))
    }
}

impl<D: Driver> Driver for &mut D {
    async fn goto(&mut self, url: &str) -> Result<()> {
        (**self).goto(url).await
    }

    async fn url(&mut self) -> Result<String> {
        (**self).url().await
    }

    async fn run_script(&mut self, js: &str) -> Result<Value> {
        (**self).run_script(js).await
    }

    async fn find(&mut self, selector: &str) -> Result<Option<Element>> {
        (**self).find(selector).await
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        (**self).click(selector).await
    }

    async fn open_popup(&mut self, script: &str) -> Result<()> {
        (**self).open_popup(script).await
    }

    async fn close_popup(&mut self) -> Result<()> {
        (**self).close_popup().await
    }

    async fn wait(&mut self, ms: u64) {
        (**self).wait(ms).await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        (**self).screenshot().await
    }

    async fn exec(&mut self, js: &str) -> Result<()> {
        (**self).exec(js).await
    }
}

/// Quote a string as a JavaScript string literal.
pub fn js_str(s: &str) -> String {
    Value::from(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes_quotes_and_newlines() {
        assert_eq!(js_str("plain"), "\"plain\"");
        assert_eq!(js_str("say \"hi\""), r#""say \"hi\"""#);
        assert_eq!(js_str("a\nb"), r#""a\nb""#);
        assert_eq!(js_str("back`tick"), "\"back`tick\"");
    }

    #[test]
    fn test_script_fault_classification() {
        assert!(Error::Script("stale".into()).is_script_fault());
        assert!(Error::Popup("no window".into()).is_script_fault());
        assert!(!Error::NotFound("#x".into()).is_script_fault());
    }

    #[test]
    fn test_element_decodes_partial_json() {
        let el: Element = serde_json::from_str(r#"{"tag":"a","href":"/x"}"#).unwrap();
        assert_eq!(el.tag, "a");
        assert_eq!(el.href.as_deref(), Some("/x"));
        assert!(!el.checked);
        assert_eq!(el.value, None);
    }

    async fn title_of<D: Driver>(mut driver: D) -> Result<String> {
        driver.goto("http://demo.en.cx/").await?;
        driver.eval("document.title").await
    }

    #[tokio::test]
    async fn test_borrowed_driver_forwards() {
        let mut mock = mock::MockDriver::new();
        mock.on_script("document.title", Value::from("Admin"));
        assert_eq!(title_of(&mut mock).await.unwrap(), "Admin");
        assert_eq!(mock.visited(), vec!["http://demo.en.cx/"]);
    }
}
