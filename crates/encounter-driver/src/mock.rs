//! In-memory scripted [`Driver`] for tests.
//!
//! Script results are canned by substring: the rule with the longest needle
//! contained in the script wins. Each rule holds a queue of values; the last
//! one keeps answering once the queue is drained. Unmatched scripts return
//! `null`. Elements are registered per selector and visible in every window.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use crate::{Driver, Element, Error, Result};

/// One recorded interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Goto(String),
    Script(String),
    Click(String),
    OpenPopup(String),
    ClosePopup,
    Wait(u64),
    Screenshot,
}

#[derive(Debug)]
struct Rule {
    needle: String,
    values: VecDeque<Value>,
}

#[derive(Debug)]
struct Fault {
    needle: String,
    remaining: usize,
}

/// Scripted browser double.
#[derive(Debug, Default)]
pub struct MockDriver {
    url: String,
    rules: Vec<Rule>,
    elements: HashMap<String, Element>,
    faults: Vec<Fault>,
    calls: Vec<Call>,
    popup_depth: usize,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            url: "about:blank".into(),
            ..Default::default()
        }
    }

    /// Answer scripts containing `needle` with `value` (queued after earlier
    /// values for the same needle).
    pub fn on_script(&mut self, needle: impl Into<String>, value: Value) -> &mut Self {
        let needle = needle.into();
        match self.rules.iter_mut().find(|r| r.needle == needle) {
            Some(rule) => rule.values.push_back(value),
            None => self.rules.push(Rule {
                needle,
                values: VecDeque::from([value]),
            }),
        }
        self
    }

    /// Register an element under an exact selector.
    pub fn element(&mut self, selector: impl Into<String>, element: Element) -> &mut Self {
        self.elements.insert(selector.into(), element);
        self
    }

    pub fn remove_element(&mut self, selector: &str) -> &mut Self {
        self.elements.remove(selector);
        self
    }

    /// Make the next `times` scripts or popup openings containing `needle`
    /// fail with [`Error::Script`].
    pub fn fail_script(&mut self, needle: impl Into<String>, times: usize) -> &mut Self {
        self.faults.push(Fault {
            needle: needle.into(),
            remaining: times,
        });
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Scripts run so far, in order.
    pub fn scripts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Script(js) => Some(js.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Selectors clicked so far, in order.
    pub fn clicks(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Click(sel) => Some(sel.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Popup scripts opened so far, in order.
    pub fn popups(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::OpenPopup(script) => Some(script.as_str()),
                _ => None,
            })
            .collect()
    }

    /// URLs navigated to so far, in order.
    pub fn visited(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Goto(url) => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn popup_depth(&self) -> usize {
        self.popup_depth
    }

    fn take_fault(&mut self, text: &str) -> Option<Error> {
        let fault = self
            .faults
            .iter_mut()
            .find(|f| f.remaining > 0 && text.contains(&f.needle))?;
        fault.remaining -= 1;
        Some(Error::Script(format!("injected fault for '{}'", fault.needle)))
    }

    fn answer(&mut self, js: &str) -> Value {
        let rule = self
            .rules
            .iter_mut()
            .filter(|r| js.contains(&r.needle))
            .max_by_key(|r| r.needle.len());
        match rule {
            Some(rule) if rule.values.len() > 1 => rule.values.pop_front().unwrap_or(Value::Null),
            Some(rule) => rule.values.front().cloned().unwrap_or(Value::Null),
            None => Value::Null,
        }
    }
}

impl Driver for MockDriver {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.calls.push(Call::Goto(url.to_string()));
        self.url = url.to_string();
        Ok(())
    }

    async fn url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn run_script(&mut self, js: &str) -> Result<Value> {
        self.calls.push(Call::Script(js.to_string()));
        if let Some(e) = self.take_fault(js) {
            return Err(e);
        }
        Ok(self.answer(js))
    }

    async fn find(&mut self, selector: &str) -> Result<Option<Element>> {
        Ok(self.elements.get(selector).cloned())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.calls.push(Call::Click(selector.to_string()));
        Ok(())
    }

    async fn open_popup(&mut self, script: &str) -> Result<()> {
        self.calls.push(Call::OpenPopup(script.to_string()));
        if let Some(e) = self.take_fault(script) {
            return Err(e);
        }
        if self.popup_depth > 0 {
            return Err(Error::Popup("a popup is already open".into()));
        }
        self.popup_depth += 1;
        Ok(())
    }

    async fn close_popup(&mut self) -> Result<()> {
        if self.popup_depth == 0 {
            return Err(Error::Popup("no popup is open".into()));
        }
        self.calls.push(Call::ClosePopup);
        self.popup_depth -= 1;
        Ok(())
    }

    async fn wait(&mut self, ms: u64) {
        self.calls.push(Call::Wait(ms));
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.calls.push(Call::Screenshot);
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_longest_needle_wins() {
        let mut driver = MockDriver::new();
        driver
            .on_script("length", json!(1))
            .on_script("txtLevelName_", json!(7));
        let n: u32 = driver
            .eval(r#"$('input[name*="txtLevelName_"]').length"#)
            .await
            .unwrap();
        assert_eq!(n, 7);
    }

    #[tokio::test]
    async fn test_queued_values_then_sticky_last() {
        let mut driver = MockDriver::new();
        driver
            .on_script("hrefs", json!(["a"]))
            .on_script("hrefs", json!(["a", "b"]));
        let first: Vec<String> = driver.eval("hrefs").await.unwrap();
        let second: Vec<String> = driver.eval("hrefs").await.unwrap();
        let third: Vec<String> = driver.eval("hrefs").await.unwrap();
        assert_eq!(first, vec!["a"]);
        assert_eq!(second, vec!["a", "b"]);
        assert_eq!(third, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_injected_fault_is_consumed() {
        let mut driver = MockDriver::new();
        driver.fail_script("btnUpdate", 1);
        let err = driver.exec("$('#btnUpdate').click()").await.unwrap_err();
        assert!(err.is_script_fault());
        driver.exec("$('#btnUpdate').click()").await.unwrap();
    }

    #[tokio::test]
    async fn test_unmatched_script_is_null() {
        let mut driver = MockDriver::new();
        let v = driver.run_script("anything").await.unwrap();
        assert!(v.is_null());
        assert_eq!(driver.scripts(), vec!["anything"]);
    }
}
