//! Field-level helpers shared by the entity readers and writers.
//!
//! Values always travel into the page as JSON literals.

use encounter_driver::{js_str, Driver};
use serde::de::DeserializeOwned;

use crate::Result;

/// First `select.input` of a form holds the dedicated team; `0` is everyone.
const READ_TEAM_JS: &str = r#"(() => {
    const s = document.querySelector('select.input');
    const v = s ? parseInt(s.value, 10) : 0;
    return isNaN(v) ? 0 : v;
})()"#;

/// `[name="..."]`
pub(crate) fn named(name: &str) -> String {
    format!(r#"[name="{name}"]"#)
}

/// Evaluate a script whose `null` result means "nothing there".
pub(crate) async fn eval_or_default<D, T>(driver: &mut D, js: &str) -> Result<T>
where
    D: Driver,
    T: DeserializeOwned + Default,
{
    Ok(driver.eval::<Option<T>>(js).await?.unwrap_or_default())
}

/// Set named fields, in order, in one script. Missing fields are ignored.
pub(crate) async fn fill<D: Driver>(driver: &mut D, fields: &[(&str, String)]) -> Result<()> {
    let pairs = serde_json::to_string(fields).map_err(encounter_driver::Error::from)?;
    let js = format!(
        r#"(() => {{
    for (const [n, v] of {pairs}) {{
        const el = document.querySelector('[name="' + n + '"]');
        if (el) el.value = v;
    }}
    return true;
}})()"#
    );
    driver.exec(&js).await?;
    Ok(())
}

/// Same as [`fill`] for numeric fields.
pub(crate) async fn fill_numbers<D: Driver>(
    driver: &mut D,
    names: &[&str],
    values: &[u32],
) -> Result<()> {
    let fields: Vec<(&str, String)> = names
        .iter()
        .zip(values)
        .map(|(n, v)| (*n, v.to_string()))
        .collect();
    fill(driver, &fields).await
}

/// Read named numeric fields; empty or garbled ones read as zero.
pub(crate) async fn read_numbers<D: Driver>(driver: &mut D, names: &[&str]) -> Result<Vec<u32>> {
    let names_json = serde_json::to_string(names).map_err(encounter_driver::Error::from)?;
    let js = format!(
        r#"(() => {{
    return {names_json}.map(n => {{
        const el = document.querySelector('[name="' + n + '"]');
        const v = el ? parseInt(el.value, 10) : 0;
        return isNaN(v) || v < 0 ? 0 : v;
    }});
}})()"#
    );
    let mut values: Vec<u32> = eval_or_default(driver, &js).await?;
    values.resize(names.len(), 0);
    Ok(values)
}

/// Read named text fields; missing ones read as empty.
pub(crate) async fn read_texts<D: Driver>(driver: &mut D, names: &[&str]) -> Result<Vec<String>> {
    let names_json = serde_json::to_string(names).map_err(encounter_driver::Error::from)?;
    let js = format!(
        r#"(() => {{
    return {names_json}.map(n => {{
        const el = document.querySelector('[name="' + n + '"]');
        return el ? String(el.value) : '';
    }});
}})()"#
    );
    let mut values: Vec<String> = eval_or_default(driver, &js).await?;
    values.resize(names.len(), String::new());
    Ok(values)
}

pub(crate) async fn read_team<D: Driver>(driver: &mut D) -> Result<u32> {
    eval_or_default(driver, READ_TEAM_JS).await
}

pub(crate) async fn set_team<D: Driver>(driver: &mut D, who: u32) -> Result<()> {
    let js = format!(
        r#"(() => {{
    const s = document.querySelector('select.input');
    if (s) s.value = {};
    return true;
}})()"#,
        js_str(&who.to_string())
    );
    driver.exec(&js).await?;
    Ok(())
}

pub(crate) async fn is_checked<D: Driver>(driver: &mut D, selector: &str) -> Result<bool> {
    Ok(driver
        .find(selector)
        .await?
        .map(|e| e.checked)
        .unwrap_or(false))
}

/// Click a checkbox or radio only if its state differs from `want`.
pub(crate) async fn set_checked<D: Driver>(driver: &mut D, selector: &str, want: bool) -> Result<()> {
    if is_checked(driver, selector).await? != want {
        driver.click(selector).await?;
    }
    Ok(())
}

/// Click `update` when the form is editing an existing record, else `add`.
pub(crate) async fn submit<D: Driver>(driver: &mut D, update: &str, add: &str) -> Result<()> {
    if driver.exists(update).await? {
        driver.click(update).await?;
    } else {
        driver.click(add).await?;
    }
    Ok(())
}

/// Open the edit mode of a popup form when it opens read-only.
pub(crate) async fn enter_edit_mode<D: Driver>(driver: &mut D, link: &str) -> Result<()> {
    if driver.exists(link).await? {
        driver.click(link).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_driver::mock::MockDriver;
    use encounter_driver::Element;
    use serde_json::json;

    #[tokio::test]
    async fn test_fill_quotes_values_as_json() {
        let mut driver = MockDriver::new();
        fill(&mut driver, &[("txtLevelName", "It's \"on\"".to_string())])
            .await
            .unwrap();
        let js = driver.scripts()[0];
        assert!(js.contains(r#"[["txtLevelName","It's \"on\""]]"#));
    }

    #[tokio::test]
    async fn test_read_numbers_pads_missing() {
        let mut driver = MockDriver::new();
        driver.on_script("txtApHours", json!([1]));
        let v = read_numbers(&mut driver, &["txtApHours", "txtApMinutes"])
            .await
            .unwrap();
        assert_eq!(v, vec![1, 0]);
    }

    #[tokio::test]
    async fn test_read_texts_null_is_empty() {
        let mut driver = MockDriver::new();
        let v = read_texts(&mut driver, &["txtHelp"]).await.unwrap();
        assert_eq!(v, vec![String::new()]);
    }

    #[tokio::test]
    async fn test_set_checked_only_clicks_on_change() {
        let mut driver = MockDriver::new();
        driver.element("#chkDelay", Element::checked());
        set_checked(&mut driver, "#chkDelay", true).await.unwrap();
        assert!(driver.clicks().is_empty());
        set_checked(&mut driver, "#chkDelay", false).await.unwrap();
        assert_eq!(driver.clicks(), vec!["#chkDelay"]);
    }

    #[tokio::test]
    async fn test_submit_prefers_update() {
        let mut driver = MockDriver::new();
        submit(&mut driver, "#btnUpdate", "#btnAdd").await.unwrap();
        driver.element("#btnUpdate", Element::default());
        submit(&mut driver, "#btnUpdate", "#btnAdd").await.unwrap();
        assert_eq!(driver.clicks(), vec!["#btnAdd", "#btnUpdate"]);
    }

    #[tokio::test]
    async fn test_team_defaults_to_everyone() {
        let mut driver = MockDriver::new();
        assert_eq!(read_team(&mut driver).await.unwrap(), 0);
        driver.on_script("select.input", json!(17));
        assert_eq!(read_team(&mut driver).await.unwrap(), 17);
    }
}
