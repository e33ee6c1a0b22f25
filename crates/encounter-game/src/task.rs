//! Level task text.

use std::collections::BTreeSet;

use encounter_driver::{close_after, Driver, Error as DriverError};
use serde::{Deserialize, Serialize};

use crate::form::{self, named};
use crate::Result;

pub const TASK_ADD: &str = "#ctl02_ctl00_lnkTaskAdd";

/// Editor link of the `index`-th task on the level page.
pub fn task_editor(index: usize) -> String {
    format!("#ctl02_ctl00_TasksRepeater_ctl{index:02}_lnkTaskEditor")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    /// Body is HTML as is; otherwise newlines become `<br>`.
    pub html_raw: bool,
    pub body: String,
    pub dedicated_to_who: u32,
}

impl Task {
    /// Editor popup scripts of every task on the level page, in order.
    pub async fn editor_hrefs<D: Driver>(driver: &mut D) -> Result<Vec<String>> {
        let mut hrefs = Vec::new();
        while let Some(href) = driver
            .find(&task_editor(hrefs.len()))
            .await?
            .and_then(|e| e.href)
        {
            hrefs.push(href);
        }
        Ok(hrefs)
    }

    pub async fn read_all<D: Driver>(driver: &mut D) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for href in Self::editor_hrefs(driver).await? {
            tasks.push(Self::read(driver, &href).await?);
        }
        Ok(tasks)
    }

    /// Tasks are always added; the first editor is used only when the page
    /// offers no add link. Indices in `written` are already on the page and
    /// are not added again.
    pub async fn write_all<D: Driver>(
        tasks: &[Task],
        driver: &mut D,
        written: &mut BTreeSet<usize>,
    ) -> Result<()> {
        for (index, task) in tasks.iter().enumerate() {
            if written.contains(&index) {
                continue;
            }
            let opener = match driver.find(TASK_ADD).await?.and_then(|e| e.href) {
                Some(href) => href,
                None => driver
                    .find(&task_editor(0))
                    .await?
                    .and_then(|e| e.href)
                    .ok_or_else(|| DriverError::NotFound(TASK_ADD.to_string()))?,
            };
            task.write(driver, &opener).await?;
            written.insert(index);
        }
        Ok(())
    }

    pub async fn read<D: Driver>(driver: &mut D, href: &str) -> Result<Self> {
        driver.open_popup(href).await?;
        let outcome = async {
            form::enter_edit_mode(driver, "#lnkEdit").await?;
            let body = driver
                .require(&named("inputTask"))
                .await?
                .value
                .unwrap_or_default();
            let replace_nl = form::is_checked(driver, &named("chkReplaceNlToBr")).await?;
            let dedicated_to_who = form::read_team(driver).await?;
            Ok::<_, crate::Error>(Task {
                html_raw: !replace_nl,
                body,
                dedicated_to_who,
            })
        }
        .await;
        close_after(driver, outcome).await
    }

    pub async fn write<D: Driver>(&self, driver: &mut D, href: &str) -> Result<()> {
        driver.open_popup(href).await?;
        let outcome = async {
            form::enter_edit_mode(driver, "#lnkEdit").await?;
            form::fill(driver, &[("inputTask", self.body.clone())]).await?;
            form::set_checked(driver, &named("chkReplaceNlToBr"), !self.html_raw).await?;
            form::set_team(driver, self.dedicated_to_who).await?;
            form::submit(driver, "#btnUpdate", "#btnAdd").await?;
            Ok::<_, crate::Error>(())
        }
        .await;
        close_after(driver, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_driver::mock::MockDriver;
    use encounter_driver::Element;
    use serde_json::json;

    #[test]
    fn test_task_editor_ids() {
        assert_eq!(task_editor(0), "#ctl02_ctl00_TasksRepeater_ctl00_lnkTaskEditor");
        assert_eq!(task_editor(12), "#ctl02_ctl00_TasksRepeater_ctl12_lnkTaskEditor");
    }

    #[tokio::test]
    async fn test_read_all_walks_repeater() {
        let mut driver = MockDriver::new();
        driver
            .element(&task_editor(0), Element::with_href("javascript:TaskEdit(0)"))
            .element(&task_editor(1), Element::with_href("javascript:TaskEdit(1)"))
            .element("#lnkEdit", Element::default())
            .element(r#"[name="inputTask"]"#, Element::with_value("Find the <b>bridge</b>"))
            .on_script("select.input", json!(5));

        let tasks = Task::read_all(&mut driver).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].html_raw);
        assert_eq!(tasks[0].body, "Find the <b>bridge</b>");
        assert_eq!(tasks[0].dedicated_to_who, 5);
        assert_eq!(
            driver.popups(),
            vec!["javascript:TaskEdit(0)", "javascript:TaskEdit(1)"]
        );
        assert_eq!(driver.popup_depth(), 0);
    }

    #[tokio::test]
    async fn test_write_prefers_add_link() {
        let mut driver = MockDriver::new();
        driver
            .element(TASK_ADD, Element::with_href("javascript:TaskAdd()"))
            .element(&task_editor(0), Element::with_href("javascript:TaskEdit(0)"));
        let task = Task {
            html_raw: false,
            body: "line one\nline two".into(),
            dedicated_to_who: 0,
        };
        Task::write_all(&[task], &mut driver, &mut BTreeSet::new())
            .await
            .unwrap();
        assert_eq!(driver.popups(), vec!["javascript:TaskAdd()"]);
        // unchecked "replace newlines" box gets ticked for a non-raw body
        assert_eq!(
            driver.clicks(),
            vec![r#"[name="chkReplaceNlToBr"]"#, "#btnAdd"]
        );
        assert!(driver.scripts()[0].contains(r#"["inputTask","line one\nline two"]"#));
    }

    #[tokio::test]
    async fn test_write_all_leaves_out_written_tasks() {
        let mut driver = MockDriver::new();
        driver.element(TASK_ADD, Element::with_href("javascript:TaskAdd()"));
        let tasks = vec![
            Task {
                body: "kept".into(),
                ..Default::default()
            },
            Task {
                body: "fresh".into(),
                ..Default::default()
            },
        ];
        let mut written = BTreeSet::from([0]);
        Task::write_all(&tasks, &mut driver, &mut written).await.unwrap();
        assert_eq!(driver.popups(), vec!["javascript:TaskAdd()"]);
        assert!(driver.scripts()[0].contains("fresh"));
        assert_eq!(written, BTreeSet::from([0, 1]));
    }

    #[tokio::test]
    async fn test_write_without_any_link_fails() {
        let mut driver = MockDriver::new();
        let err = Task::write_all(&[Task::default()], &mut driver, &mut BTreeSet::new())
            .await
            .unwrap_err();
        assert!(!err.is_script_fault());
        assert!(driver.popups().is_empty());
    }
}
