use std::fmt;

use encounter_driver::{js_str, Driver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::form::eval_or_default;
use crate::kind::SlotKind;
use crate::urls;
use crate::Result;

const LEVEL_COUNT_JS: &str = r#"$('input[name*="txtLevelName_"]').length"#;

/// Admin login.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Which kinds are appended to a target level instead of overwriting what it
/// already has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepExisting {
    pub hints: bool,
    pub penalized_hints: bool,
    pub bonuses: bool,
    pub answers: bool,
}

impl KeepExisting {
    pub fn for_slot(&self, kind: SlotKind) -> bool {
        match kind {
            SlotKind::Hint => self.hints,
            SlotKind::PenalizedHint => self.penalized_hints,
            SlotKind::Bonus => self.bonuses,
        }
    }
}

/// Fixed pauses, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// After each read step and after login.
    pub settle_ms: u64,
    /// Between levels on write.
    pub level_pause_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_ms: 2000,
            level_pause_ms: 10000,
        }
    }
}

/// One logged-in browser working on one game.
pub struct GameSession<D> {
    driver: D,
    domain: String,
    game_id: u32,
    credentials: Credentials,
    keep: KeepExisting,
    timing: Timing,
}

impl<D: Driver> GameSession<D> {
    pub fn new(driver: D, domain: impl Into<String>, game_id: u32, credentials: Credentials) -> Self {
        Self {
            driver,
            domain: domain.into(),
            game_id,
            credentials,
            keep: KeepExisting::default(),
            timing: Timing::default(),
        }
    }

    pub fn with_keep_existing(mut self, keep: KeepExisting) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    pub fn keep_existing(&self) -> KeepExisting {
        self.keep
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    pub async fn login(&mut self) -> Result<()> {
        info!("Logging in to {} as {}", self.domain, self.credentials.user);
        self.driver.goto(&urls::admin_url(&self.domain)).await?;
        let js = format!(
            r#"(() => {{
    const login = document.getElementById('txtLogin');
    const pwd = document.getElementById('txtPassword');
    if (!login || !pwd) return false;
    login.value = {};
    pwd.value = {};
    login.form.submit();
    return true;
}})()"#,
            js_str(&self.credentials.user),
            js_str(&self.credentials.password)
        );
        let submitted: bool = eval_or_default(&mut self.driver, &js).await?;
        if !submitted {
            debug!("No login form, assuming an existing session");
        }
        self.driver.wait(self.timing.settle_ms).await;
        Ok(())
    }

    pub async fn navigate_to_level(&mut self, level_id: u32) -> Result<()> {
        let url = urls::level_url(&self.domain, self.game_id, level_id);
        self.driver.goto(&url).await?;
        Ok(())
    }

    /// Open the level manager unless the browser is already on it.
    pub async fn open_manager(&mut self) -> Result<()> {
        let url = urls::manager_url(&self.domain, self.game_id);
        if self.driver.url().await? != url {
            self.driver.goto(&url).await?;
        }
        Ok(())
    }

    /// Number of levels, counted on the level manager.
    pub async fn count_levels(&mut self) -> Result<u32> {
        self.open_manager().await?;
        let n: u32 = eval_or_default(&mut self.driver, LEVEL_COUNT_JS).await?;
        debug!("Game {} has {} levels", self.game_id, n);
        Ok(n)
    }

    /// Log in again and reopen a level after a scripting fault.
    pub async fn recover(&mut self, level_id: u32) -> Result<()> {
        self.login().await?;
        self.navigate_to_level(level_id).await
    }

    /// Fixed pause after a read step.
    pub(crate) async fn settle_step(&mut self) {
        let ms = self.timing.settle_ms;
        self.driver.wait(ms).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_driver::mock::{Call, MockDriver};
    use serde_json::json;

    fn session() -> GameSession<MockDriver> {
        GameSession::new(
            MockDriver::new(),
            "demo.en.cx",
            101,
            Credentials::new("author", "p'ss\"word"),
        )
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("author", "secret");
        let out = format!("{creds:?}");
        assert!(out.contains("author"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn test_keep_existing_per_slot() {
        let keep = KeepExisting {
            penalized_hints: true,
            ..Default::default()
        };
        assert!(!keep.for_slot(SlotKind::Hint));
        assert!(keep.for_slot(SlotKind::PenalizedHint));
        assert!(!keep.for_slot(SlotKind::Bonus));
    }

    #[tokio::test]
    async fn test_login_fills_form_and_settles() {
        let mut s = session();
        s.driver().on_script("txtLogin", json!(true));
        s.login().await.unwrap();
        let d = s.driver();
        assert_eq!(d.visited(), vec!["http://demo.en.cx/Login.aspx?return=%2f"]);
        let js = d.scripts()[0].to_string();
        assert!(js.contains(r#"login.value = "author";"#));
        assert!(js.contains(r#"pwd.value = "p'ss\"word";"#));
        assert_eq!(d.calls().last(), Some(&Call::Wait(2000)));
    }

    #[tokio::test]
    async fn test_count_levels_opens_manager_once() {
        let mut s = session();
        s.driver().on_script("txtLevelName_", json!(4));
        assert_eq!(s.count_levels().await.unwrap(), 4);
        assert_eq!(s.count_levels().await.unwrap(), 4);
        assert_eq!(
            s.driver().visited(),
            vec!["http://demo.en.cx/Administration/Games/LevelManager.aspx?gid=101"]
        );
    }

    #[tokio::test]
    async fn test_recover_relogs_and_reopens_level() {
        let mut s = session().with_timing(Timing {
            settle_ms: 0,
            level_pause_ms: 0,
        });
        s.recover(3).await.unwrap();
        assert_eq!(
            s.driver().visited(),
            vec![
                "http://demo.en.cx/Login.aspx?return=%2f",
                "http://demo.en.cx/Administration/Games/LevelEditor.aspx?gid=101&level=3",
            ]
        );
    }
}
