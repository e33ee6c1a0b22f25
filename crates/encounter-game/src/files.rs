//! Files attached to a game: listed on the level manager, downloaded over
//! plain HTTP and uploaded back through the file uploader popup.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use encounter_driver::{close_after, js_str, Driver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::form::eval_or_default;
use crate::session::GameSession;
use crate::{urls, Error, Result};

/// Files the uploader accepts in one submission.
pub const CHUNK_SIZE_FILES: usize = 12;

const FILE_URLS_JS: &str = r#"(() => {
    const urls = [];
    $('.border_rad2').find('a').each((i, el) => {
        if (/lnkViewFile/.test(el.id)) urls.push(el.href);
    });
    return urls;
})()"#;

const UPLOAD_BUTTON: &str = "[title='Upload']";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameFiles {
    pub file_urls: Vec<String>,
    /// Local directory holding a copy of every file.
    pub file_location: Option<PathBuf>,
}

fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn set_file_js(slot: usize, name: &str, bytes: &[u8]) -> String {
    format!(
        r#"(() => {{
    const input = document.querySelector('[name="inputFile{slot}"]');
    if (!input) return false;
    const bytes = Uint8Array.from(atob({data}), c => c.charCodeAt(0));
    const dt = new DataTransfer();
    dt.items.add(new File([bytes], {name}));
    input.files = dt.files;
    return true;
}})()"#,
        data = js_str(&STANDARD.encode(bytes)),
        name = js_str(name),
    )
}

impl GameFiles {
    pub fn new(file_urls: Vec<String>) -> Self {
        Self {
            file_urls,
            file_location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.file_location = Some(location.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.file_urls.is_empty()
    }

    /// Last path segment of every URL.
    pub fn file_names(&self) -> Vec<&str> {
        self.file_urls.iter().map(|u| file_name(u)).collect()
    }

    /// URLs of the files attached to the session's game.
    pub async fn find_file_urls<D: Driver>(session: &mut GameSession<D>) -> Result<Vec<String>> {
        session.open_manager().await?;
        eval_or_default(session.driver(), FILE_URLS_JS).await
    }

    /// List the game's files, downloading them into `location` when given.
    pub async fn capture<D: Driver>(
        session: &mut GameSession<D>,
        location: Option<&Path>,
    ) -> Result<Self> {
        let mut files = GameFiles::new(Self::find_file_urls(session).await?);
        info!("Game {} has {} files", session.game_id(), files.file_urls.len());
        if let Some(location) = location {
            files.file_location = Some(location.to_path_buf());
            files.download(location).await?;
        }
        Ok(files)
    }

    pub async fn download(&self, location: &Path) -> Result<()> {
        fs::create_dir_all(location)?;
        for (url, name) in self.file_urls.iter().zip(self.file_names()) {
            debug!("Downloading {}", url);
            let bytes = reqwest::get(url.as_str())
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            fs::write(location.join(name), &bytes)?;
        }
        Ok(())
    }

    /// Upload every file the session's game does not have yet, from
    /// [`GameFiles::file_location`].
    pub async fn upload<D: Driver>(&self, session: &mut GameSession<D>) -> Result<()> {
        let location = self.file_location.as_deref().ok_or(Error::MissingFileLocation)?;
        let existing: BTreeSet<String> = Self::find_file_urls(session)
            .await?
            .iter()
            .map(|u| file_name(u).to_string())
            .collect();
        let missing: Vec<&str> = self
            .file_names()
            .into_iter()
            .filter(|n| !existing.contains(*n))
            .collect();
        info!(
            "Uploading {} files to game {} ({} already there)",
            missing.len(),
            session.game_id(),
            existing.len()
        );

        let opener = urls::file_uploader_script(session.game_id());
        let settle_ms = session.timing().settle_ms;
        for chunk in missing.chunks(CHUNK_SIZE_FILES) {
            let contents = chunk
                .iter()
                .map(|name| fs::read(location.join(name)))
                .collect::<std::io::Result<Vec<_>>>()?;
            let driver = session.driver();
            driver.open_popup(&opener).await?;
            let outcome = async {
                for (i, (name, bytes)) in chunk.iter().zip(&contents).enumerate() {
                    let placed: bool = eval_or_default(driver, &set_file_js(i + 1, name, bytes)).await?;
                    if !placed {
                        return Err(crate::Error::from(encounter_driver::Error::NotFound(
                            format!("[name=\"inputFile{}\"]", i + 1),
                        )));
                    }
                }
                driver.click(UPLOAD_BUTTON).await?;
                driver.wait(settle_ms).await;
                Ok::<_, crate::Error>(())
            }
            .await;
            close_after(driver, outcome).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Credentials, Timing};
    use encounter_driver::mock::MockDriver;
    use serde_json::json;

    fn session() -> GameSession<MockDriver> {
        GameSession::new(
            MockDriver::new(),
            "demo.en.cx",
            101,
            Credentials::new("author", "secret"),
        )
        .with_timing(Timing {
            settle_ms: 0,
            level_pause_ms: 0,
        })
    }

    #[test]
    fn test_file_names() {
        let files = GameFiles::new(vec![
            "http://d1.endata.cx/data/games/101/map.png".into(),
            "http://d1.endata.cx/data/games/101/intro%20song.mp3".into(),
        ]);
        assert_eq!(files.file_names(), vec!["map.png", "intro%20song.mp3"]);
    }

    #[test]
    fn test_set_file_js_encodes_content() {
        let js = set_file_js(3, "a.txt", b"hi");
        assert!(js.contains(r#"[name="inputFile3"]"#));
        assert!(js.contains(r#"atob("aGk=")"#));
        assert!(js.contains(r#"new File([bytes], "a.txt")"#));
    }

    #[tokio::test]
    async fn test_capture_lists_without_download() {
        let mut s = session();
        s.driver()
            .on_script("lnkViewFile", json!(["http://d1.endata.cx/data/games/101/map.png"]));
        let files = GameFiles::capture(&mut s, None).await.unwrap();
        assert_eq!(files.file_names(), vec!["map.png"]);
        assert_eq!(files.file_location, None);
    }

    #[tokio::test]
    async fn test_upload_requires_location() {
        let mut s = session();
        let err = GameFiles::new(vec!["http://x/a.png".into()])
            .upload(&mut s)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingFileLocation));
        assert!(s.driver().calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_skips_existing_and_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let urls: Vec<String> = (0..14)
            .map(|i| format!("http://d1.endata.cx/data/games/7/f{i}.txt"))
            .collect();
        for i in 0..14 {
            fs::write(dir.path().join(format!("f{i}.txt")), format!("file {i}")).unwrap();
        }
        let files = GameFiles::new(urls).with_location(dir.path());

        let mut s = session();
        s.driver()
            .on_script("lnkViewFile", json!(["http://d1.endata.cx/data/games/101/f0.txt"]))
            .on_script("inputFile", json!(true));
        files.upload(&mut s).await.unwrap();

        let d = s.driver();
        let opener = "javascript:Editor('./FileUploader.aspx?gid=101', 'FileUploader_101');";
        assert_eq!(d.popups(), vec![opener, opener]);
        assert_eq!(d.clicks(), vec![UPLOAD_BUTTON, UPLOAD_BUTTON]);
        let placed: Vec<&str> = d
            .scripts()
            .into_iter()
            .filter(|js| js.contains("inputFile"))
            .collect();
        assert_eq!(placed.len(), 13);
        assert!(!placed.iter().any(|js| js.contains(r#""f0.txt""#)));
        assert!(placed[12].contains(r#"[name="inputFile1"]"#));
        assert_eq!(d.popup_depth(), 0);
    }

    #[tokio::test]
    async fn test_missing_input_closes_popup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let files = GameFiles::new(vec!["http://x/a.txt".into()]).with_location(dir.path());
        let mut s = session();
        s.driver().on_script("inputFile", json!(false));
        let err = files.upload(&mut s).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Driver(encounter_driver::Error::NotFound(_))
        ));
        assert_eq!(s.driver().popup_depth(), 0);
    }
}
