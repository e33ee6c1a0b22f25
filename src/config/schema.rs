use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use encounter_driver::BrowserConfig;
use encounter_game::{Credentials, KeepExisting, SkipSet, Timing};
use serde::Deserialize;

use super::params::{self, ParamDef, Params};
use crate::{Error, Result};

/// A copy job read from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub name: String,

    #[serde(default)]
    pub params: HashMap<String, ParamDef>,

    #[serde(default)]
    pub browser: BrowserConfig,

    pub credentials: Credentials,

    #[serde(default)]
    pub timing: Timing,

    /// Capture a game into a snapshot.
    pub save: Option<SaveJob>,

    /// Replay a snapshot into a game.
    pub load: Option<LoadJob>,

    pub on_failure: Option<OnFailure>,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveJob {
    pub domain: String,
    pub game_id: u32,
    /// Snapshot to write.
    pub path: PathBuf,
    /// Level ids to capture; all when absent.
    pub levels: Option<BTreeSet<u32>>,
    /// Merge into the snapshot already at `path`.
    #[serde(default = "yes")]
    pub keep_existing: bool,
    #[serde(default)]
    pub skip: SkipSet,
    #[serde(default)]
    pub past_game: bool,
    #[serde(default)]
    pub download_files: bool,
    pub files_location: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadJob {
    pub domain: String,
    pub game_id: u32,
    /// Snapshot to replay.
    pub path: PathBuf,
    /// Level ids to replay; all when absent.
    pub levels: Option<BTreeSet<u32>>,
    #[serde(default)]
    pub keep_existing: KeepExisting,
    #[serde(default)]
    pub skip: SkipSet,
    #[serde(default)]
    pub upload_files: bool,
    /// Where the snapshot's files were downloaded, if not recorded in it.
    pub files_location: Option<PathBuf>,
}

/// What to do when a job fails.
#[derive(Debug, Clone, Deserialize)]
pub struct OnFailure {
    /// Screenshot path; `{timestamp}` becomes the UNIX time.
    pub screenshot: Option<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_params(path, &Params::new())
    }

    pub fn load_with_params<P: AsRef<Path>>(path: P, params: &Params) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse_with_params(&content, params)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Self::parse_with_params(yaml, &Params::new())
    }

    /// Parse, substituting `${name}` placeholders from `params` and the
    /// job's own `params:` defaults.
    pub fn parse_with_params(yaml: &str, params: &Params) -> Result<Self> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let defs: HashMap<String, ParamDef> = value
            .get("params")
            .and_then(|v| serde_yaml::from_value(v.clone()).ok())
            .unwrap_or_default();
        params::substitute_value(&mut value, params, &defs)?;

        let config: Config = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("name is required".into()));
        }
        if self.save.is_none() && self.load.is_none() {
            return Err(Error::Config("specify 'save', 'load' or both".into()));
        }
        if self.credentials.user.is_empty() {
            return Err(Error::Config("credentials.user is required".into()));
        }
        if let Some(ref save) = self.save {
            if save.domain.is_empty() {
                return Err(Error::Config("save.domain is required".into()));
            }
            if save.files_location.is_some() && !save.download_files {
                return Err(Error::Config(
                    "save.files_location is only used with download_files".into(),
                ));
            }
        }
        if let Some(ref load) = self.load {
            if load.domain.is_empty() {
                return Err(Error::Config("load.domain is required".into()));
            }
        }
        Ok(())
    }
}
