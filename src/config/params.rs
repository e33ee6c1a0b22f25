use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::{Error, Result};

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Values given on the command line with `-P key=value`.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: BTreeMap<String, String>,
}

impl Params {
    /// No values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Value given for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parse `key=value` arguments; the value may itself contain `=`.
    pub fn from_args(args: &[String]) -> Result<Self> {
        args.iter().try_fold(Self::new(), |params, arg| {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{}', expected key=value", arg))
            })?;
            Ok(params.set(key.trim(), value))
        })
    }
}

/// A parameter a job file declares under `params:`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamDef {
    /// A run without a value for it fails.
    #[serde(default)]
    pub required: bool,

    /// Used when no value is given.
    pub default: Option<String>,

    /// Shown by `check`.
    pub description: Option<String>,
}

/// Value for `${name}`: the given one, else the declared default. `None`
/// leaves an undeclared placeholder as written.
fn resolve(name: &str, params: &Params, defs: &HashMap<String, ParamDef>) -> Result<Option<String>> {
    if let Some(v) = params.get(name) {
        return Ok(Some(v.to_string()));
    }
    match defs.get(name) {
        Some(ParamDef {
            default: Some(d), ..
        }) => Ok(Some(d.clone())),
        Some(def) if def.required => Err(Error::Config(format!(
            "missing required parameter: {}",
            name
        ))),
        Some(_) => Ok(Some(String::new())),
        None => Ok(None),
    }
}

/// Replace every `${name}` in `template`.
pub fn substitute(template: &str, params: &Params, defs: &HashMap<String, ParamDef>) -> Result<String> {
    let mut values = HashMap::new();
    for caps in placeholder().captures_iter(template) {
        let name = &caps[1];
        if let Some(v) = resolve(name, params, defs)? {
            values.insert(name.to_string(), v);
        }
    }
    let out = placeholder().replace_all(template, |caps: &Captures| {
        values
            .get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    });
    Ok(out.into_owned())
}

/// [`substitute`] in every string of a YAML document.
pub fn substitute_value(
    value: &mut serde_yaml::Value,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<()> {
    match value {
        serde_yaml::Value::String(s) => *s = substitute(s, params, defs)?,
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            for v in seq {
                substitute_value(v, params, defs)?;
            }
        }
        _ => {}
    }
    Ok(())
}
