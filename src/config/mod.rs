use std::{
    collections::{BTreeMap, HashMap},
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    /// Defaults, then the rc file at `config_path`, then `NBX_*` environment variables.
    pub fn load_from(config_path: &Path) -> Self {
        let mut map = default_map();

        if config_path.exists() {
            if let Ok(file) = fs::File::open(config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Environment takes precedence over the file
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path: config_path.to_path_buf() }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn python(&self) -> PathBuf {
        self.get("NBX_PYTHON")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("python3"))
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("NBX_INSTALL_TIMEOUT").unwrap_or(120))
    }

    /// Alias table from `NBX_ALIASES`, e.g. `pd=pandas,np=numpy`.
    pub fn aliases(&self) -> BTreeMap<String, String> {
        self.get("NBX_ALIASES")
            .map(|v| parse_aliases(&v))
            .unwrap_or_default()
    }
}

pub fn parse_aliases(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(alias, module)| (alias.trim().to_string(), module.trim().to_string()))
        .filter(|(alias, module)| !alias.is_empty() && !module.is_empty())
        .collect()
}

fn is_config_key(k: &str) -> bool {
    k.starts_with("NBX_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("nbx").join(".nbxrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("NBX_PYTHON".into(), "python3".into());
    m.insert("NBX_INSTALL_TIMEOUT".into(), "120".into());
    m.insert("NBX_ALIASES".into(), "pd=pandas,np=numpy".into());
    m.insert("NBX_PRETTIFY_MARKDOWN".into(), "false".into());
    m.insert("NBX_LOG".into(), "warn".into());
    m
}
