//! Loader for Lantern configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added; later sources win.
//! `LANTERN__`-prefixed environment variables are always consulted last, with
//! `__` separating nested keys (`LANTERN__USER__NUM_WEB_RESULTS=5`). String
//! values may reference other environment variables as `${VAR}`; these are
//! expanded recursively after merging.
//!
//! ```yaml
//! user:
//!   web_access: true
//!   num_web_results: 3
//!   time_period: "w"
//! search:
//!   base_url: "https://sg.search.yahoo.com/search"
//! host:
//!   chat_url: "https://chat.openai.com/"
//!   headless: false
//! submit:
//!   enable_timeout_ms: 30000
//! ```
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use config::{Config, ConfigError, Environment, File};
use lantern_common::observability::LogConfig;
use lantern_common::{LanternError, SlashCommands, UserConfig, UserConfigSource};
use serde::Deserialize;
use serde_json::Value;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Search engine results endpoint. Responses whose final URL starts with this
/// are parsed as result pages.
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://sg.search.yahoo.com/search";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LanternConfig {
    pub user: UserConfig,
    pub prompt: PromptConfig,
    pub search: SearchConfig,
    pub host: HostConfig,
    pub submit: SubmitConfig,
    pub commands: SlashCommands,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Overrides the stock prompt template when set.
    pub template: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            timeout_ms: 15_000,
            max_retries: 2,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Where the chat page lives and how to find its elements.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub chat_url: String,
    pub webdriver_url: String,
    pub headless: bool,
    pub selectors: SelectorConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            chat_url: "https://chat.openai.com/".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            selectors: SelectorConfig::default(),
        }
    }
}

/// CSS selectors used by the DOM locator. Lantern's own surface is not
/// configurable; its selector is fixed by the class it mounts with.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub root: String,
    pub text_area: String,
    pub submit_button: String,
    pub footer: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            root: "div[id^='__next']".to_string(),
            text_area: "form textarea".to_string(),
            submit_button: "form textarea ~ button".to_string(),
            footer: "div[class*='text-xs'][class*='text-center']".to_string(),
        }
    }
}

/// Timing of the simulated submit-control activation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    pub poll_interval_ms: u64,
    pub enable_timeout_ms: u64,
    pub settle_ms: u64,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            enable_timeout_ms: 30_000,
            settle_ms: 200,
        }
    }
}

impl SubmitConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn enable_timeout(&self) -> Duration {
        Duration::from_millis(self.enable_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// `<config dir>/lantern/lantern.yaml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lantern").join("lantern.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct ConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: &'static str,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Start from built-in defaults; `LANTERN__` env overrides are applied on load.
    ///
    /// ```
    /// use lantern_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().load().expect("defaults load");
    /// assert!(config.user.web_access);
    /// assert_eq!(config.submit.poll_interval_ms, 100);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: "LANTERN",
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so environment-only setups still load.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use lantern_common::TimeRange;
    /// use lantern_config::ConfigLoader;
    ///
    /// let cfg = ConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// user:
    ///   num_web_results: 5
    ///   time_period: "m"
    /// commands:
    ///   - name: "/page"
    ///     insert: "page:"
    ///   - name: "/site"
    ///     insert: "site:"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.user.num_web_results, 5);
    /// assert_eq!(cfg.user.time_period, TimeRange::Month);
    /// assert_eq!(cfg.user.region, "wt-wt");
    /// assert_eq!(cfg.commands.names(), vec!["/page", "/site"]);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// `${VAR}` placeholders are expanded before the typed structs are built.
    ///
    /// ```
    /// use lantern_config::ConfigLoader;
    ///
    /// unsafe { std::env::set_var("LANTERN_DOC_CHAT_HOST", "chat.example.test"); }
    ///
    /// let config = ConfigLoader::new()
    ///     .with_yaml_str("host:\n  chat_url: \"https://${LANTERN_DOC_CHAT_HOST}/\"\n")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.host.chat_url, "https://chat.example.test/");
    /// assert_eq!(config.host.webdriver_url, "http://localhost:9515");
    ///
    /// unsafe { std::env::remove_var("LANTERN_DOC_CHAT_HOST"); }
    /// ```
    pub fn load(self) -> Result<LanternConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(self.env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        if v.is_null() {
            v = Value::Object(Default::default());
        }
        expand_env_in_value(&mut v);

        let typed: LanternConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

/// Reads `user` from a config file on every call, so edits made while the
/// content script runs apply to the next submit.
#[derive(Debug, Clone)]
pub struct FileUserConfig {
    path: PathBuf,
}

impl FileUserConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl UserConfigSource for FileUserConfig {
    async fn user_config(&self) -> lantern_common::Result<UserConfig> {
        let path = self.path.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            ConfigLoader::new().with_optional_file(&path).load()
        })
        .await
        .map_err(|e| LanternError::Config(format!("config reader panicked: {e}")))?
        .map_err(|e| LanternError::Config(e.to_string()))?;

        tracing::debug!(
            path = %self.path.display(),
            web_access = loaded.user.web_access,
            num_web_results = loaded.user.num_web_results,
            "config.user.reload",
        );
        Ok(loaded.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("LANTERN_T_FOO", Some("bar"), || {
            let mut v = json!("prefix-${LANTERN_T_FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars(
            [("LANTERN_T_CITY", Some("Winston")), ("LANTERN_T_STATE", Some("NC"))],
            || {
                let mut v = json!([
                    "hello-$LANTERN_T_CITY",
                    { "loc": "${LANTERN_T_CITY}-${LANTERN_T_STATE}" },
                    42,
                    true,
                    null
                ]);
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!(["hello-Winston", { "loc": "Winston-NC" }, 42, true, null])
                );
            },
        );
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("LANTERN_T_BAZ", Some("qux")),
                ("LANTERN_T_BAR", Some("mid-${LANTERN_T_BAZ}")),
                ("LANTERN_T_TOP", Some("start-${LANTERN_T_BAR}-end")),
            ],
            || {
                let mut v = json!("X=${LANTERN_T_TOP}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars(
            [("LANTERN_T_A", Some("${LANTERN_T_B}")), ("LANTERN_T_B", Some("${LANTERN_T_A}"))],
            || {
                let mut v = json!("x=${LANTERN_T_A}-y");
                expand_env_in_value(&mut v);
                let s = v.as_str().unwrap();
                assert!(s.starts_with("x=") && s.ends_with("-y"));
                assert!(s.contains("${"));
            },
        );
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${LANTERN_T_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${LANTERN_T_DOES_NOT_EXIST}"));
    }

    #[test]
    fn submit_durations_follow_millisecond_fields() {
        let submit = SubmitConfig {
            poll_interval_ms: 50,
            enable_timeout_ms: 1_000,
            settle_ms: 0,
        };
        assert_eq!(submit.poll_interval(), Duration::from_millis(50));
        assert_eq!(submit.enable_timeout(), Duration::from_secs(1));
        assert_eq!(submit.settle_delay(), Duration::ZERO);
    }
}
