use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::resolve_home_dir;

/// Name of the module that owns the HTTP listener; its `bind_addr` is derived
/// from the `server` section unless configured explicitly.
const INGRESS_MODULE: &str = "api_ingress";

/// Top-level configuration of the persons server.
///
/// Global sections are typed; everything a module reads lives in `modules`
/// keyed by module name and is deserialized by the module itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Absent means the modules run without a database.
    pub database: Option<DatabaseConfig>,
    /// Absent means plain console logging at `info`.
    pub logging: Option<LoggingConfig>,
    /// Extra `<module>.yaml` files merged into `modules` on load.
    #[serde(default)]
    pub modules_dir: Option<String>,
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub home_dir: String, // normalized to an absolute path on load
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database connection URL (e.g., "sqlite://database/persons.db", "sqlite::memory:").
    pub url: String,
    /// Pool size; 10 when unset.
    pub max_conns: Option<u32>,
    /// How long SQLite waits on a locked database; 5000 ms when unset.
    pub busy_timeout_ms: Option<u32>,
}

/// Per-subsystem log sinks keyed by tracing target prefix (`auth`, `persons`,
/// `sea_orm`...). The `default` entry covers every target without a section.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    /// trace | debug | info | warn | error | off
    pub console_level: String,
    /// Relative to `server.home_dir`; empty disables the file sink.
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>, // rotated files to keep
    #[serde(default)]
    pub max_size_mb: Option<u64>, // rotate once the file grows past this
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Empty => platform default resolved by resolve_home_dir():
            // Windows: %APPDATA%/.persons
            // Unix/macOS: $HOME/.persons
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8087,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Console at `info`, rotating `logs/persons.log` at `debug`.
pub fn default_logging_config() -> LoggingConfig {
    let section = Section {
        console_level: "info".into(),
        file: "logs/persons.log".into(),
        file_level: "debug".into(),
        max_backups: Some(3),
        max_size_mb: Some(100),
    };
    HashMap::from([("default".to_string(), section)])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: Some(DatabaseConfig {
                url: "sqlite://database/persons.db".to_string(),
                max_conns: Some(10),
                busy_timeout_ms: Some(5000),
            }),
            logging: Some(default_logging_config()),
            ..Self::bare()
        }
    }
}

impl AppConfig {
    /// Server defaults only; every optional section left empty.
    fn bare() -> Self {
        Self {
            server: ServerConfig::default(),
            database: None,
            logging: None,
            modules_dir: None,
            modules: HashMap::new(),
        }
    }

    /// Read `config_path` over the bare defaults, then `APP__*` environment
    /// variables over that. `server.home_dir` comes back absolute and created.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(Self::bare()))
            .merge(Yaml::file(path))
            // APP__SERVER__PORT=8087 maps to server.port,
            // APP__MODULES__AUTH__JWT_SECRET=... maps to modules.auth.jwt_secret
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: Self = figment
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        config.server.home_dir = absolute_home_dir(&config.server.home_dir)?;
        if let Some(dir) = &config.modules_dir {
            let dir = PathBuf::from(dir);
            read_module_files(&dir, &mut config.modules)?;
        }
        Ok(config)
    }

    /// Like [`AppConfig::load_layered`], but without a path the built-in
    /// defaults are used.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        let Some(path) = config_path else {
            let mut config = Self::default();
            config.server.home_dir = absolute_home_dir(&config.server.home_dir)?;
            return Ok(config);
        };
        Self::load_layered(path)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// `--port`, `--mock` and `-v` win over anything loaded from disk.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
            // An explicit port wins over whatever the ingress section says.
            set_ingress_bind_addr(&mut self.modules, self.server.bind_addr(), true);
        }

        if args.mock {
            self.database = Some(DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_conns: Some(1),
                busy_timeout_ms: None,
            });
        }

        let console_level = match args.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        };
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let (Some(level), Some(section)) = (console_level, logging.get_mut("default")) {
            section.console_level = level.to_string();
        }
    }

    /// Home directory as a path (already absolute after loading).
    pub fn home_dir(&self) -> PathBuf {
        PathBuf::from(&self.server.home_dir)
    }
}

/// Write `bind_addr` into the ingress section, creating the section when absent.
/// With `overwrite == false` an existing value is left alone.
fn set_ingress_bind_addr(
    modules: &mut HashMap<String, serde_json::Value>,
    bind_addr: String,
    overwrite: bool,
) {
    let entry = modules
        .entry(INGRESS_MODULE.to_string())
        .or_insert_with(|| serde_json::Value::Object(Default::default()));
    match entry {
        serde_json::Value::Object(map) => {
            if overwrite || !map.contains_key("bind_addr") {
                map.insert("bind_addr".into(), serde_json::Value::String(bind_addr));
            }
        }
        other => {
            let mut map = serde_json::Map::new();
            map.insert("bind_addr".into(), serde_json::Value::String(bind_addr));
            *other = serde_json::Value::Object(map);
        }
    }
}

/// Read-only view over the per-module configuration bag.
///
/// The ingress section receives `bind_addr` from `server.host`/`server.port`
/// when it does not set one itself.
#[derive(Debug, Clone)]
pub struct AppConfigProvider {
    modules: HashMap<String, serde_json::Value>,
}

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        let mut modules = config.modules;
        set_ingress_bind_addr(&mut modules, config.server.bind_addr(), false);
        Self { modules }
    }

    pub fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.modules.get(module_name)
    }
}

/// The subset of command line flags that shape the configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
    pub mock: bool,
}

/// Resolve `home_dir` (empty means the platform default `.persons`) to an
/// absolute, existing directory.
fn absolute_home_dir(home_dir: &str) -> Result<String> {
    let requested = Some(home_dir.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    let resolved = resolve_home_dir(requested, ".persons", true)
        .context("Failed to resolve server.home_dir")?;
    Ok(resolved.to_string_lossy().into_owned())
}

/// Every `*.yaml`/`*.yml` file in `dir` becomes `modules.<file stem>`,
/// replacing an inline section of the same name. A missing directory is fine.
fn read_module_files(dir: &Path, modules: &mut HashMap<String, serde_json::Value>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("cannot list modules_dir {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        let stem = path.file_stem().and_then(|s| s.to_str());
        let (true, true, Some(name)) = (path.is_file(), is_yaml, stem) else {
            continue;
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read module config {}", path.display()))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid YAML in {}", path.display()))?;
        modules.insert(name.to_string(), serde_json::to_value(value)?);
    }
    Ok(())
}
