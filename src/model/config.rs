use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct LauncherConfig {
    pub general: GeneralConfig,
    pub source: SourceConfig,
    pub toolchain: ToolchainConfig,
    pub commands: CommandsConfig,
    pub preview: PreviewConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub app_name: String,
    pub app_version: String,
    pub install_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub repo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainConfig {
    /// Executable that must resolve on PATH before dependencies are installed.
    pub runtime: String,
    /// Human name used in the "not installed" message.
    pub runtime_label: String,
    pub package_manager: String,
    /// Skip the global bootstrap when the package manager already resolves.
    pub reuse_existing_package_manager: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandsConfig {
    pub bootstrap: Vec<String>,
    pub dependencies: Vec<String>,
    pub build: Vec<String>,
    pub preview: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    pub host: String,
    pub port: u16,
    pub ready_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    pub spinner_interval_ms: u64,
}

impl LauncherConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let user = match user_config_path() {
            Some(path) if path.exists() => {
                tracing::info!("loading user config from {}", path.display());
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Some(raw)
            }
            _ => None,
        };

        Self::from_layers(DEFAULT_CONFIG, user.as_deref())
    }

    /// Parse `defaults`, deep-merge `user` over it, then validate.
    pub fn from_layers(defaults: &str, user: Option<&str>) -> Result<Self> {
        let mut merged: toml::Value = toml::from_str(defaults).context("parsing default config")?;

        if let Some(user) = user {
            let overlay: toml::Value = toml::from_str(user).context("parsing user config")?;
            merge_values(&mut merged, overlay);
        }

        let config: LauncherConfig = merged.try_into().context("invalid launcher config")?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(test)]
    pub fn defaults() -> Result<Self> {
        Self::from_layers(DEFAULT_CONFIG, None)
    }

    fn validate(&self) -> Result<()> {
        let commands = [
            ("bootstrap", &self.commands.bootstrap),
            ("dependencies", &self.commands.dependencies),
            ("build", &self.commands.build),
            ("preview", &self.commands.preview),
        ];

        for (name, argv) in commands {
            if argv.first().is_none_or(|program| program.trim().is_empty()) {
                bail!("commands.{name} must name a program");
            }
        }

        if self.general.install_dir.trim().is_empty() {
            bail!("general.install_dir must not be empty");
        }

        Ok(())
    }

    /// Resolve the install directory against `base`. Absolute and `~` paths ignore `base`.
    pub fn install_path(&self, base: &Path) -> Result<PathBuf> {
        let raw = self.general.install_dir.as_str();

        // Only `~` and `~/...` name the home directory; `~doa` is an ordinary name.
        let home_relative = match raw {
            "~" => Some(""),
            _ => raw.strip_prefix("~/"),
        };
        if let Some(rest) = home_relative {
            let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
            return Ok(home.join(rest));
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(base.join(path))
        }
    }

    pub fn preview_url(&self) -> String {
        format!("http://{}:{}", self.preview.host, self.preview.port)
    }
}

/// Tables merge key by key; any other value in `overlay` replaces the base value.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "doa-launcher")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
