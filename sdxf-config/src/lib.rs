use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use sdxf_core::strategy::{
    AdvancedOptions, ConversionStrategy, DEFAULT_LAYER, DEFAULT_PRECISION, StrategyPreset,
};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "SDXF_CONFIG";

/// toFixed 风格的精度上限。
pub const MAX_PRECISION: u32 = 100;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `SDXF_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        let cwd = env::current_dir().map_err(|source| ConfigError::Context {
            message: "获取当前工作目录失败".to_string(),
            source,
        })?;
        Self::discover_in(env::var_os(CONFIG_ENV_VAR), &cwd)
    }

    fn discover_in(explicit: Option<OsString>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = cwd.join("config").join("default.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.conversion.precision > MAX_PRECISION {
            return Err(ConfigError::Invalid {
                field: "conversion.precision",
                message: format!(
                    "精度 {} 超出范围（0..={MAX_PRECISION}）",
                    self.conversion.precision
                ),
            });
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 转换参数：策略预设与高级选项。
#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    #[serde(default)]
    pub strategy: StrategyPreset,
    #[serde(default = "ConversionConfig::default_precision")]
    pub precision: u32,
    #[serde(default)]
    pub force_2d: bool,
    #[serde(default = "ConversionConfig::default_layer")]
    pub default_layer: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ConversionConfig {
    fn default_precision() -> u32 {
        DEFAULT_PRECISION
    }

    fn default_layer() -> String {
        DEFAULT_LAYER.to_string()
    }

    #[inline]
    pub fn strategy(&self) -> ConversionStrategy {
        self.strategy.strategy()
    }

    pub fn advanced_options(&self) -> AdvancedOptions {
        AdvancedOptions::new(self.precision, self.force_2d, &self.default_layer)
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyPreset::default(),
            precision: Self::default_precision(),
            force_2d: false,
            default_layer: Self::default_layer(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// 输出目录，缺省为当前目录。
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl OutputConfig {
    /// 未指定输出文件时的默认路径：`<目录>/export_<策略>.dxf`。
    pub fn default_file(&self, strategy: StrategyPreset) -> PathBuf {
        let name = format!("export_{}.dxf", strategy.as_str());
        match &self.directory {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("配置项 {field} 无效: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}
