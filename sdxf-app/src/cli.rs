use std::path::PathBuf;

use clap::Parser;
use sdxf_config::{ConversionConfig, MAX_PRECISION};
use sdxf_core::strategy::StrategyPreset;

/// 将场景图 JSON 转换为 ASCII DXF。
#[derive(Debug, Parser)]
#[command(name = "sdxf", version, about = "Convert a scene-graph JSON document to ASCII DXF")]
pub struct Cli {
    /// Scene JSON document to convert
    pub input: PathBuf,

    /// Output file (defaults to `export_<strategy>.dxf` in the configured output directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Conversion preset: balanced, highQuality, performance, mobile, legacy
    #[arg(short, long)]
    pub strategy: Option<StrategyPreset>,

    /// Decimal digits kept in every coordinate
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_PRECISION)))]
    pub precision: Option<u32>,

    /// Force every z coordinate to 0
    #[arg(long = "force-2d")]
    pub force_2d: bool,

    /// Layer assigned to every entity
    #[arg(short, long)]
    pub layer: Option<String>,

    /// Seed for placeholder generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Configuration file (overrides SDXF_CONFIG and ./config/default.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Request cancellation after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub cancel_after: Option<u64>,
}

impl Cli {
    /// 命令行参数覆盖配置文件中的转换参数。
    pub fn apply_overrides(&self, conversion: &mut ConversionConfig) {
        if let Some(strategy) = self.strategy {
            conversion.strategy = strategy;
        }
        if let Some(precision) = self.precision {
            conversion.precision = precision;
        }
        if self.force_2d {
            conversion.force_2d = true;
        }
        if let Some(layer) = &self.layer {
            conversion.default_layer = layer.clone();
        }
        if self.seed.is_some() {
            conversion.seed = self.seed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_configuration() {
        let cli = Cli::try_parse_from([
            "sdxf",
            "scene.json",
            "--strategy",
            "Mobile",
            "-p",
            "2",
            "--force-2d",
            "--layer",
            "WALLS",
            "--seed",
            "9",
        ])
        .unwrap();
        let mut conversion = ConversionConfig::default();
        cli.apply_overrides(&mut conversion);
        assert_eq!(conversion.strategy, StrategyPreset::Mobile);
        assert_eq!(conversion.precision, 2);
        assert!(conversion.force_2d);
        assert_eq!(conversion.default_layer, "WALLS");
        assert_eq!(conversion.seed, Some(9));
    }

    #[test]
    fn absent_flags_keep_configuration() {
        let cli = Cli::try_parse_from(["sdxf", "scene.json"]).unwrap();
        let mut conversion = ConversionConfig {
            precision: 6,
            force_2d: true,
            seed: Some(1),
            ..ConversionConfig::default()
        };
        cli.apply_overrides(&mut conversion);
        assert_eq!(conversion.precision, 6);
        assert!(conversion.force_2d);
        assert_eq!(conversion.seed, Some(1));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["sdxf", "scene.json", "--strategy", "turbo"]).is_err());
        assert!(Cli::try_parse_from(["sdxf", "scene.json", "--precision", "101"]).is_err());
    }
}
