use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use sdxf_config::{AppConfig, ConfigError};
use sdxf_engine::{CancellationToken, ConversionCoordinator, ConversionOutcome, ConversionRequest};
use sdxf_io::{DocumentLoader, DxfSummary, SceneLoader};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod cli;
mod errors;
mod output;

use cli::Cli;
use errors::AppError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, config_error) = load_configuration(&cli);
    init_logging(&config);
    if let Some(err) = config_error {
        warn!(error = %err, "加载配置失败，使用内建默认值");
    }

    match run(&cli, config) {
        Ok(report) => {
            print!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "转换未完成");
            eprintln!("sdxf: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli, mut config: AppConfig) -> Result<String, AppError> {
    cli.apply_overrides(&mut config.conversion);
    let conversion = &config.conversion;
    info!(
        input = %cli.input.display(),
        strategy = %conversion.strategy,
        precision = conversion.precision,
        "启动 sdxf 转换"
    );

    let document = SceneLoader::new().load(&cli.input)?;
    let mut request = ConversionRequest::new(
        document,
        conversion.strategy(),
        conversion.advanced_options(),
    );
    if let Some(seed) = conversion.seed {
        request = request.with_seed(seed);
    }

    let token = CancellationToken::new();
    match cli.cancel_after {
        Some(0) => token.cancel(),
        Some(ms) => {
            let deadline = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(ms));
                deadline.cancel();
            });
        }
        None => {}
    }

    let mut coordinator = ConversionCoordinator::new();
    coordinator.start(request, token)?;
    let text = match coordinator.wait()? {
        ConversionOutcome::Completed(text) => text,
        ConversionOutcome::Cancelled => return Err(AppError::Cancelled),
        ConversionOutcome::Failed(message) => return Err(AppError::Failed(message)),
    };

    let path = cli
        .output
        .clone()
        .unwrap_or_else(|| config.output.default_file(conversion.strategy));
    sdxf_io::write_drawing(&path, &text)?;

    let summary = DxfSummary::from_text(&text)?;
    Ok(output::render_report(&path, text.len() as u64, &summary))
}

fn load_configuration(cli: &Cli) -> (AppConfig, Option<ConfigError>) {
    let loaded = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
