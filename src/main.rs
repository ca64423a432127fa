use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use log::{info, warn};
use media_normalize::cli::Cli;
use media_normalize::component::MediaNormalizer;
use media_normalize::component::run_report::print_summary;
use media_normalize::config::save::save_settings;
use media_normalize::config::{Config, UserSettings};
use media_normalize::error::NormalizeError;
use media_normalize::init;
use media_normalize::signal::setup_shutdown_signal;
use media_normalize::tools::validate_directory_exists;
use rust_i18n::t;
use std::path::PathBuf;
use std::process::ExitCode;

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en-US");

/// 收到中斷信號時的結束碼（128 + SIGINT）
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    init::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            warn!("Program error: {e:#}");
            eprintln!("{} {e:#}", style(t!("main.fatal")).red().bold());
            if matches!(
                e.downcast_ref::<NormalizeError>(),
                Some(NormalizeError::ToolMissing { .. })
            ) {
                eprintln!("{}", style(t!("main.install_hint")).yellow());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.init_settings {
        let mut settings = UserSettings::default();
        if let Some(language) = cli.language {
            settings.language = language;
        }
        rust_i18n::set_locale(settings.language.as_str());
        save_settings(&cli.settings, &settings)?;
        println!(
            "{}",
            style(t!("main.settings_written", path = cli.settings.display())).green()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let root_dir = resolve_root(cli.root_dir)?;
    let mut config = Config::load(root_dir, &cli.settings)?;
    if let Some(language) = cli.language {
        config.settings.language = language;
    }
    rust_i18n::set_locale(config.settings.language.as_str());

    let shutdown_signal = setup_shutdown_signal()?;
    let normalizer = MediaNormalizer::new(config, shutdown_signal).quiet(cli.json);
    let result = normalizer.run()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    if result.interrupted {
        info!("Program interrupted");
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    info!("Program exited normally");
    Ok(ExitCode::SUCCESS)
}

/// 根目錄：命令列參數 → `ROOT_DIR` 環境變數 → 目前工作目錄
fn resolve_root(root_dir: Option<PathBuf>) -> Result<PathBuf> {
    let root_dir = match root_dir {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    validate_directory_exists(&root_dir)?;
    root_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve ROOT_DIR {}", root_dir.display()))
}
