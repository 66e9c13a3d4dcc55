//! Pinterest Downloader - CLI entry point.

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use pinterest_downloader::{
    api::PinterestApi,
    cli::Args,
    config::{validate_config, validate_username, Config, DownloadMode},
    download::{download_single_pin, download_user_feed, CancelContext, DownloadState, Muxer},
    error::{exit_codes, Error, Result},
    output::{print_banner, print_config_summary, print_error, print_run_stats, print_warning},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cancel = CancelContext::new();

    let outcome = tokio::select! {
        result = run(&cancel) => result,
        _ = tokio::signal::ctrl_c() => {
            print_warning("Interrupted, cleaning up");
            cancel.cleanup().await;
            return ExitCode::from(exit_codes::ABORT as u8);
        }
    };

    match outcome {
        Ok(state) if state.has_failures() => ExitCode::from(exit_codes::SOME_ITEMS_FAILED as u8),
        Ok(_) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::InvalidPinRef(_)
                | Error::TomlParse(_) => ExitCode::from(exit_codes::CONFIG_ERROR as u8),
                Error::Status { .. }
                | Error::Http(_)
                | Error::Feed(_)
                | Error::Extraction { .. }
                | Error::CacheMiss(_) => ExitCode::from(exit_codes::API_ERROR as u8),
                Error::Acquisition(_)
                | Error::Mux { .. }
                | Error::Manifest(_)
                | Error::FFmpegNotFound => ExitCode::from(exit_codes::DOWNLOAD_ERROR as u8),
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

async fn run(cancel: &CancelContext) -> Result<DownloadState> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    print_banner();

    // Load configuration
    let config_path = args.config.clone();
    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        print_warning(&format!(
            "Configuration file not found: {}, using defaults",
            config_path.display()
        ));
        Config::default()
    };

    args.merge_into_config(&mut config);
    validate_config(&config)?;

    let (mode, source) = args.download_mode()?;

    print_config_summary(
        &mode.to_string(),
        config.options.media_type,
        config.options.pages,
        &config.output_directory().display().to_string(),
    );

    let api = PinterestApi::new(&config.site, config.retry)?;
    let muxer = Muxer::new(&config.muxer.ffmpeg_path);

    let started = Instant::now();
    let state = match &mode {
        DownloadMode::User { username } => {
            let username = validate_username(username)?;
            download_user_feed(&api, &muxer, &config, cancel, &username, &source).await?
        }
        DownloadMode::Pin { pin } => {
            download_single_pin(&api, &muxer, &config, cancel, Some(pin), &source).await?
        }
    };

    print_run_stats(&state, started.elapsed());

    Ok(state)
}
