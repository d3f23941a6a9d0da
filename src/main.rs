//! wxsentry - AI weather, warning, and earthquake broadcast monitoring.
//!
//! A terminal-first CLI client for an AI weather-broadcast backend, with a
//! direct CWA open-data variant and a small local web dashboard.

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::error;

mod ai;
mod backend;
mod cli;
mod cwa;
mod errors;
mod feed;
mod models;
mod output;
mod schedule;
mod server;
mod transport;

use ai::AiClient;
use backend::{BackendClient, Pager, RecordKind};
use cli::{Cli, Command};
use cwa::CwaClient;
use feed::MessageLog;
use models::{EarthquakeRecord, ForecastRecord, WarningRecord};
use output::Format;
use schedule::{countdown, next_top_of_hour, Scheduler};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    runtime.block_on(async {
        match cli.command {
            Command::Status(args) => cmd_status(args).await,
            Command::Current(args) => cmd_current(args).await,
            Command::Broadcast(args) => cmd_broadcast(args).await,
            Command::History(args) => cmd_history(args).await,
            Command::ReReport(args) => cmd_re_report(args).await,
            Command::Watch(args) => cmd_watch(args).await,
            Command::Ui(args) => cmd_ui(args).await,
        }
    })
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the `status` command - one-shot config fetch.
async fn cmd_status(args: cli::StatusArgs) -> Result<()> {
    let client = BackendClient::new(&args.backend).context("failed to create backend client")?;

    let config = client
        .fetch_config()
        .await
        .context("failed to fetch backend config")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_config(&mut handle, &config, args.format)?;
    Ok(())
}

/// Execute the `current` command - read-through or forced snapshot fetch.
async fn cmd_current(args: cli::CurrentArgs) -> Result<()> {
    let client = BackendClient::new(&args.backend).context("failed to create backend client")?;

    let snapshot = client
        .fetch_weather(args.refresh)
        .await
        .context("failed to fetch weather snapshot")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_snapshot(&mut handle, &snapshot, args.format)?;
    Ok(())
}

/// Execute the `broadcast` command - forced regeneration plus follow-up read.
async fn cmd_broadcast(args: cli::BroadcastArgs) -> Result<()> {
    let client = BackendClient::new(&args.backend).context("failed to create backend client")?;

    let snapshot = client
        .broadcast()
        .await
        .context("failed to trigger broadcast")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.format == Format::Human {
        writeln!(handle, "已觸發手動播報，以下為回讀後的快照：\n")?;
    }
    output::write_snapshot(&mut handle, &snapshot, args.format)?;
    Ok(())
}

/// Execute the `history` command - one page of records with footer.
async fn cmd_history(args: cli::HistoryArgs) -> Result<()> {
    let client = BackendClient::new(&args.backend).context("failed to create backend client")?;

    let mut pager = Pager::new(args.limit);
    if let Some(query) = &args.query {
        // A new search always starts at page 0
        pager.search(query.clone());
    }
    pager.page = args.page;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    let rows = match args.kind {
        RecordKind::Forecasts => {
            let rows: Vec<ForecastRecord> = client.fetch_records(args.kind, &pager).await?;
            output::write_forecasts(&mut handle, &rows, args.format)?;
            rows.len()
        }
        RecordKind::Warnings => {
            let rows: Vec<WarningRecord> = client.fetch_records(args.kind, &pager).await?;
            output::write_warnings(&mut handle, &rows, args.format)?;
            rows.len()
        }
        RecordKind::Earthquakes => {
            let rows: Vec<EarthquakeRecord> = client.fetch_records(args.kind, &pager).await?;
            output::write_earthquakes(&mut handle, &rows, args.format)?;
            rows.len()
        }
    };
    pager.record_fetch(rows);

    if args.format == Format::Human {
        output::write_page_footer(&mut handle, &pager, rows)?;
    }
    Ok(())
}

/// Execute the `re-report` command - confirm, then fire-and-forget POST.
async fn cmd_re_report(args: cli::ReReportArgs) -> Result<()> {
    if !args.kind.supports_re_report() {
        anyhow::bail!(
            "{} records have no re-report endpoint (only warnings and earthquakes)",
            args.kind.as_str()
        );
    }

    if !args.yes && !confirm_re_report(args.kind, args.id)? {
        println!("已取消。");
        return Ok(());
    }

    let client = BackendClient::new(&args.backend).context("failed to create backend client")?;
    client
        .re_report(args.kind, args.id)
        .await
        .context("re-report request failed")?;

    // Deliberately no auto-refresh: the backend regenerates asynchronously
    println!(
        "已送出重播請求。列表不會自動更新，請稍後執行 `wxsentry history {}` 查看結果。",
        args.kind.as_str()
    );
    Ok(())
}

/// Interactive y/N prompt on stderr.
fn confirm_re_report(kind: RecordKind, id: i64) -> Result<bool> {
    eprint!("確定要重新生成並播報 {} #{id} 嗎？ [y/N] ", kind.as_str());
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Execute the `watch` command - direct-call variant with hourly rescheduling.
async fn cmd_watch(args: cli::WatchArgs) -> Result<()> {
    let cwa = CwaClient::new(args.cwa_key).context(
        "CWA client setup failed.\nHint: pass --cwa-key or set the CWA_API_KEY environment variable",
    )?;
    let ai = AiClient::new(args.gemini_key, &args.model)
        .context("failed to create Gemini client")?;

    let mut log = MessageLog::new();
    let mut rendered = 0usize;

    // Print startup banner
    {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "\x1b[1m🤖 wxsentry watch\x1b[0m")?;
        writeln!(
            handle,
            "\x1b[2mModel: {} | 整點更新 | Press Ctrl+C to stop\x1b[0m",
            args.model
        )?;
        writeln!(
            handle,
            "\x1b[2m─────────────────────────────────────────────────────\x1b[0m"
        )?;
    }

    if args.once {
        run_cycle(&cwa, &ai, &mut log).await;
        render_feed_from(&log, &mut rendered)?;
        return Ok(());
    }

    let (fire_tx, mut fire_rx) = tokio::sync::mpsc::channel::<()>(1);
    let mut scheduler = Scheduler::new();
    let mut cycle_count = 0u64;

    loop {
        cycle_count += 1;
        tracing::debug!("starting cycle #{}", cycle_count);

        run_cycle(&cwa, &ai, &mut log).await;

        // Arm the next cycle regardless of this one's outcome
        let next = next_top_of_hour(Utc::now());
        let tx = fire_tx.clone();
        scheduler.arm(next, async move {
            let _ = tx.send(()).await;
        });
        log.push_system(format!("已排定下次更新: {}", next.with_timezone(&chrono::Local).format("%H:%M")));
        render_feed_from(&log, &mut rendered)?;

        // One-second display tick: derived countdown only, never a fetch
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = fire_rx.recv() => break,
                _ = tick.tick() => {
                    let remaining = countdown(Utc::now(), next);
                    print!("\r\x1b[2m⏳ 下次更新 {remaining}\x1b[0m ");
                    let _ = io::stdout().flush();
                }
            }
        }
        // Clear the countdown line before the next cycle renders
        println!("\r\x1b[2K");
    }
}

/// One fetch-and-generate cycle. Failures become feed entries; the AI step
/// never fails.
async fn run_cycle(cwa: &CwaClient, ai: &AiClient, log: &mut MessageLog) {
    let overview = match cwa.fetch_overview().await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("overview fetch failed: {}", e);
            log.push_error(format!("概況取得失敗: {e}"));
            String::new()
        }
    };

    let cities = match cwa.fetch_city_forecasts().await {
        Ok(cities) => cities,
        Err(e) => {
            tracing::warn!("city forecast fetch failed: {}", e);
            log.push_error(format!("縣市預報取得失敗: {e}"));
            return;
        }
    };

    let report = ai.generate(&overview, &cities).await;
    log.push_ai(report);
}

/// Render feed messages appended since the last call.
fn render_feed_from(log: &MessageLog, rendered: &mut usize) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for message in log.iter().skip(*rendered) {
        output::write_message(&mut handle, message)?;
    }
    *rendered = log.len();
    handle.flush()
}

/// Execute the `ui` command - start the local dashboard server.
async fn cmd_ui(args: cli::UiArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        backend_url: args.backend.clone(),
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🤖 wxsentry Dashboard\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Backend: {}", args.backend);
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    server::run_server(config).await
}
