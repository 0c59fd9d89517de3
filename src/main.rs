use anyhow::Context;
use clap::Parser;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use safety_lens::{analyzer, cli, config, controller, error, export, review, staging, store};
use cli::{Cli, Commands, HistoryAction};
use config::Config;
use controller::{Controller, Event, Step, TransitionError, ViewMode};
use error::{Result, SafetyLensError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use store::FileReportStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load().context("設定ファイルの読み込みに失敗しました")?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = Some(dir);
    }

    run(cli.command, config).await?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "safety_lens=debug,safety_lens_common=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Analyze { page1, page2, no_review, output } => {
            println!("📸 safety-lens - 意外報告分析\n");

            let client = analyzer::GeminiClient::from_config(&config)?;
            let mut controller = Controller::new(open_store(&config)?, client, config.timeout());
            warn_storage(controller.state().storage_warning.as_deref());

            // 1. 画像読み込み
            println!("[1/3] 讀取圖片中...");
            let pages: Vec<PathBuf> = std::iter::once(page1).chain(page2).collect();
            for (slot, path) in pages.iter().enumerate() {
                let image = staging::load_image(path, config.max_image_size)?;
                println!("  第{}頁: {} ({} bytes)", slot + 1, image.file_name, image.data.len());
                controller.dispatch(Event::ImageSelected { slot, image }).await?;
            }
            println!("✔ {}張圖片已就緒\n", pages.len());

            // 2. AI解析（Ctrl-Cで中断）
            println!("[2/3] AI 分析中... (Ctrl-C 取消)");
            let spinner = spinner("正在分析報告...");
            let cancel = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            controller.dispatch_with_cancel(Event::AnalyzeRequested, cancel).await?;
            spinner.finish_and_clear();

            let state = controller.state();
            if state.step != Step::Review {
                let message = state
                    .error
                    .clone()
                    .unwrap_or_else(|| controller::EXTRACTION_FAILED_MESSAGE.to_string());
                println!("✗ {}", message);
                return Err(SafetyLensError::AnalysisFailed(message));
            }
            println!("✔ 分析完成\n");

            // 3. 保存・確認
            println!("[3/3] 儲存紀錄...");
            match &state.storage_warning {
                Some(warning) => println!("⚠ 儲存失敗: {}", warning),
                None => println!("✔ 已儲存到紀錄"),
            }

            let output_dir = output_dir(output);
            if no_review {
                if let Some(report) = &state.current {
                    println!();
                    review::print_report(report);
                    println!("報告ID: {}", report.id);
                }
            } else if review::run_review(&mut controller, &output_dir).await? == review::ReviewOutcome::NewReport {
                println!("請再次執行 `safety-lens analyze` 掃描新報告");
            }

            println!("\n✅ 完成");
        }

        Commands::History { action } => run_history(action, &config).await?,

        Commands::Export { id, output } => {
            let store = open_store(&config)?;
            let report = store.get(&id)?.ok_or(SafetyLensError::ReportNotFound(id))?;

            let path = export::trigger_download(&report, &output_dir(output))?;
            println!("✔ 已下載: {}", path.display());
        }

        Commands::Copy { id } => {
            let store = open_store(&config)?;
            let report = store.get(&id)?.ok_or(SafetyLensError::ReportNotFound(id))?;

            if export::copy_to_clipboard(&report) {
                println!("✔ 已複製！可直接貼上到 Excel");
            } else {
                println!("✗ 複製失敗");
            }
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ API金鑰已設定");
            }

            if show {
                println!("設定:");
                println!("  設定檔: {}", Config::config_path()?.display());
                println!("  模型: {}", config.model);
                println!("  API: {}", config.api_base_url);
                println!("  最大圖片尺寸: {}px", config.max_image_size);
                println!("  逾時: {}秒", config.timeout_seconds);
                println!("  紀錄目錄: {}", config.data_dir()?.display());
                match config.get_api_key() {
                    Ok(key) => println!("  API金鑰: {}", config::mask_api_key(&key)),
                    Err(_) => println!("  API金鑰: 未設定"),
                }
            }
        }
    }

    Ok(())
}

async fn run_history(action: HistoryAction, config: &Config) -> Result<()> {
    match action {
        HistoryAction::List => {
            let store = open_store(config)?;
            let reports = store.load_all()?;
            if reports.is_empty() {
                println!("暫無紀錄");
                return Ok(());
            }

            println!("📚 紀錄 ({}份)", reports.len());
            println!("---");
            for report in &reports {
                println!("{}", review::format_history_row(report));
            }
        }

        HistoryAction::Show { id } => {
            let store = open_store(config)?;
            let report = store.get(&id)?.ok_or(SafetyLensError::ReportNotFound(id))?;
            review::print_report(&report);
        }

        HistoryAction::Open { id, output } => {
            let mut controller = history_controller(config)?;
            controller.dispatch(Event::ViewChanged(ViewMode::History)).await?;
            controller
                .dispatch(Event::OpenRecord(id))
                .await
                .map_err(not_found_as_report_error)?;

            if review::run_review(&mut controller, &output_dir(output)).await? == review::ReviewOutcome::NewReport {
                println!("請執行 `safety-lens analyze` 掃描新報告");
            }
        }

        HistoryAction::Delete { id, yes } => {
            let mut controller = history_controller(config)?;
            if !controller.state().history.iter().any(|r| r.id == id) {
                return Err(SafetyLensError::ReportNotFound(id));
            }

            let confirmed = yes
                || Confirm::new()
                    .with_prompt("確定要刪除這份報告嗎？")
                    .default(false)
                    .interact()?;
            if !confirmed {
                println!("已取消");
                return Ok(());
            }

            controller.dispatch(Event::ViewChanged(ViewMode::History)).await?;
            controller.dispatch(Event::DeleteRecord(id)).await?;

            if let Some(warning) = &controller.state().storage_warning {
                return Err(SafetyLensError::Storage(warning.clone()));
            }
            println!("✔ 已刪除（剩餘 {} 份）", controller.state().history.len());
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<FileReportStore> {
    let dir = config.data_dir()?;
    Ok(FileReportStore::open_in(&dir)?)
}

/// 紀錄操作用のコントローラ（抽出は行わないためAPIキーは必須にしない）
fn history_controller(config: &Config) -> Result<Controller<store::FileKeyValueStore, analyzer::GeminiClient>> {
    let client = analyzer::GeminiClient::new(config.get_api_key().unwrap_or_default(), config.model.clone())
        .with_base_url(config.api_base_url.clone());
    let controller = Controller::new(open_store(config)?, client, config.timeout());
    if let Some(warning) = &controller.state().storage_warning {
        return Err(SafetyLensError::Storage(warning.clone()));
    }
    Ok(controller)
}

fn not_found_as_report_error(err: TransitionError) -> SafetyLensError {
    match err {
        TransitionError::RecordNotFound(id) => SafetyLensError::ReportNotFound(id),
        other => other.into(),
    }
}

fn output_dir(output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| Path::new(".").to_path_buf())
}

fn warn_storage(warning: Option<&str>) {
    if let Some(warning) = warning {
        println!("⚠ 無法讀取紀錄: {}\n", warning);
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
