use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use inquire::Text;
use reservation_scraper::config::{load_dotenv, DEFAULT_WEBSITE_URL};
use reservation_scraper::dates::read_until_valid;
use reservation_scraper::{DateEndpoint, DateRange, ExportRequest, ExportService, ScraperConfig};
use tower::Service;
use tracing::error;

/// Little Hotelier の予約を日付範囲でエクスポートしてJSONに保存
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// 開始日 (DD-MM-YYYY)。省略時は入力を求める
    #[arg(long)]
    from: Option<String>,

    /// 終了日 (DD-MM-YYYY)。省略時は入力を求める
    #[arg(long)]
    to: Option<String>,

    #[arg(long, env = "WEBSITE_URL", default_value = DEFAULT_WEBSITE_URL)]
    url: String,

    #[arg(long, env = "USER_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "USER_PASS", hide_env_values = true)]
    password: Option<String>,

    /// JSONの出力先ディレクトリ
    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// ブラウザウィンドウを表示する
    #[arg(long)]
    headed: bool,

    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// タイムアウト時のスクリーンショットなどを出力
    #[arg(long, env = "SCRAPER_DEBUG")]
    debug: bool,
}

impl Cli {
    fn config(&self) -> ScraperConfig {
        let mut config = ScraperConfig::new(
            self.email.clone().unwrap_or_default(),
            self.password.clone().unwrap_or_default(),
        )
        .with_website_url(self.url.clone())
        .with_output_dir(self.output_dir.clone())
        .with_headless(!self.headed)
        .with_debug(self.debug);

        if let Some(path) = &self.chrome_path {
            config = config.with_chrome_path(path);
        }
        config
    }
}

/// 有効な日付が入力されるまで繰り返し尋ねる
///
/// `initial` が指定されていれば最初はそれを検証する。
fn prompt_date(label: &str, initial: Option<String>) -> Result<DateEndpoint, inquire::InquireError> {
    let message = format!("Enter {} date (DD-MM-YYYY):", label);
    read_until_valid(
        initial,
        || Text::new(&message).prompt(),
        |e| eprintln!("❌ {}", e),
    )
}

async fn export(config: ScraperConfig, range: DateRange) -> ExitCode {
    let mut service = ExportService::new();
    match service.call(ExportRequest::new(config, range)).await {
        Ok(outcome) => {
            let path = outcome
                .output_path
                .canonicalize()
                .unwrap_or_else(|_| outcome.output_path.clone());
            println!("✅ {} reservations found.", outcome.records.len());
            println!("💾 Saved reservations to {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Export failed: {}", e);
            eprintln!("An error occurred: {}", e);
            if e.is_timeout() {
                eprintln!("The page did not reach the expected state in time. Check the credentials and the connection, or rerun with --headed --debug.");
            }
            ExitCode::FAILURE
        }
    }
}

// .env の反映と入力はランタイム起動前（シングルスレッド）に済ませる
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = load_dotenv(Path::new(".env")) {
        error!("Failed to read .env: {}", e);
    }

    let cli = Cli::parse();
    let config = cli.config();

    if let Err(e) = config.validate() {
        error!("{}", e);
        eprintln!("ERROR: {}", e);
        return ExitCode::FAILURE;
    }

    let from = match prompt_date("start", cli.from.clone()) {
        Ok(date) => date,
        Err(e) => {
            eprintln!("Input cancelled: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let to = match prompt_date("end", cli.to.clone()) {
        Ok(date) => date,
        Err(e) => {
            eprintln!("Input cancelled: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let range = DateRange::new(from, to);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(export(config, range))
}
