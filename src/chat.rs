use clap::Parser;
use pdf_chat::application::Session;
use pdf_chat::console::{Console, TypingRenderer};
use pdf_chat::infrastructure::{init_tracing, session_services, AppConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use uuid::Uuid;

/// Chat with a PDF from the terminal.
///
/// Upload with `/upload <path>` or pass the PDF as an argument, then type
/// questions. Answers stream in as the model produces them.
#[derive(Parser)]
#[command(name = "chat", version)]
struct Cli {
    /// Directory holding `config.yaml` and `prompts.yaml`.
    #[arg(long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Pause between rendered fragments in milliseconds; overrides
    /// `console.typing_delay_ms`. `0` prints as fast as the model answers.
    #[arg(long)]
    typing_delay_ms: Option<u64>,

    /// PDF to ingest before the first prompt.
    pdf: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("chat=info,pdf_chat=info");

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config_dir)?;

    let services = Arc::new(session_services(&config)?);
    let session = Session::open(Uuid::new_v4(), services).await?;

    let delay = cli
        .typing_delay_ms
        .unwrap_or(config.config.console.typing_delay_ms);
    let renderer = TypingRenderer::new(tokio::io::stdout(), Duration::from_millis(delay));
    let mut console = Console::new(
        session,
        renderer,
        config.prompts.chat.no_document_message.clone(),
    );

    if let Some(pdf) = &cli.pdf {
        console.upload_path(pdf).await?;
    }

    console.run(BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}
