use std::path::PathBuf;
use std::time::Duration;

use eyre::{Result, WrapErr};
use log::{debug, info, warn};

mod cli;

use cli::Cli;
use ytbrief::config::{self, Config};
use ytbrief::ollama::OllamaClient;
use ytbrief::prompt::PromptBuilder;
use ytbrief::router::{LinkMatcher, Outbox, Router};
use ytbrief::session::SessionStore;
use ytbrief::telegram::{self, BotApi};
use ytbrief::youtube::YtDlpFetcher;

/// Pause after a failed poll before asking again
const POLL_BACKOFF: Duration = Duration::from_secs(5);

fn setup_logging() -> Result<PathBuf> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytbrief.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(log_file)
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytbrief")
        .join("logs")
}

/// Replies for one chat
struct ChatOutbox<'a> {
    api: &'a BotApi,
    chat_id: i64,
}

impl Outbox for ChatOutbox<'_> {
    async fn send(&mut self, text: &str) -> Result<()> {
        self.api
            .send_message(self.chat_id, text)
            .await
            .wrap_err_with(|| format!("reply to chat {} failed", self.chat_id))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = setup_logging()?;

    let cli = <Cli as clap::Parser>::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let token = config::telegram_token()?;

    let model = cli.model.clone().unwrap_or_else(|| config.model().to_string());
    let endpoint = cli.endpoint.clone().unwrap_or_else(|| config.endpoint().to_string());

    let client = reqwest::Client::new();
    let api = BotApi::new(client.clone(), &token);
    let bot_username = api
        .get_me()
        .await
        .wrap_err("could not reach the Telegram Bot API with the configured token")?
        .username
        .unwrap_or_default();

    let mut fetcher = YtDlpFetcher::new(client.clone(), config.metadata_timeout(), config.caption_timeout());
    if let Some(program) = &config.yt_dlp {
        fetcher = fetcher.with_program(program.clone());
    }
    let generator = OllamaClient::new(client, endpoint, model, config.inference_timeout());

    if cli.verbose {
        eprintln!(
            "Bot: @{bot_username}\nModel: {}\nEndpoint: {}\nLogs: {}",
            generator.model(),
            generator.endpoint(),
            log_file.display()
        );
    }
    info!(
        "Starting as @{bot_username} with model {} at {}",
        generator.model(),
        generator.endpoint()
    );

    let sessions = SessionStore::new(config.session_capacity(), config.session_ttl());

    let mut router = Router::new(fetcher, generator, sessions)
        .with_prompts(PromptBuilder::new(config.transcript_budget()));
    if let Some(hosts) = config.video_hosts.clone() {
        router = router.with_links(LinkMatcher::new(hosts));
    }
    if let Some(languages) = config.language_detector() {
        router = router.with_languages(languages);
    }

    let poll_timeout = config.poll_timeout();
    let mut offset = 0;

    loop {
        let updates = match api.get_updates(offset, poll_timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("getUpdates failed: {e:?}");
                tokio::time::sleep(POLL_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(incoming) = update.incoming() else {
                debug!("Skipping update {} without text", update.update_id);
                continue;
            };

            let mut out = ChatOutbox {
                api: &api,
                chat_id: incoming.chat_id,
            };

            if !telegram::is_command(&incoming.text) {
                router.handle_message(incoming.user_id, &incoming.text, &mut out).await;
            } else if telegram::command(&incoming.text, &bot_username) == Some("start") {
                router.start(&mut out).await;
            } else {
                debug!("Ignoring command {:?}", incoming.text);
            }
            debug!("{} active sessions", router.sessions().len());
        }
    }
}
