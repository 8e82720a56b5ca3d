use std::future::Future;

use eyre::Result;
use log::{error, info};

use crate::language::LanguageDetector;
use crate::ollama::TextGenerator;
use crate::prompt::PromptBuilder;
use crate::session::{SessionStore, UserId};
use crate::youtube::{FetchOutcome, TranscriptFetcher};

pub const GREETING: &str = "Send me a YouTube link 🎥";
pub const NO_TRANSCRIPT: &str = "No transcript available.";
pub const NO_SESSION: &str = "Please send a YouTube link first.";
pub const PROCESSING: &str = "Processing transcript... ⏳";
pub const FAILED: &str = "Something went wrong.";
pub const NO_SUMMARY: &str = "No summary generated.";
pub const NO_ANSWER: &str = "No answer generated.";

/// Where the router's replies go
pub trait Outbox {
    fn send(&mut self, text: &str) -> impl Future<Output = Result<()>> + Send;
}

impl Outbox for Vec<String> {
    async fn send(&mut self, text: &str) -> Result<()> {
        self.push(text.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Summarize,
    Question,
}

/// Decides whether a message is a video request by plain, case-sensitive substring match
#[derive(Debug, Clone)]
pub struct LinkMatcher {
    hosts: Vec<String>,
}

impl LinkMatcher {
    pub fn new(hosts: impl IntoIterator<Item = String>) -> Self {
        Self {
            hosts: hosts.into_iter().collect(),
        }
    }

    pub fn classify(&self, text: &str) -> Route {
        if self.hosts.iter().any(|host| text.contains(host.as_str())) {
            Route::Summarize
        } else {
            Route::Question
        }
    }
}

impl Default for LinkMatcher {
    fn default() -> Self {
        Self::new(["youtube.com".to_string(), "youtu.be".to_string()])
    }
}

/// Per-user conversation: a video link starts a session, anything else is a question about it.
pub struct Router<F, G> {
    fetcher: F,
    generator: G,
    sessions: SessionStore,
    links: LinkMatcher,
    languages: LanguageDetector,
    prompts: PromptBuilder,
}

impl<F: TranscriptFetcher, G: TextGenerator> Router<F, G> {
    pub fn new(fetcher: F, generator: G, sessions: SessionStore) -> Self {
        Self {
            fetcher,
            generator,
            sessions,
            links: LinkMatcher::default(),
            languages: LanguageDetector::default(),
            prompts: PromptBuilder::default(),
        }
    }

    pub fn with_links(mut self, links: LinkMatcher) -> Self {
        self.links = links;
        self
    }

    pub fn with_languages(mut self, languages: LanguageDetector) -> Self {
        self.languages = languages;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn start(&self, out: &mut impl Outbox) {
        if let Err(e) = out.send(GREETING).await {
            error!("Greeting failed: {e:?}");
        }
    }

    /// Route one text message; failures are logged and turned into a generic reply
    pub async fn handle_message(&mut self, user: UserId, text: &str, out: &mut impl Outbox) {
        let route = self.links.classify(text);
        info!("Message from user {user} routed to {route:?}");

        let result = match route {
            Route::Summarize => self.summarize(user, text, out).await,
            Route::Question => self.answer(user, text, out).await,
        };

        if let Err(e) = result {
            error!("{route:?} failed for user {user}: {e:?}");
            if let Err(e) = out.send(FAILED).await {
                error!("Failure reply to user {user} failed too: {e:?}");
            }
        }
    }

    async fn summarize(&mut self, user: UserId, text: &str, out: &mut impl Outbox) -> Result<()> {
        let transcript = match self.fetcher.fetch(text).await? {
            FetchOutcome::Found(transcript) => transcript,
            FetchOutcome::Unavailable => {
                out.send(NO_TRANSCRIPT).await?;
                return Ok(());
            }
        };

        let language = self.languages.detect(text);
        let prompt = self.prompts.summarize(language, &transcript.text);
        let title = transcript.title.clone();
        self.sessions.set(user, transcript);

        out.send(&format!("🎥 {title}")).await?;
        out.send(PROCESSING).await?;

        let summary = self.generator.generate(&prompt).await?.or_placeholder(NO_SUMMARY);
        out.send(&summary).await?;
        Ok(())
    }

    async fn answer(&mut self, user: UserId, question: &str, out: &mut impl Outbox) -> Result<()> {
        let language = self.languages.detect(question);
        let prompt = match self.sessions.get(user) {
            Some(transcript) => self.prompts.answer(language, &transcript.text, question),
            None => {
                out.send(NO_SESSION).await?;
                return Ok(());
            }
        };

        let answer = self.generator.generate(&prompt).await?.or_placeholder(NO_ANSWER);
        out.send(&answer).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use eyre::bail;

    use super::*;
    use crate::Transcript;
    use crate::language::Language;
    use crate::ollama::Generation;

    /// Answers by the first key contained in the reference; unknown references error
    struct FakeFetcher {
        videos: Vec<(&'static str, FetchOutcome)>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn new(videos: Vec<(&'static str, FetchOutcome)>) -> Self {
            Self {
                videos,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TranscriptFetcher for FakeFetcher {
        async fn fetch(&self, reference: &str) -> Result<FetchOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.videos.iter().find(|(key, _)| reference.contains(*key)) {
                Some((_, outcome)) => Ok(outcome.clone()),
                None => bail!("extractor exploded on {reference}"),
            }
        }
    }

    struct FakeGenerator {
        reply: Option<Generation>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(Generation::Text(text.to_string())),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn with(reply: Option<Generation>) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl TextGenerator for FakeGenerator {
        async fn generate(&self, prompt: &str) -> Result<Generation> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => bail!("connection refused"),
            }
        }
    }

    fn found(title: &str, text: &str) -> FetchOutcome {
        FetchOutcome::Found(Transcript {
            title: title.to_string(),
            text: text.to_string(),
        })
    }

    fn router(videos: Vec<(&'static str, FetchOutcome)>, generator: FakeGenerator) -> Router<FakeFetcher, FakeGenerator> {
        Router::new(FakeFetcher::new(videos), generator, SessionStore::default())
    }

    #[test]
    fn test_classify() {
        let links = LinkMatcher::default();
        assert_eq!(links.classify("https://www.youtube.com/watch?v=abc"), Route::Summarize);
        assert_eq!(links.classify("look https://youtu.be/xyz"), Route::Summarize);
        assert_eq!(links.classify("is youtube.com mentioned?"), Route::Summarize);
        assert_eq!(links.classify("what did they say about rust?"), Route::Question);
        // host match is case-sensitive
        assert_eq!(links.classify("https://YOUTU.BE/xyz"), Route::Question);
        assert_eq!(links.classify(""), Route::Question);
    }

    #[test]
    fn test_classify_custom_hosts() {
        let links = LinkMatcher::new(["vimeo.com".to_string()]);
        assert_eq!(links.classify("https://vimeo.com/1"), Route::Summarize);
        assert_eq!(links.classify("https://youtu.be/xyz"), Route::Question);
    }

    #[tokio::test]
    async fn test_start_greeting() {
        let r = router(vec![], FakeGenerator::replying("unused"));
        let mut out = Vec::new();
        r.start(&mut out).await;
        assert_eq!(out, vec![GREETING.to_string()]);
    }

    #[tokio::test]
    async fn test_summarize_end_to_end_in_hindi() {
        let transcript: String = "word ".repeat(600);
        let mut r = router(
            vec![("youtu.be/xyz", found("Cooking Rice", &transcript))],
            FakeGenerator::replying("सारांश"),
        );
        let mut out = Vec::new();
        r.handle_message(1, "https://youtu.be/xyz in hindi", &mut out).await;

        assert_eq!(out, vec!["🎥 Cooking Rice".to_string(), PROCESSING.to_string(), "सारांश".to_string()]);
        let expected = PromptBuilder::default().summarize(Language::Hindi, &transcript);
        assert_eq!(r.generator.prompts(), vec![expected]);
        assert!(r.generator.prompts()[0].contains(&transcript[..2000]));
        assert!(!r.generator.prompts()[0].contains(&transcript[..2001]));
        assert_eq!(r.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_track_writes_no_session() {
        let mut r = router(
            vec![("youtu.be/nocaps", FetchOutcome::Unavailable)],
            FakeGenerator::replying("unused"),
        );
        let mut out = Vec::new();
        r.handle_message(1, "https://youtu.be/nocaps", &mut out).await;

        assert_eq!(out, vec![NO_TRANSCRIPT.to_string()]);
        assert!(r.sessions.is_empty());
        assert!(r.generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_question_without_session() {
        let mut r = router(vec![], FakeGenerator::replying("unused"));
        let mut out = Vec::new();
        r.handle_message(9, "what is this about?", &mut out).await;

        assert_eq!(out, vec![NO_SESSION.to_string()]);
        assert!(r.generator.prompts().is_empty());
        assert_eq!(r.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_question_uses_latest_video() {
        let mut r = router(
            vec![
                ("youtu.be/first", found("First", "alpha transcript")),
                ("youtu.be/second", found("Second", "beta transcript")),
            ],
            FakeGenerator::replying("an answer"),
        );
        let mut out = Vec::new();
        r.handle_message(5, "https://youtu.be/first", &mut out).await;
        r.handle_message(5, "https://youtu.be/second", &mut out).await;
        out.clear();

        r.handle_message(5, "Who is speaking? answer in tamil", &mut out).await;
        assert_eq!(out, vec!["an answer".to_string()]);

        let prompts = r.generator.prompts();
        let last = prompts.last().unwrap();
        assert_eq!(
            last,
            &PromptBuilder::default().answer(Language::Tamil, "beta transcript", "Who is speaking? answer in tamil")
        );
        assert!(!last.contains("alpha"));
    }

    #[tokio::test]
    async fn test_sessions_are_per_user() {
        let mut r = router(
            vec![("youtu.be/one", found("One", "one transcript"))],
            FakeGenerator::replying("ok"),
        );
        let mut out = Vec::new();
        r.handle_message(1, "https://youtu.be/one", &mut out).await;
        out.clear();
        r.handle_message(2, "question from someone else", &mut out).await;
        assert_eq!(out, vec![NO_SESSION.to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_error_is_generic_failure() {
        let mut r = router(vec![], FakeGenerator::replying("unused"));
        let mut out = Vec::new();
        r.handle_message(1, "https://youtu.be/boom", &mut out).await;

        assert_eq!(out, vec![FAILED.to_string()]);
        assert!(r.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_inference_error_keeps_session() {
        let mut r = router(vec![("youtu.be/ok", found("Ok", "some text"))], FakeGenerator::with(None));
        let mut out = Vec::new();
        r.handle_message(1, "https://youtu.be/ok", &mut out).await;

        assert_eq!(out, vec!["🎥 Ok".to_string(), PROCESSING.to_string(), FAILED.to_string()]);
        assert_eq!(r.sessions.len(), 1);

        out.clear();
        r.handle_message(1, "and then?", &mut out).await;
        assert_eq!(out, vec![FAILED.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_response_field_placeholders() {
        let mut r = router(
            vec![("youtu.be/ok", found("Ok", "some text"))],
            FakeGenerator::with(Some(Generation::Missing)),
        );
        let mut out = Vec::new();
        r.handle_message(1, "https://youtu.be/ok", &mut out).await;
        assert_eq!(out.last().map(String::as_str), Some(NO_SUMMARY));

        out.clear();
        r.handle_message(1, "what happened?", &mut out).await;
        assert_eq!(out, vec![NO_ANSWER.to_string()]);
    }

    #[tokio::test]
    async fn test_custom_budget() {
        let mut r = router(
            vec![("youtu.be/ok", found("Ok", "abcdefghij"))],
            FakeGenerator::replying("fine"),
        )
        .with_prompts(PromptBuilder::new(3));
        let mut out = Vec::new();
        r.handle_message(1, "https://youtu.be/ok", &mut out).await;
        assert!(r.generator.prompts()[0].ends_with("Transcript:\nabc\n"));
    }

    /// Rejects empty text the way the chat API does
    #[derive(Default)]
    struct StrictOutbox {
        sent: Vec<String>,
    }

    impl Outbox for StrictOutbox {
        async fn send(&mut self, text: &str) -> Result<()> {
            if text.is_empty() {
                bail!("Bad Request: message text is empty");
            }
            self.sent.push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_summary_relay_sends_generic_failure() {
        let mut r = router(vec![("youtu.be/ok", found("Ok", "some text"))], FakeGenerator::replying(""));
        let mut out = StrictOutbox::default();
        r.handle_message(1, "https://youtu.be/ok", &mut out).await;
        assert_eq!(
            out.sent,
            vec!["🎥 Ok".to_string(), PROCESSING.to_string(), FAILED.to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_answer_relay_sends_generic_failure() {
        let mut r = router(vec![("youtu.be/ok", found("Ok", "some text"))], FakeGenerator::replying(""));
        r.sessions.set(
            3,
            Transcript {
                title: "Ok".to_string(),
                text: "some text".to_string(),
            },
        );
        let mut out = StrictOutbox::default();
        r.handle_message(3, "what was said?", &mut out).await;
        assert_eq!(out.sent, vec![FAILED.to_string()]);
    }

    #[tokio::test]
    async fn test_custom_language_rules() {
        let mut r = router(vec![("youtu.be/ok", found("Ok", "text"))], FakeGenerator::replying("ok"))
            .with_languages(LanguageDetector::new([("ಕನ್ನಡ".to_string(), Language::Kannada)], Language::English));
        let mut out = Vec::new();
        r.handle_message(1, "https://youtu.be/ok ಕನ್ನಡ", &mut out).await;
        r.handle_message(1, "in hindi please", &mut out).await;

        let prompts = r.generator.prompts();
        assert!(prompts[0].contains("concisely in Kannada."));
        assert!(prompts[1].starts_with("Answer the question in English."));
    }
}
