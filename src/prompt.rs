use crate::language::Language;

/// Number of transcript characters included in every prompt
pub const DEFAULT_TRANSCRIPT_BUDGET: usize = 2000;

/// Phrase the model is told to reply with when the transcript does not cover a question
pub const NOT_COVERED: &str = "This topic is not covered in the video.";

/// Renders the summarize and answer instructions sent to the model.
///
/// The transcript is cut to the first `budget` characters with no regard for
/// word or sentence boundaries. The summary layout still asks for timestamps
/// even though the transcript carries none, so that section is whatever the
/// model makes of the text.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    budget: usize,
}

impl PromptBuilder {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    pub fn summarize(&self, language: Language, transcript: &str) -> String {
        let excerpt = truncate_chars(transcript, self.budget);
        format!(
            "Summarize the following YouTube transcript clearly and concisely in {language}.

Use only the transcript below.
Do not add external knowledge.

Return output strictly in this format:

📌 5 Key Points
1.
2.
3.
4.
5.

⏱ Important Timestamps
- Mention exact timestamp and what happens there (3–5 timestamps)

🧠 Core Takeaway
- One strong concluding insight

Transcript:
{excerpt}
"
        )
    }

    pub fn answer(&self, language: Language, transcript: &str, question: &str) -> String {
        let excerpt = truncate_chars(transcript, self.budget);
        format!(
            "Answer the question in {language}.
Use ONLY the transcript below.
Do not add outside knowledge.
If the answer is not clearly mentioned, say:
\"{NOT_COVERED}\"

Transcript:
{excerpt}

Question:
{question}
"
        )
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSCRIPT_BUDGET)
    }
}

/// First `max` characters of `text` (chars, not bytes)
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
