//! Reshaping raw question/answer records into thread documents.

use serde::{Deserialize, Serialize};

use super::Record;
use crate::utils::{compact_date, normalize_date};

/// Answer state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    /// The seller has not answered.
    Unanswered,
    /// The seller answered.
    Answered,
    /// The status text was missing or unrecognised.
    Pending,
}

impl ThreadStatus {
    /// Classifies the site's answer-status text.
    #[must_use]
    pub fn from_status_text(text: &str) -> Self {
        let lowered = text.to_lowercase();
        // "미답변" contains "답변", so the negative forms are checked first.
        if text.contains("미답변") || lowered.contains("unanswered") {
            Self::Unanswered
        } else if text.contains("답변완료") || lowered.contains("answered") {
            Self::Answered
        } else {
            Self::Pending
        }
    }
}

/// One message in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// `question` or `answer`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Display name of the author.
    pub author: String,
    /// `customer` or `seller`.
    pub role: String,
    /// `YYYY-MM-DD`, or empty.
    pub date: String,
    /// Message body.
    pub content: String,
}

/// A thread as written to the structured record file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDocument {
    /// `QNA-<yyyymmdd>-<NNNN>`.
    pub thread_id: String,
    /// Answer state.
    pub status: ThreadStatus,
    /// Question first, then the answer when present.
    pub messages: Vec<ThreadMessage>,
}

fn normalized_or_empty(raw: &str) -> String {
    if raw.trim().is_empty() {
        String::new()
    } else {
        normalize_date(raw)
    }
}

/// Converts raw thread records into [`ThreadDocument`]s.
///
/// Thread numbers are assigned in input order starting at 1.
#[must_use]
pub fn format_threads(records: &[Record]) -> Vec<ThreadDocument> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let question_date = normalized_or_empty(&record.text("date"));
            let answer_date = normalized_or_empty(&record.text("answerDate"));

            let id_date = [&question_date, &answer_date]
                .into_iter()
                .find(|d| !d.is_empty())
                .map(String::as_str);
            let thread_id = format!("QNA-{}-{:04}", compact_date(id_date), index + 1);

            let mut messages = Vec::with_capacity(2);

            let question = record.text("question");
            let title = record.text("title");
            let content = if question.is_empty() { title } else { question };
            if !content.is_empty() {
                messages.push(ThreadMessage {
                    kind: "question".to_string(),
                    author: record.text("author"),
                    role: "customer".to_string(),
                    date: question_date,
                    content,
                });
            }

            let answer = record.text("answer");
            let answer_author = record.text("answerAuthor");
            if !answer.is_empty() && !answer_author.is_empty() {
                messages.push(ThreadMessage {
                    kind: "answer".to_string(),
                    author: answer_author,
                    role: "seller".to_string(),
                    date: answer_date,
                    content: answer,
                });
            }

            ThreadDocument {
                thread_id,
                status: ThreadStatus::from_status_text(&record.text("answerStatus")),
                messages,
            }
        })
        .collect()
}
