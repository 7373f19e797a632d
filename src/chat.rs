//! Question answering about analysis results.
//!
//! Questions go to the job-scoped endpoint when a job is known, then to the
//! general endpoint, and finally to a scripted offline reply.

use crate::api::SentimentClient;
use crate::error::{ApiError, ValidationError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Job,
    General,
    /// The service answered with an error status.
    Refused,
    Offline,
}

const APOLOGY: &str = "Sorry, I couldn't process your question. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub answer: String,
    pub source: AnswerSource,
}

pub async fn ask(
    client: &SentimentClient,
    question: &str,
    job_id: Option<&str>,
) -> Result<ChatReply, ValidationError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }

    if let Some(job_id) = job_id {
        match client.chat_about_job(job_id, question).await {
            Ok(a) => {
                return Ok(ChatReply {
                    answer: a.answer,
                    source: AnswerSource::Job,
                })
            }
            Err(e) => {
                tracing::info!(%job_id, error = %e, "job chat unavailable, using general chat");
            }
        }
    }

    match client.chat_general(question).await {
        Ok(a) => Ok(ChatReply {
            answer: a.answer,
            source: AnswerSource::General,
        }),
        Err(e @ ApiError::Status { .. }) => {
            tracing::warn!(error = %e, "general chat rejected the question");
            Ok(ChatReply {
                answer: APOLOGY.to_string(),
                source: AnswerSource::Refused,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "general chat unavailable, answering offline");
            Ok(ChatReply {
                answer: scripted_reply(question).to_string(),
                source: AnswerSource::Offline,
            })
        }
    }
}

/// Canned answer picked by keywords. Pure lookup.
pub fn scripted_reply(message: &str) -> &'static str {
    let msg = message.to_lowercase();
    let words: Vec<&str> = msg
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has_word = |w: &str| words.iter().any(|x| *x == w);

    if has_word("hello") || has_word("hi") || has_word("hey") {
        return "Hello! Run an analysis first, then I can answer detailed questions about your results. Or ask me about the platform's features.";
    }
    if msg.contains("feature") || msg.contains("what can") {
        return "The platform offers sentiment classification, review clustering, generated summaries, risk assessment, PDF reports and email delivery.";
    }
    if msg.contains("who built") || msg.contains("developer") || msg.contains("created") {
        return "The service combines a DistilBERT sentiment model with LLaMA summaries, packaged with Docker.";
    }
    if msg.contains("who are you") || msg.contains("what are you") {
        return "I'm the analysis assistant. Once a job has finished I can answer questions about its sentiment data.";
    }
    if msg.contains("how") && (msg.contains("start") || msg.contains("use")) {
        return "Submit a job with `analyze` (try `--method demo`), then follow its progress. The PDF report is emailed within a few minutes.";
    }
    "Interesting question! Run an analysis first, then I can give you detailed insights about your sentiment data."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunConfig;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(uri: String) -> SentimentClient {
        SentimentClient::new(&RunConfig {
            base_url: uri,
            request_timeout: Duration::from_millis(500),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn scripted_replies_match_keywords() {
        assert!(scripted_reply("Hi there").starts_with("Hello"));
        assert!(scripted_reply("which features exist?").contains("sentiment classification"));
        assert!(scripted_reply("How do I start?").contains("analyze"));
        assert!(scripted_reply("Who are you?").starts_with("I'm the analysis assistant"));
        assert!(scripted_reply("tell me about pricing").starts_with("Interesting question"));
    }

    #[tokio::test]
    async fn job_chat_is_preferred() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/results/j1/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"answer": "mostly positive"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"answer": "general"})))
            .expect(0)
            .mount(&server)
            .await;

        let reply = ask(&client_for(server.uri()), "how was it?", Some("j1"))
            .await
            .unwrap();
        assert_eq!(reply.source, AnswerSource::Job);
        assert_eq!(reply.answer, "mostly positive");
    }

    #[tokio::test]
    async fn job_chat_failure_falls_back_to_general() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/results/j1/chat"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"answer": "general"})))
            .expect(1)
            .mount(&server)
            .await;

        let reply = ask(&client_for(server.uri()), "anything?", Some("j1"))
            .await
            .unwrap();
        assert_eq!(reply.source, AnswerSource::General);
        assert_eq!(reply.answer, "general");
    }

    #[tokio::test]
    async fn unreachable_service_answers_offline() {
        // Nothing listens on the discard port.
        let reply = ask(&client_for("http://127.0.0.1:9".into()), "hello", None)
            .await
            .unwrap();
        assert_eq!(reply.source, AnswerSource::Offline);
        assert!(reply.answer.starts_with("Hello"));
    }

    #[tokio::test]
    async fn error_status_from_general_chat_apologizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let reply = ask(&client_for(server.uri()), "hello", None).await.unwrap();
        assert_eq!(reply.source, AnswerSource::Refused);
        assert_eq!(reply.answer, APOLOGY);
    }

    #[tokio::test]
    async fn garbled_chat_body_answers_offline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let reply = ask(&client_for(server.uri()), "what features?", None)
            .await
            .unwrap();
        assert_eq!(reply.source, AnswerSource::Offline);
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let client = client_for("http://127.0.0.1:9".into());
        assert_eq!(
            ask(&client, "   ", Some("j1")).await.unwrap_err(),
            ValidationError::EmptyQuestion
        );
    }
}
