use super::JobApi;
use crate::error::ApiError;
use crate::model::{
    AnalysisRequest, CampaignRequest, CampaignResponse, ChatAnswer, ChatRequest, DashboardData,
    ResultsPayload, RunConfig, StatusResponse, SubmitResponse, VideoScript, VideoScriptRequest,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// reqwest-backed client for every endpoint of the service.
#[derive(Debug, Clone)]
pub struct SentimentClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl SentimentClient {
    pub fn new(cfg: &RunConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&cfg.base_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| ApiError::BaseUrl(cfg.base_url.clone()))?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            timeout: cfg.request_timeout,
        })
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn classify(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if e.is_decode() {
            ApiError::Decode(e)
        } else {
            ApiError::Transport(e)
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let resp = req.send().await.map_err(|e| self.classify(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments);
        tracing::debug!(%url, "GET");
        let resp = self.send(self.http.get(url)).await?;
        resp.json::<T>().await.map_err(|e| self.classify(e))
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments);
        tracing::debug!(%url, "POST");
        let resp = self.send(self.http.post(url).json(body)).await?;
        resp.json::<T>().await.map_err(|e| self.classify(e))
    }

    async fn get_bytes(&self, segments: &[&str]) -> Result<Bytes, ApiError> {
        let url = self.endpoint(segments);
        tracing::debug!(%url, "GET (binary)");
        let resp = self.send(self.http.get(url)).await?;
        resp.bytes().await.map_err(|e| self.classify(e))
    }

    /// Ask a question about one job's results.
    pub async fn chat_about_job(&self, job_id: &str, question: &str) -> Result<ChatAnswer, ApiError> {
        let body = ChatRequest {
            question: question.to_string(),
        };
        self.post_json(&["api", "results", job_id, "chat"], &body)
            .await
    }

    /// Ask a general question, not tied to any job.
    pub async fn chat_general(&self, question: &str) -> Result<ChatAnswer, ApiError> {
        let body = ChatRequest {
            question: question.to_string(),
        };
        self.post_json(&["api", "chat"], &body).await
    }

    pub async fn generate_video_script(
        &self,
        request: &VideoScriptRequest,
    ) -> Result<VideoScript, ApiError> {
        self.post_json(&["api", "generate-video-script"], request)
            .await
    }

    pub async fn predict_campaign(
        &self,
        request: &CampaignRequest,
    ) -> Result<CampaignResponse, ApiError> {
        self.post_json(&["api", "predict-campaign"], request).await
    }

    pub async fn dashboard(&self, job_id: &str) -> Result<DashboardData, ApiError> {
        self.get_json(&["api", "dashboard", job_id]).await
    }

    /// CSV export of the dashboard metrics.
    pub async fn dashboard_export(&self, job_id: &str) -> Result<Bytes, ApiError> {
        self.get_bytes(&["api", "dashboard", job_id, "export"])
            .await
    }

    /// PDF report for a finished job.
    pub async fn report_pdf(&self, job_id: &str) -> Result<Bytes, ApiError> {
        self.get_bytes(&["api", "results", job_id, "pdf"]).await
    }
}

#[async_trait]
impl JobApi for SentimentClient {
    async fn submit_job(&self, request: &AnalysisRequest) -> Result<SubmitResponse, ApiError> {
        self.post_json(&["api", "analyze"], request).await
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        self.get_json(&["api", "status", job_id]).await
    }

    async fn job_results(&self, job_id: &str) -> Result<ResultsPayload, ApiError> {
        self.get_json(&["api", "results", job_id, "data"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobStatus, Language, SearchMethod, SentimentCounts};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SentimentClient {
        let cfg = RunConfig {
            base_url: server.uri(),
            request_timeout: Duration::from_millis(300),
            ..Default::default()
        };
        SentimentClient::new(&cfg).unwrap()
    }

    fn demo_request() -> AnalysisRequest {
        AnalysisRequest {
            email: "team@example.com".into(),
            custom_prompt: Some("focus on service".into()),
            search_method: SearchMethod::Demo,
            language: Language::En,
            previous_job_id: None,
            url: "demo".into(),
        }
    }

    #[tokio::test]
    async fn submit_posts_wire_payload_and_reads_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/analyze"))
            .and(body_json(serde_json::json!({
                "email": "team@example.com",
                "customPrompt": "focus on service",
                "searchMethod": "demo",
                "language": "en",
                "job_id": null,
                "url": "demo"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "job_id": "abc-123",
                "status": "pending"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client_for(&server).submit_job(&demo_request()).await.unwrap();
        assert_eq!(resp.job_id.as_deref(), Some("abc-123"));
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/analyze"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad email"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .submit_job(&demo_request())
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad email");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn status_and_results_use_job_scoped_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/job-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "running", "progress": 42.4, "message": "Scoring reviews"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/results/job-9/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "trends": {"summary": {"total_positive": 3, "total_negative": 1, "total_neutral": 6, "total_reviews": 10}}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let status = client.job_status("job-9").await.unwrap();
        assert_eq!(status.status, JobStatus::Running);
        assert_eq!(status.progress_percent(), 42);
        assert_eq!(status.message_text(), "Scoring reviews");

        let results = client.job_results("job-9").await.unwrap();
        assert_eq!(
            results.counts(),
            SentimentCounts {
                positive: 3,
                negative: 1,
                neutral: 6,
                total: 10
            }
        );
    }

    #[tokio::test]
    async fn slow_response_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(serde_json::json!({"status": "running"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).job_status("slow").await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)), "got {err}");
    }

    #[tokio::test]
    async fn base_url_path_prefix_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sentiment/api/chat"))
            .and(body_json(serde_json::json!({"question": "hi"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"answer": "hello"})),
            )
            .mount(&server)
            .await;

        let cfg = RunConfig {
            base_url: format!("{}/sentiment/", server.uri()),
            ..Default::default()
        };
        let client = SentimentClient::new(&cfg).unwrap();
        assert_eq!(client.chat_general("hi").await.unwrap().answer, "hello");
    }

    #[tokio::test]
    async fn binary_endpoints_return_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/results/j1/pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 ...".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard/j1/export"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Metric,Value\nJob ID,j1"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(&client.report_pdf("j1").await.unwrap()[..], b"%PDF-1.4 ...");
        assert_eq!(
            &client.dashboard_export("j1").await.unwrap()[..],
            b"Metric,Value\nJob ID,j1"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        let cfg = RunConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(
            SentimentClient::new(&cfg),
            Err(ApiError::BaseUrl(_))
        ));
    }
}
