//! Campaign variant scoring.

use crate::api::SentimentClient;
use crate::model::{CampaignPrediction, CampaignRequest, CampaignResponse, Language};
use crate::validate::split_variants;
use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Strong,
    Moderate,
    Weak,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            ScoreBand::Strong
        } else if score >= 5.0 {
            ScoreBand::Moderate
        } else {
            ScoreBand::Weak
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Strong => "strong",
            ScoreBand::Moderate => "moderate",
            ScoreBand::Weak => "weak",
        }
    }
}

/// Index of the server's `best_variant` within the returned list, matched by text.
///
/// The server's pick is used as-is; list order is never assumed to be score order.
pub fn best_index(response: &CampaignResponse) -> Option<usize> {
    response
        .predictions
        .iter()
        .position(|p| p.text == response.best_variant.text)
}

/// Scores of every prediction, in the order returned.
pub fn scores(predictions: &[CampaignPrediction]) -> Vec<f64> {
    predictions.iter().map(|p| p.score).collect()
}

/// Split raw variant input and send it for scoring, attaching the job for context.
pub async fn predict<'a, I>(
    client: &SentimentClient,
    inputs: I,
    language: Language,
    job_id: Option<String>,
) -> Result<CampaignResponse>
where
    I: IntoIterator<Item = &'a str>,
{
    let variants = split_variants(inputs)?;
    tracing::info!(count = variants.len(), job_id = ?job_id, "scoring campaign variants");
    let request = CampaignRequest {
        variants,
        language,
        job_id,
    };
    client
        .predict_campaign(&request)
        .await
        .context("campaign prediction failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::model::RunConfig;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prediction(text: &str, score: f64) -> serde_json::Value {
        serde_json::json!({
            "text": text,
            "score": score,
            "roi_projection": "2x over 6 months",
            "risks": ["margin"],
        })
    }

    #[test]
    fn bands_follow_score_thresholds() {
        assert_eq!(ScoreBand::from_score(7.0), ScoreBand::Strong);
        assert_eq!(ScoreBand::from_score(6.9), ScoreBand::Moderate);
        assert_eq!(ScoreBand::from_score(5.0), ScoreBand::Moderate);
        assert_eq!(ScoreBand::from_score(4.99), ScoreBand::Weak);
    }

    #[tokio::test]
    async fn best_variant_comes_from_server_not_list_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/predict-campaign"))
            .and(body_json(serde_json::json!({
                "variants": ["free coffee", "20% off"],
                "language": "de",
                "job_id": "job-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [prediction("free coffee", 6.0), prediction("20% off", 8.5)],
                "best_variant": prediction("20% off", 8.5),
                "total_analyzed": 2
            })))
            .expect(1)
            .mount(&server)
            .await;
        let client = SentimentClient::new(&RunConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap();

        let resp = predict(
            &client,
            ["free coffee\n\n", "  20% off "],
            Language::De,
            Some("job-1".into()),
        )
        .await
        .unwrap();
        assert_eq!(resp.predictions[0].text, "free coffee");
        assert_eq!(resp.best_variant.text, "20% off");
        assert_eq!(best_index(&resp), Some(1));
        assert_eq!(scores(&resp.predictions), vec![6.0, 8.5]);
    }

    #[tokio::test]
    async fn empty_input_never_reaches_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        let client = SentimentClient::new(&RunConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap();

        let err = predict(&client, ["  \n"], Language::En, None)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::NoVariants)
        );
    }
}
