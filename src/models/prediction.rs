//! Prediction response model

use serde::Serialize;

use crate::model::pipeline::Score;

/// Body returned by `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub fraud_probability: f64,
    pub prediction: u8,
    pub status: String,
}

impl From<Score> for PredictionResponse {
    fn from(score: Score) -> Self {
        Self {
            fraud_probability: score.fraud_probability,
            prediction: score.decision.label(),
            status: score.decision.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Decision;

    #[test]
    fn test_from_score() {
        let response = PredictionResponse::from(Score {
            fraud_probability: 0.82,
            decision: Decision::Fraud,
        });
        assert_eq!(response.prediction, 1);
        assert_eq!(response.status, "FRAUD");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["fraud_probability"], 0.82);
    }
}
