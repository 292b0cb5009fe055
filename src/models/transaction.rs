//! Transaction request model

use serde::Deserialize;
use validator::Validate;

/// Body of `POST /predict`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Transaction {
    /// Seconds elapsed since the first transaction in the dataset
    pub time: f64,

    pub amount: f64,

    /// PCA components V1..V28
    #[serde(rename = "V_features")]
    #[validate(length(equal = 28, message = "V_features must contain exactly 28 values"))]
    pub v_features: Vec<f64>,
}

impl Transaction {
    pub fn new(time: f64, amount: f64, v_features: Vec<f64>) -> Self {
        Self {
            time,
            amount,
            v_features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::V_FEATURE_COUNT;

    fn zeroed(time: f64, amount: f64) -> Transaction {
        Transaction::new(time, amount, vec![0.0; V_FEATURE_COUNT])
    }

    #[test]
    fn test_wire_field_names() {
        let tx: Transaction = serde_json::from_str(
            r#"{"time": 406.0, "amount": 0.0, "V_features": [1.5, -2.0]}"#,
        )
        .unwrap();
        assert_eq!(tx.time, 406.0);
        assert_eq!(tx.v_features, vec![1.5, -2.0]);
    }

    #[test]
    fn test_length_validation() {
        assert!(zeroed(0.0, 100.0).validate().is_ok());

        let short = Transaction::new(0.0, 100.0, vec![0.0; 27]);
        let errors = short.validate().unwrap_err();
        let message = errors.to_string();
        assert!(message.contains("28 values"), "{message}");

        let long = Transaction::new(0.0, 100.0, vec![0.0; 29]);
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let result = serde_json::from_str::<Transaction>(r#"{"time": 1.0, "V_features": []}"#);
        assert!(result.is_err());
    }
}
