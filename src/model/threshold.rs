//! Decision threshold
//!
//! Operating point chosen for recall over precision.

/// Probability at or above which a transaction is labelled fraud
pub const FRAUD_THRESHOLD: f64 = 0.3;

/// Final label for one scored transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fraud,
    Safe,
}

impl Decision {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= FRAUD_THRESHOLD {
            Decision::Fraud
        } else {
            Decision::Safe
        }
    }

    /// Binary label (1 = fraud)
    pub fn label(self) -> u8 {
        match self {
            Decision::Fraud => 1,
            Decision::Safe => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Fraud => "FRAUD",
            Decision::Safe => "SAFE",
        }
    }
}
