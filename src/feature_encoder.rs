//! Feature encoding for fraud risk scoring.
//!
//! Turns a validated [`Transaction`] into the fixed set of numeric features the
//! models are trained on. The synthetic training generator derives its temporal
//! and amount features through the same helpers, so training and inference agree.

use crate::feature_vector::FeatureVector;
use crate::types::transaction::Transaction;

/// Feature schema, in the column order used for training.
pub const FEATURE_NAMES: [&str; 18] = [
    "amount",
    "hour",
    "day_of_week",
    "mcc_high_risk",
    "mcc_medium_risk",
    "mcc_numeric",
    "country_high_risk",
    "country_medium_risk",
    "country_domestic",
    "bin_high_risk",
    "bin_numeric",
    "is_night",
    "is_business_hours",
    "is_weekend",
    "is_friday",
    "amount_log",
    "is_high_amount",
    "is_round_amount",
];

/// Casinos, ATM and quasi-cash merchants
pub const HIGH_RISK_MCCS: [&str; 4] = ["7995", "7801", "6010", "6011"];
/// Grocery and fuel merchants
pub const MEDIUM_RISK_MCCS: [&str; 3] = ["5411", "5541", "5542"];

pub const HIGH_RISK_COUNTRIES: [&str; 5] = ["VE", "CU", "IR", "KP", "SY"];
pub const MEDIUM_RISK_COUNTRIES: [&str; 4] = ["BR", "AR", "PE", "EC"];
pub const DOMESTIC_COUNTRY: &str = "CO";

pub const HIGH_RISK_BINS: [&str; 2] = ["123456", "654321"];

/// 1,000,000 minor units
pub const HIGH_AMOUNT_THRESHOLD: f64 = 1_000_000.0;
pub const ROUND_AMOUNT_UNIT: f64 = 10_000.0;

/// Stateless encoder from transactions to model features.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode a transaction into a feature vector in schema order.
    pub fn encode(&self, tx: &Transaction) -> FeatureVector {
        let mut features = FeatureVector::with_capacity(FEATURE_NAMES.len());

        features.insert("amount", tx.amount);
        features.insert("hour", f64::from(tx.hour));
        features.insert("day_of_week", f64::from(tx.day_of_week));

        let mcc = tx.merchant_category_code.as_str();
        features.insert("mcc_high_risk", flag(HIGH_RISK_MCCS.contains(&mcc)));
        features.insert("mcc_medium_risk", flag(MEDIUM_RISK_MCCS.contains(&mcc)));
        features.insert("mcc_numeric", numeric_code(mcc));

        let country = tx.country_code.trim().to_ascii_uppercase();
        let country = country.as_str();
        features.insert(
            "country_high_risk",
            flag(HIGH_RISK_COUNTRIES.contains(&country)),
        );
        features.insert(
            "country_medium_risk",
            flag(MEDIUM_RISK_COUNTRIES.contains(&country)),
        );
        features.insert("country_domestic", flag(country == DOMESTIC_COUNTRY));

        let bin = tx.bin.as_str();
        features.insert("bin_high_risk", flag(HIGH_RISK_BINS.contains(&bin)));
        features.insert("bin_numeric", numeric_code(bin));

        let temporal = temporal_flags(tx.hour, tx.day_of_week);
        features.insert("is_night", temporal.is_night);
        features.insert("is_business_hours", temporal.is_business_hours);
        features.insert("is_weekend", temporal.is_weekend);
        features.insert("is_friday", temporal.is_friday);

        let amount = amount_features(tx.amount);
        features.insert("amount_log", amount.amount_log);
        features.insert("is_high_amount", amount.is_high_amount);
        features.insert("is_round_amount", amount.is_round_amount);

        features
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    pub fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }
}

/// Time-of-day and day-of-week flags
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalFlags {
    pub is_night: f64,
    pub is_business_hours: f64,
    pub is_weekend: f64,
    pub is_friday: f64,
}

pub fn temporal_flags(hour: u8, day_of_week: u8) -> TemporalFlags {
    TemporalFlags {
        is_night: flag(hour >= 22 || hour <= 6),
        is_business_hours: flag((8..=18).contains(&hour)),
        is_weekend: flag(day_of_week == 0 || day_of_week == 6),
        is_friday: flag(day_of_week == 5),
    }
}

/// Amount-derived features
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountFeatures {
    pub amount_log: f64,
    pub is_high_amount: f64,
    pub is_round_amount: f64,
}

/// `amount_log` is `ln(amount + 1)`, the same transform the generator uses.
pub fn amount_features(amount: f64) -> AmountFeatures {
    AmountFeatures {
        amount_log: amount.max(0.0).ln_1p(),
        is_high_amount: flag(amount >= HIGH_AMOUNT_THRESHOLD),
        is_round_amount: flag(amount % ROUND_AMOUNT_UNIT == 0.0),
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Integer value of a digit code; malformed codes fall back to 0.0
fn numeric_code(code: &str) -> f64 {
    code.trim().parse::<u32>().map(f64::from).unwrap_or(0.0)
}
