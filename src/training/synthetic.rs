//! Synthetic labeled transactions used when no trained artifact exists.

use crate::feature_encoder::{amount_features, temporal_flags};
use crate::feature_vector::FeatureVector;
use crate::training::dataset::LabeledRecord;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Bernoulli rates of the categorical risk flags
const P_MCC_HIGH_RISK: f64 = 0.10;
const P_MCC_MEDIUM_RISK: f64 = 0.20;
const P_COUNTRY_HIGH_RISK: f64 = 0.05;
const P_COUNTRY_MEDIUM_RISK: f64 = 0.15;
const P_COUNTRY_DOMESTIC: f64 = 0.70;
const P_BIN_HIGH_RISK: f64 = 0.02;

/// Risk rule weights
const WEIGHT_COUNTRY_HIGH_RISK: f64 = 30.0;
const WEIGHT_MCC_HIGH_RISK: f64 = 25.0;
const WEIGHT_NIGHT: f64 = 15.0;
const WEIGHT_HIGH_AMOUNT: f64 = 20.0;
const WEIGHT_BIN_HIGH_RISK: f64 = 35.0;
const NOISE_STD: f64 = 10.0;
/// ln(amount) ~ N(10, 2)
const AMOUNT_LOG_MEAN: f64 = 10.0;
const AMOUNT_LOG_STD: f64 = 2.0;
const LOGISTIC_SCALE: f64 = 20.0;

/// Deterministic generator of labeled training records.
///
/// Every call to [`SyntheticDataGenerator::generate`] restarts from the seed,
/// so the same `(seed, n)` always yields the same records.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticDataGenerator {
    seed: u64,
}

impl SyntheticDataGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generate(&self, n: usize) -> Vec<LabeledRecord> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (0..n)
            .map(|_| {
                let z: f64 = rng.sample(StandardNormal);
                let amount = (AMOUNT_LOG_MEAN + AMOUNT_LOG_STD * z).exp();
                let hour: u8 = rng.gen_range(0..24);
                let day_of_week: u8 = rng.gen_range(0..7);
                let mcc_high_risk = rng.gen_bool(P_MCC_HIGH_RISK);
                let mcc_medium_risk = rng.gen_bool(P_MCC_MEDIUM_RISK);
                let mcc_numeric: u32 = rng.gen_range(1000..9999);
                let country_high_risk = rng.gen_bool(P_COUNTRY_HIGH_RISK);
                let country_medium_risk = rng.gen_bool(P_COUNTRY_MEDIUM_RISK);
                let country_domestic = rng.gen_bool(P_COUNTRY_DOMESTIC);
                let bin_high_risk = rng.gen_bool(P_BIN_HIGH_RISK);
                let bin_numeric: u32 = rng.gen_range(100_000..999_999);

                let temporal = temporal_flags(hour, day_of_week);
                let amount_derived = amount_features(amount);

                let mut features = FeatureVector::with_capacity(18);
                features.insert("amount", amount);
                features.insert("hour", f64::from(hour));
                features.insert("day_of_week", f64::from(day_of_week));
                features.insert("mcc_high_risk", indicator(mcc_high_risk));
                features.insert("mcc_medium_risk", indicator(mcc_medium_risk));
                features.insert("mcc_numeric", f64::from(mcc_numeric));
                features.insert("country_high_risk", indicator(country_high_risk));
                features.insert("country_medium_risk", indicator(country_medium_risk));
                features.insert("country_domestic", indicator(country_domestic));
                features.insert("bin_high_risk", indicator(bin_high_risk));
                features.insert("bin_numeric", f64::from(bin_numeric));
                features.insert("is_night", temporal.is_night);
                features.insert("is_business_hours", temporal.is_business_hours);
                features.insert("is_weekend", temporal.is_weekend);
                features.insert("is_friday", temporal.is_friday);
                features.insert("amount_log", amount_derived.amount_log);
                features.insert("is_high_amount", amount_derived.is_high_amount);
                features.insert("is_round_amount", amount_derived.is_round_amount);

                let fraud_score = WEIGHT_COUNTRY_HIGH_RISK * indicator(country_high_risk)
                    + WEIGHT_MCC_HIGH_RISK * indicator(mcc_high_risk)
                    + WEIGHT_NIGHT * temporal.is_night
                    + WEIGHT_HIGH_AMOUNT * amount_derived.is_high_amount
                    + WEIGHT_BIN_HIGH_RISK * indicator(bin_high_risk)
                    + NOISE_STD * rng.sample::<f64, _>(StandardNormal);

                LabeledRecord {
                    features,
                    is_fraud: fraud_probability(fraud_score) > 0.5,
                }
            })
            .collect()
    }
}

/// Logistic mapping of the weighted rule score
pub fn fraud_probability(fraud_score: f64) -> f64 {
    1.0 / (1.0 + (-fraud_score / LOGISTIC_SCALE).exp())
}

fn indicator(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_encoder::FEATURE_NAMES;

    #[test]
    fn test_generation_is_deterministic() {
        let generator = SyntheticDataGenerator::new(42);
        let a = generator.generate(200);
        let b = generator.generate(200);
        assert_eq!(a, b);

        let other = SyntheticDataGenerator::new(43).generate(200);
        assert_ne!(a, other);
    }

    #[test]
    fn test_records_follow_schema() {
        let records = SyntheticDataGenerator::new(7).generate(50);
        assert_eq!(records.len(), 50);
        for record in &records {
            let names: Vec<&str> = record.features.names().collect();
            assert_eq!(names, FEATURE_NAMES.to_vec());

            let hour = record.features.get("hour").unwrap();
            assert!((0.0..=23.0).contains(&hour));
            let day = record.features.get("day_of_week").unwrap();
            assert!((0.0..=6.0).contains(&day));
            assert!(record.features.get("amount").unwrap() > 0.0);
        }
    }

    #[test]
    fn test_derived_flags_match_encoder_rules() {
        for record in SyntheticDataGenerator::new(3).generate(300) {
            let f = &record.features;
            let hour = f.get("hour").unwrap() as u8;
            let day = f.get("day_of_week").unwrap() as u8;
            let expected = temporal_flags(hour, day);
            assert_eq!(f.get("is_night"), Some(expected.is_night));
            assert_eq!(f.get("is_weekend"), Some(expected.is_weekend));

            let amount = f.get("amount").unwrap();
            assert!((f.get("amount_log").unwrap() - amount.ln_1p()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_both_classes_present_and_risk_rules_bite() {
        let records = SyntheticDataGenerator::new(42).generate(5000);
        let fraud = records.iter().filter(|r| r.is_fraud).count();
        assert!(fraud > 0 && fraud < records.len());

        // a high-risk country adds 30 points, so those rows are almost always fraud
        let (risky, risky_fraud) = records
            .iter()
            .filter(|r| r.features.flag("country_high_risk"))
            .fold((0, 0), |(n, f), r| (n + 1, f + usize::from(r.is_fraud)));
        assert!(risky > 0);
        assert!(risky_fraud as f64 / risky as f64 > 0.9);
    }

    #[test]
    fn test_logistic_mapping() {
        assert!((fraud_probability(0.0) - 0.5).abs() < 1e-12);
        assert!(fraud_probability(40.0) > 0.85);
        assert!(fraud_probability(-40.0) < 0.15);
    }
}
