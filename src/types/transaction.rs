//! Payment transaction as received from the request layer

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment transaction to be scored for fraud risk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Caller-assigned identifier, only used for logging
    #[serde(default, alias = "transactionId")]
    pub transaction_id: Option<String>,

    /// Amount in currency minor units
    pub amount: f64,

    /// Merchant category code (4 digits)
    #[serde(alias = "merchantCategoryCode", alias = "mcc")]
    pub merchant_category_code: String,

    /// ISO country code (2-3 letters)
    #[serde(alias = "countryCode")]
    pub country_code: String,

    /// Hour of day (0-23)
    pub hour: u8,

    /// Day of week (0 = Sunday, 6 = Saturday)
    #[serde(alias = "dayOfWeek")]
    pub day_of_week: u8,

    /// Bank identification number (6 digits)
    pub bin: String,

    #[serde(default, alias = "ipAddress")]
    pub ip_address: Option<String>,

    #[serde(default, alias = "userAgent")]
    pub user_agent: Option<String>,

    #[serde(default, alias = "deviceFingerprint")]
    pub device_fingerprint: Option<String>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a transaction with the fields the scorer uses
    pub fn new(
        amount: f64,
        merchant_category_code: &str,
        country_code: &str,
        hour: u8,
        day_of_week: u8,
        bin: &str,
    ) -> Self {
        Self {
            transaction_id: None,
            amount,
            merchant_category_code: merchant_category_code.to_string(),
            country_code: country_code.to_string(),
            hour,
            day_of_week,
            bin: bin.to_string(),
            ip_address: None,
            user_agent: None,
            device_fingerprint: None,
            timestamp: Utc::now(),
        }
    }

    /// Check field formats and normalize the country code to upper case.
    ///
    /// The engine assumes its input already passed through here.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ValidationError::Amount(self.amount));
        }
        if !is_digits(&self.merchant_category_code, 4) {
            return Err(ValidationError::MerchantCategoryCode(
                self.merchant_category_code,
            ));
        }

        let country = self.country_code.trim().to_ascii_uppercase();
        if !(2..=3).contains(&country.len()) || !country.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ValidationError::CountryCode(self.country_code));
        }
        self.country_code = country;

        if self.hour > 23 {
            return Err(ValidationError::Hour(self.hour));
        }
        if self.day_of_week > 6 {
            return Err(ValidationError::DayOfWeek(self.day_of_week));
        }
        if !is_digits(&self.bin, 6) {
            return Err(ValidationError::Bin(self.bin));
        }
        Ok(self)
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_deserializes_wire_names() {
        let json = r#"{
            "amount": 150000.0,
            "merchantCategoryCode": "5411",
            "countryCode": "co",
            "hour": 14,
            "dayOfWeek": 3,
            "bin": "411111",
            "ipAddress": "10.0.0.1"
        }"#;

        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.merchant_category_code, "5411");
        assert_eq!(tx.day_of_week, 3);
        assert_eq!(tx.ip_address.as_deref(), Some("10.0.0.1"));
        assert!(tx.transaction_id.is_none());
    }

    #[test]
    fn test_validate_normalizes_country() {
        let tx = Transaction::new(100.0, "5411", "co", 10, 2, "411111")
            .validate()
            .unwrap();
        assert_eq!(tx.country_code, "CO");
    }

    #[test]
    fn test_validate_rejects_malformed_fields() {
        let base = Transaction::new(100.0, "5411", "US", 10, 2, "411111");

        let mut tx = base.clone();
        tx.amount = 0.0;
        assert_eq!(tx.validate().unwrap_err(), ValidationError::Amount(0.0));

        let mut tx = base.clone();
        tx.merchant_category_code = "54a1".to_string();
        assert!(matches!(
            tx.validate(),
            Err(ValidationError::MerchantCategoryCode(_))
        ));

        let mut tx = base.clone();
        tx.country_code = "U".to_string();
        assert!(matches!(tx.validate(), Err(ValidationError::CountryCode(_))));

        let mut tx = base.clone();
        tx.country_code = "U5".to_string();
        assert!(matches!(tx.validate(), Err(ValidationError::CountryCode(_))));

        let mut tx = base.clone();
        tx.hour = 24;
        assert_eq!(tx.validate().unwrap_err(), ValidationError::Hour(24));

        let mut tx = base.clone();
        tx.day_of_week = 7;
        assert_eq!(tx.validate().unwrap_err(), ValidationError::DayOfWeek(7));

        let mut tx = base;
        tx.bin = "12345".to_string();
        assert!(matches!(tx.validate(), Err(ValidationError::Bin(_))));
    }
}
