use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Listing lifecycle state.
///
/// Transitions form a strict linear chain: `active → expired`, then
/// physical deletion once the retention window has passed. There is no
/// path back from deletion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Expired,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "expired" => Ok(ListingStatus::Expired),
            _ => Err(anyhow::anyhow!("Invalid listing status: {}", s)),
        }
    }
}

/// A listing document as read from the store: the opaque document id plus
/// its decoded fields. Everything except `expiryDate` is opaque to the
/// sweeper.
#[derive(Debug, Clone)]
pub struct ListingDoc {
    pub id: String,
    pub fields: Value,
}

impl ListingDoc {
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

#[derive(Debug, Error)]
pub enum ListingFieldError {
    #[error("expiryDate missing or without a seconds component: {0}")]
    MalformedTimestamp(String),
}

/// Extract the expiry time in epoch seconds from a listing's fields.
///
/// The collection holds two timestamp shapes: `{seconds: N, ...}` on
/// server-written documents and `{_seconds: N, ...}` on documents written
/// through the mobile client. `_seconds` wins when both are present.
pub fn expiry_seconds(fields: &Value) -> Result<i64, ListingFieldError> {
    let expiry = &fields["expiryDate"];
    expiry
        .get("_seconds")
        .or_else(|| expiry.get("seconds"))
        .and_then(Value::as_i64)
        .ok_or_else(|| ListingFieldError::MalformedTimestamp(expiry.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_server_written_timestamp_shape() {
        let fields = json!({"expiryDate": {"seconds": 1000, "nanos": 0}});
        assert_eq!(expiry_seconds(&fields).unwrap(), 1000);
    }

    #[test]
    fn reads_client_written_timestamp_shape() {
        let fields = json!({"expiryDate": {"_seconds": 1000, "_nanoseconds": 0}});
        assert_eq!(expiry_seconds(&fields).unwrap(), 1000);
    }

    #[test]
    fn prefers_client_shape_when_both_present() {
        let fields = json!({"expiryDate": {"_seconds": 7, "seconds": 9}});
        assert_eq!(expiry_seconds(&fields).unwrap(), 7);
    }

    #[test]
    fn missing_expiry_is_malformed() {
        assert!(expiry_seconds(&json!({"title": "Villa"})).is_err());
        assert!(expiry_seconds(&json!({"expiryDate": null})).is_err());
        assert!(expiry_seconds(&json!({"expiryDate": {"foo": 1}})).is_err());
    }

    #[test]
    fn non_numeric_seconds_is_malformed() {
        let fields = json!({"expiryDate": {"seconds": "soon"}});
        assert!(matches!(
            expiry_seconds(&fields),
            Err(ListingFieldError::MalformedTimestamp(_))
        ));
    }

    #[test]
    fn status_round_trips_through_strings() {
        use std::str::FromStr;
        assert_eq!(ListingStatus::Active.as_str(), "active");
        assert_eq!(
            ListingStatus::from_str("expired").unwrap(),
            ListingStatus::Expired
        );
        assert!(ListingStatus::from_str("deleted").is_err());
    }
}
