//! Verifiable credential payloads.
//!
//! Issuer and subject are carried as JSON text because their shape is open
//! ended; the boundary only moves them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use web5_wire::wire_record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableCredentialData {
    pub context: Vec<String>,
    pub r#type: Vec<String>,
    pub id: String,
    pub json_serialized_issuer: String,
    pub json_serialized_credential_subject: String,
    pub issuance_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
}

wire_record!(VerifiableCredentialData {
    context,
    r#type,
    id,
    json_serialized_issuer,
    json_serialized_credential_subject,
    issuance_date,
    expiration_date,
});

impl VerifiableCredentialData {
    /// Returns true if the credential has an expiration date at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date.is_some_and(|exp| exp <= now)
    }
}

/// Optional overrides used when creating a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiableCredentialCreateOptionsData {
    pub id: Option<String>,
    pub context: Option<Vec<String>>,
    pub r#type: Option<Vec<String>>,
    pub issuance_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
}

wire_record!(VerifiableCredentialCreateOptionsData {
    id,
    context,
    r#type,
    issuance_date,
    expiration_date,
});

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use web5_wire::{lift, lower};

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(seconds, 0).unwrap()
    }

    fn credential() -> VerifiableCredentialData {
        VerifiableCredentialData {
            context: vec!["https://www.w3.org/2018/credentials/v1".to_string()],
            r#type: vec!["VerifiableCredential".to_string()],
            id: "urn:uuid:6c8bbcf4-87af-449a-9bfb-30bf29976227".to_string(),
            json_serialized_issuer: "\"did:jwk:issuer\"".to_string(),
            json_serialized_credential_subject: "{\"id\":\"did:jwk:subject\"}".to_string(),
            issuance_date: at(1_700_000_000),
            expiration_date: Some(at(1_800_000_000)),
        }
    }

    #[test]
    fn test_credential_round_trip() {
        let vc = credential();
        assert_eq!(lift::<VerifiableCredentialData>(&lower(&vc)).unwrap(), vc);
    }

    #[test]
    fn test_credential_pre_epoch_issuance() {
        let mut vc = credential();
        vc.issuance_date = DateTime::<Utc>::from_timestamp(-31_536_000, 250_000_000).unwrap();
        vc.expiration_date = None;
        assert_eq!(lift::<VerifiableCredentialData>(&lower(&vc)).unwrap(), vc);
    }

    #[test]
    fn test_expiry() {
        let vc = credential();
        assert!(!vc.is_expired_at(at(1_750_000_000)));
        assert!(vc.is_expired_at(at(1_800_000_000)));
    }

    #[test]
    fn test_create_options_default_is_all_absent() {
        let bytes = lower(&VerifiableCredentialCreateOptionsData::default());
        assert_eq!(bytes, vec![0, 0, 0, 0, 0]);
    }
}
