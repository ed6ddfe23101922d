use atithi_shared::{Masked, RecordId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Accepted identity document categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    Aadhar,
    Driving,
    Voter,
    Passport,
}

impl IdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Aadhar => "aadhar",
            IdType::Driving => "driving",
            IdType::Voter => "voter",
            IdType::Passport => "passport",
        }
    }

    /// Human-readable label used by the moderation surface and exports
    pub fn label(&self) -> &'static str {
        match self {
            IdType::Aadhar => "Aadhar Card",
            IdType::Driving => "Driving License",
            IdType::Voter => "Voter ID",
            IdType::Passport => "Passport",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "aadhar" => Some(IdType::Aadhar),
            "driving" => Some(IdType::Driving),
            "voter" => Some(IdType::Voter),
            "passport" => Some(IdType::Passport),
            _ => None,
        }
    }
}

/// Moderation status of a persisted registration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RegistrationStatus::Pending),
            "approved" => Some(RegistrationStatus::Approved),
            "rejected" => Some(RegistrationStatus::Rejected),
            _ => None,
        }
    }
}

/// A guest beyond the first, embedded in the parent registration. Shares the
/// parent's check-in/out dates and is not independently addressable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalGuest {
    pub name: String,
    pub nationality: String,
    pub id_type: IdType,
    pub id_number: Masked<String>,
    /// Parallel to `identity_document_name`; the Nth URL is the Nth name.
    pub identity_document_url: Vec<String>,
    pub identity_document_name: Vec<String>,
}

/// The composite record persisted per registration submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestRecord {
    pub id: RecordId,
    pub name: String,
    pub number_of_guests: u32,
    pub contact_number: Masked<String>,
    pub nationality: String,
    pub id_type: IdType,
    pub id_number: Masked<String>,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub identity_document_url: Vec<String>,
    pub identity_document_name: Vec<String>,
    /// Assigned by the record store at write time, immutable thereafter
    pub registration_date: DateTime<Utc>,
    pub status: RegistrationStatus,
    pub additional_guests: Vec<AdditionalGuest>,
}

impl GuestRecord {
    /// Head count including the primary guest
    pub fn total_guests(&self) -> usize {
        1 + self.additional_guests.len()
    }
}

/// A registration as assembled by the submission protocol, before the record
/// store has assigned an identifier and timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct NewGuestRecord {
    pub name: String,
    pub number_of_guests: u32,
    pub contact_number: Masked<String>,
    pub nationality: String,
    pub id_type: IdType,
    pub id_number: Masked<String>,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub identity_document_url: Vec<String>,
    pub identity_document_name: Vec<String>,
    pub status: RegistrationStatus,
    pub additional_guests: Vec<AdditionalGuest>,
}

/// What the record store hands back for a successful create
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRecord {
    pub id: RecordId,
    pub registration_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_type_round_trip() {
        for t in [IdType::Aadhar, IdType::Driving, IdType::Voter, IdType::Passport] {
            assert_eq!(IdType::parse(t.as_str()), Some(t));
        }
        assert_eq!(IdType::parse("pan"), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&RegistrationStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
