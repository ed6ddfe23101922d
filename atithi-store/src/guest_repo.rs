use async_trait::async_trait;
use atithi_core::model::{
    AdditionalGuest, CreatedRecord, GuestRecord, IdType, NewGuestRecord, RegistrationStatus,
};
use atithi_core::repository::{GuestStore, StoreError};
use atithi_shared::{Masked, RecordId};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::warn;

use crate::app_config::RecordStoreConfig;

/// Client for the hosted document database's REST surface. Field values
/// travel in the store's typed-value envelope ({"stringValue": ...} and
/// friends); the registration timestamp is the store's own createTime, which
/// satisfies the server-assigned, immutable requirement without a second
/// write.
pub struct FirestoreClient {
    http: reqwest::Client,
    api_base: String,
    project_id: String,
    collection: String,
}

impl FirestoreClient {
    pub fn new(config: &RecordStoreConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            project_id: config.project_id.clone(),
            collection: config.collection.clone(),
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.api_base, self.project_id, self.collection
        )
    }

    fn document_url(&self, id: &RecordId) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(status.to_string()));
        }
        if !status.is_success() {
            return Err(StoreError::Rejected(format!(
                "record store returned {}",
                status
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl GuestStore for FirestoreClient {
    async fn create(&self, record: &NewGuestRecord) -> Result<CreatedRecord, StoreError> {
        let body = json!({ "fields": encode_record(record) });
        let response = self
            .http
            .post(self.collection_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let doc: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        let id = doc["name"]
            .as_str()
            .and_then(|name| name.rsplit('/').next())
            .map(RecordId::from)
            .ok_or_else(|| StoreError::Malformed("create response without a document name".into()))?;
        let registration_date = parse_create_time(&doc)?;

        Ok(CreatedRecord {
            id,
            registration_date,
        })
    }

    async fn list(&self) -> Result<Vec<GuestRecord>, StoreError> {
        let url = format!("{}?orderBy=createTime%20desc&pageSize=300", self.collection_url());
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        let mut records = Vec::new();
        if let Some(documents) = body["documents"].as_array() {
            for doc in documents {
                match decode_document(doc) {
                    Ok(record) => records.push(record),
                    // One malformed legacy record must not blank the panel
                    Err(err) => warn!(%err, "skipping undecodable registration document"),
                }
            }
        }
        Ok(records)
    }

    async fn update_status(&self, id: &RecordId, status: RegistrationStatus) -> Result<(), StoreError> {
        let url = format!("{}?updateMask.fieldPaths=status", self.document_url(id));
        let body = json!({ "fields": { "status": string_value(status.as_str()) } });
        let response = self
            .http
            .patch(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.document_url(id))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::check_status(response).await?;
        Ok(())
    }
}

// ============================================================================
// Typed-value envelope encoding
// ============================================================================

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn integer_value(i: i64) -> Value {
    // integers travel as strings in the REST envelope
    json!({ "integerValue": i.to_string() })
}

fn string_array(items: &[String]) -> Value {
    let values: Vec<Value> = items.iter().map(|s| string_value(s)).collect();
    json!({ "arrayValue": { "values": values } })
}

fn encode_record(record: &NewGuestRecord) -> Value {
    let guests: Vec<Value> = record
        .additional_guests
        .iter()
        .map(|g| json!({ "mapValue": { "fields": encode_guest(g) } }))
        .collect();

    json!({
        "name": string_value(&record.name),
        "numberOfGuests": integer_value(record.number_of_guests as i64),
        "contactNumber": string_value(&record.contact_number.0),
        "nationality": string_value(&record.nationality),
        "idType": string_value(record.id_type.as_str()),
        "idNumber": string_value(&record.id_number.0),
        "checkinDate": string_value(&record.checkin_date.to_string()),
        "checkoutDate": string_value(&record.checkout_date.to_string()),
        "identityDocumentUrl": string_array(&record.identity_document_url),
        "identityDocumentName": string_array(&record.identity_document_name),
        "status": string_value(record.status.as_str()),
        "additionalGuests": json!({ "arrayValue": { "values": guests } }),
    })
}

fn encode_guest(guest: &AdditionalGuest) -> Value {
    json!({
        "name": string_value(&guest.name),
        "nationality": string_value(&guest.nationality),
        "idType": string_value(guest.id_type.as_str()),
        "idNumber": string_value(&guest.id_number.0),
        "identityDocumentUrl": string_array(&guest.identity_document_url),
        "identityDocumentName": string_array(&guest.identity_document_name),
    })
}

fn get_str<'a>(fields: &'a Value, name: &str) -> Result<&'a str, StoreError> {
    fields[name]["stringValue"]
        .as_str()
        .ok_or_else(|| StoreError::Malformed(format!("missing string field {name}")))
}

fn get_int(fields: &Value, name: &str) -> Result<i64, StoreError> {
    let raw = &fields[name]["integerValue"];
    raw.as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| raw.as_i64())
        .ok_or_else(|| StoreError::Malformed(format!("missing integer field {name}")))
}

fn get_date(fields: &Value, name: &str) -> Result<NaiveDate, StoreError> {
    get_str(fields, name)?
        .parse()
        .map_err(|_| StoreError::Malformed(format!("field {name} is not a date")))
}

fn get_string_array(fields: &Value, name: &str) -> Vec<String> {
    fields[name]["arrayValue"]["values"]
        .as_array()
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v["stringValue"].as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

fn decode_guest(fields: &Value) -> Result<AdditionalGuest, StoreError> {
    let id_type = IdType::parse(get_str(fields, "idType")?)
        .ok_or_else(|| StoreError::Malformed("unknown idType".into()))?;
    Ok(AdditionalGuest {
        name: get_str(fields, "name")?.to_owned(),
        nationality: get_str(fields, "nationality")?.to_owned(),
        id_type,
        id_number: Masked(get_str(fields, "idNumber")?.to_owned()),
        identity_document_url: get_string_array(fields, "identityDocumentUrl"),
        identity_document_name: get_string_array(fields, "identityDocumentName"),
    })
}

fn parse_create_time(doc: &Value) -> Result<DateTime<Utc>, StoreError> {
    doc["createTime"]
        .as_str()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| StoreError::Malformed("document without a createTime".into()))
}

fn decode_document(doc: &Value) -> Result<GuestRecord, StoreError> {
    let id = doc["name"]
        .as_str()
        .and_then(|name| name.rsplit('/').next())
        .map(RecordId::from)
        .ok_or_else(|| StoreError::Malformed("document without a name".into()))?;
    let registration_date = parse_create_time(doc)?;
    let fields = &doc["fields"];

    let id_type = IdType::parse(get_str(fields, "idType")?)
        .ok_or_else(|| StoreError::Malformed("unknown idType".into()))?;
    let status = RegistrationStatus::parse(get_str(fields, "status")?)
        .ok_or_else(|| StoreError::Malformed("unknown status".into()))?;

    let mut additional_guests = Vec::new();
    if let Some(values) = fields["additionalGuests"]["arrayValue"]["values"].as_array() {
        for value in values {
            additional_guests.push(decode_guest(&value["mapValue"]["fields"])?);
        }
    }

    Ok(GuestRecord {
        id,
        name: get_str(fields, "name")?.to_owned(),
        number_of_guests: get_int(fields, "numberOfGuests")? as u32,
        contact_number: Masked(get_str(fields, "contactNumber")?.to_owned()),
        nationality: get_str(fields, "nationality")?.to_owned(),
        id_type,
        id_number: Masked(get_str(fields, "idNumber")?.to_owned()),
        checkin_date: get_date(fields, "checkinDate")?,
        checkout_date: get_date(fields, "checkoutDate")?,
        identity_document_url: get_string_array(fields, "identityDocumentUrl"),
        identity_document_name: get_string_array(fields, "identityDocumentName"),
        registration_date,
        status,
        additional_guests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> NewGuestRecord {
        NewGuestRecord {
            name: "A. Sharma".into(),
            number_of_guests: 2,
            contact_number: Masked("9876543210".into()),
            nationality: "Indian".into(),
            id_type: IdType::Aadhar,
            id_number: Masked("ABCD1234".into()),
            checkin_date: "2025-06-02".parse().unwrap(),
            checkout_date: "2025-06-03".parse().unwrap(),
            identity_document_url: vec!["https://media.example/a.jpg".into()],
            identity_document_name: vec!["a.jpg".into()],
            status: RegistrationStatus::Pending,
            additional_guests: vec![AdditionalGuest {
                name: "B. Sharma".into(),
                nationality: "Indian".into(),
                id_type: IdType::Aadhar,
                id_number: Masked("WXYZ5678".into()),
                identity_document_url: vec!["https://media.example/b.jpg".into()],
                identity_document_name: vec!["b.jpg".into()],
            }],
        }
    }

    #[test]
    fn test_record_encoding_uses_typed_envelope() {
        let fields = encode_record(&sample_record());
        assert_eq!(fields["name"]["stringValue"], "A. Sharma");
        assert_eq!(fields["numberOfGuests"]["integerValue"], "2");
        assert_eq!(fields["status"]["stringValue"], "pending");
        assert_eq!(
            fields["identityDocumentUrl"]["arrayValue"]["values"][0]["stringValue"],
            "https://media.example/a.jpg"
        );
        let guest = &fields["additionalGuests"]["arrayValue"]["values"][0]["mapValue"]["fields"];
        assert_eq!(guest["idNumber"]["stringValue"], "WXYZ5678");
    }

    #[test]
    fn test_document_decoding_round_trips() {
        let doc = json!({
            "name": "projects/demo/databases/(default)/documents/guests/rec-42",
            "createTime": "2025-06-01T09:30:00Z",
            "fields": encode_record(&sample_record()),
        });

        let record = decode_document(&doc).unwrap();
        assert_eq!(record.id, RecordId::from("rec-42"));
        assert_eq!(record.name, "A. Sharma");
        assert_eq!(record.number_of_guests, 2);
        assert_eq!(record.checkin_date.to_string(), "2025-06-02");
        assert_eq!(record.status, RegistrationStatus::Pending);
        assert_eq!(record.additional_guests.len(), 1);
        assert_eq!(record.additional_guests[0].name, "B. Sharma");
        assert_eq!(
            record.registration_date,
            DateTime::parse_from_rfc3339("2025-06-01T09:30:00Z").unwrap()
        );
    }

    #[test]
    fn test_decoding_rejects_document_without_fields() {
        let doc = json!({
            "name": "projects/demo/databases/(default)/documents/guests/rec-1",
            "createTime": "2025-06-01T09:30:00Z",
            "fields": { "name": string_value("only a name") },
        });
        assert!(decode_document(&doc).is_err());
    }
}
