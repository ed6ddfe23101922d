use axum::{extract::State, Json};
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;

use atithi_core::model::RegistrationStatus;

use crate::error::AppError;
use crate::state::AppState;

const MONTH_LABELS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Serialize)]
pub struct MonthlyBucket {
    month: &'static str,
    registrations: u32,
    guests: u32,
}

#[derive(Debug, Serialize)]
pub struct NationalityCount {
    nationality: String,
    guests: u32,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    year: i32,
    total_registrations: usize,
    pending: usize,
    approved: usize,
    rejected: usize,
    monthly: Vec<MonthlyBucket>,
    nationalities: Vec<NationalityCount>,
}

/// GET /v1/admin/registrations/summary
///
/// Aggregates the panel's dashboard numbers: per-month registrations and
/// guest head-count for the current year, plus the nationality distribution.
/// Head counts include additional guests.
pub async fn get_registration_summary(
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let records = state.guests.list().await.map_err(AppError::store)?;

    let year = Utc::now().year();
    let mut monthly: Vec<MonthlyBucket> = MONTH_LABELS
        .iter()
        .map(|label| MonthlyBucket {
            month: label,
            registrations: 0,
            guests: 0,
        })
        .collect();
    let mut nationalities: HashMap<String, u32> = HashMap::new();

    for record in &records {
        if record.registration_date.year() == year {
            let bucket = &mut monthly[record.registration_date.month0() as usize];
            bucket.registrations += 1;
            bucket.guests += record.total_guests() as u32;
        }

        *nationalities.entry(record.nationality.clone()).or_default() += 1;
        for guest in &record.additional_guests {
            *nationalities.entry(guest.nationality.clone()).or_default() += 1;
        }
    }

    let mut nationalities: Vec<NationalityCount> = nationalities
        .into_iter()
        .map(|(nationality, guests)| NationalityCount {
            nationality,
            guests,
        })
        .collect();
    nationalities.sort_by(|a, b| b.guests.cmp(&a.guests).then(a.nationality.cmp(&b.nationality)));

    let count = |status: RegistrationStatus| records.iter().filter(|r| r.status == status).count();

    Ok(Json(SummaryResponse {
        year,
        total_registrations: records.len(),
        pending: count(RegistrationStatus::Pending),
        approved: count(RegistrationStatus::Approved),
        rejected: count(RegistrationStatus::Rejected),
        monthly,
        nationalities,
    }))
}
