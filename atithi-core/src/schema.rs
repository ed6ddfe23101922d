use chrono::NaiveDate;
use serde::Serialize;

use crate::model::IdType;

/// One validation rule. The schema is data, not per-field branching: the same
/// rule set drives the primary-guest and additional-guest validators.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Required,
    MinLen(usize),
    /// Numeric string of the given digit-count range
    Digits { min: usize, max: usize },
    Range { min: i64, max: i64 },
}

/// Field name plus the ordered rule set applied to it
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub rules: &'static [Rule],
}

/// A single unmet rule, addressed to the offending field so the caller can
/// surface it next to the input.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(prefix: &str, spec: &FieldSpec, message: String) -> Self {
        Self {
            field: format!("{}{}", prefix, spec.name),
            message,
        }
    }
}

pub const NAME: FieldSpec = FieldSpec {
    name: "name",
    label: "Name",
    rules: &[Rule::Required, Rule::MinLen(2)],
};

pub const NUMBER_OF_GUESTS: FieldSpec = FieldSpec {
    name: "number_of_guests",
    label: "Number of guests",
    rules: &[Rule::Required, Rule::Range { min: 1, max: 10 }],
};

pub const CONTACT_NUMBER: FieldSpec = FieldSpec {
    name: "contact_number",
    label: "Contact number",
    rules: &[Rule::Required, Rule::Digits { min: 10, max: 12 }],
};

pub const NATIONALITY: FieldSpec = FieldSpec {
    name: "nationality",
    label: "Nationality",
    rules: &[Rule::Required, Rule::MinLen(2)],
};

pub const ID_TYPE: FieldSpec = FieldSpec {
    name: "id_type",
    label: "ID type",
    rules: &[Rule::Required],
};

pub const ID_NUMBER: FieldSpec = FieldSpec {
    name: "id_number",
    label: "ID number",
    rules: &[Rule::Required, Rule::MinLen(4)],
};

pub const CHECKIN_DATE: FieldSpec = FieldSpec {
    name: "checkin_date",
    label: "Check-in date",
    rules: &[Rule::Required],
};

pub const CHECKOUT_DATE: FieldSpec = FieldSpec {
    name: "checkout_date",
    label: "Check-out date",
    rules: &[Rule::Required],
};

pub const IDENTITY_DOCUMENTS: FieldSpec = FieldSpec {
    name: "identity_document_url",
    label: "Identity document",
    rules: &[Rule::Required],
};

impl FieldSpec {
    /// First unmet rule wins; later rules are not evaluated for this field.
    pub fn check_text(&self, value: &str, prefix: &str) -> Option<FieldError> {
        let trimmed = value.trim();
        for rule in self.rules {
            let failure = match rule {
                Rule::Required if trimmed.is_empty() => Some(format!("{} is required", self.label)),
                Rule::MinLen(min) if trimmed.chars().count() < *min => {
                    Some(format!("{} must be at least {} characters", self.label, min))
                }
                Rule::Digits { min, max } => {
                    let digits_only = trimmed.chars().all(|c| c.is_ascii_digit());
                    let len = trimmed.chars().count();
                    if !digits_only || len < *min || len > *max {
                        Some(format!("{} must be {} to {} digits", self.label, min, max))
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if let Some(message) = failure {
                return Some(FieldError::new(prefix, self, message));
            }
        }
        None
    }

    pub fn check_int(&self, value: Option<i64>, prefix: &str) -> Option<FieldError> {
        for rule in self.rules {
            let failure = match (rule, value) {
                (Rule::Required, None) => Some(format!("{} is required", self.label)),
                (Rule::Range { min, max }, Some(v)) if v < *min || v > *max => {
                    Some(format!("{} must be between {} and {}", self.label, min, max))
                }
                _ => None,
            };
            if let Some(message) = failure {
                return Some(FieldError::new(prefix, self, message));
            }
        }
        None
    }

    pub fn check_present<T>(&self, value: Option<&T>, prefix: &str) -> Option<FieldError> {
        if value.is_none() {
            return Some(FieldError::new(
                prefix,
                self,
                format!("{} is required", self.label),
            ));
        }
        None
    }
}

/// Check-in must not be in the past, relative to the caller's local date.
pub fn check_not_past(spec: &FieldSpec, date: NaiveDate, today: NaiveDate, prefix: &str) -> Option<FieldError> {
    if date < today {
        return Some(FieldError::new(
            prefix,
            spec,
            format!("{} cannot be in the past", spec.label),
        ));
    }
    None
}

/// Check-out must fall strictly after check-in.
pub fn check_after(spec: &FieldSpec, date: NaiveDate, lower: NaiveDate, prefix: &str) -> Option<FieldError> {
    if date <= lower {
        return Some(FieldError::new(
            prefix,
            spec,
            format!("{} must be after the check-in date", spec.label),
        ));
    }
    None
}

/// The fields every guest carries, primary or additional, viewed uniformly so
/// one validator serves both.
pub struct PersonView<'a> {
    pub name: &'a str,
    pub nationality: &'a str,
    pub id_type: Option<IdType>,
    pub id_number: &'a str,
    pub document_count: usize,
}

/// Validates the shared person fields. Every rule is evaluated; the result
/// carries one error per failing field so the caller can show them all at once.
pub fn validate_person(prefix: &str, person: &PersonView<'_>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    errors.extend(NAME.check_text(person.name, prefix));
    errors.extend(NATIONALITY.check_text(person.nationality, prefix));
    errors.extend(ID_TYPE.check_present(person.id_type.as_ref(), prefix));
    errors.extend(ID_NUMBER.check_text(person.id_number, prefix));
    if person.document_count == 0 {
        errors.push(FieldError::new(
            prefix,
            &IDENTITY_DOCUMENTS,
            "At least one identity document is required".to_string(),
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_unmet_rule_wins() {
        let err = NAME.check_text("", "").unwrap();
        assert_eq!(err.field, "name");
        assert_eq!(err.message, "Name is required");

        let err = NAME.check_text("A", "").unwrap();
        assert_eq!(err.message, "Name must be at least 2 characters");

        assert!(NAME.check_text("Asha", "").is_none());
    }

    #[test]
    fn test_contact_number_digit_rules() {
        assert!(CONTACT_NUMBER.check_text("9876543210", "").is_none());
        assert!(CONTACT_NUMBER.check_text("987654321012", "").is_none());
        assert!(CONTACT_NUMBER.check_text("987654321", "").is_some());
        assert!(CONTACT_NUMBER.check_text("9876543210123", "").is_some());
        assert!(CONTACT_NUMBER.check_text("98765abcde", "").is_some());
    }

    #[test]
    fn test_guest_count_range() {
        assert!(NUMBER_OF_GUESTS.check_int(Some(1), "").is_none());
        assert!(NUMBER_OF_GUESTS.check_int(Some(10), "").is_none());
        assert!(NUMBER_OF_GUESTS.check_int(Some(0), "").is_some());
        assert!(NUMBER_OF_GUESTS.check_int(Some(11), "").is_some());
        assert_eq!(
            NUMBER_OF_GUESTS.check_int(None, "").unwrap().message,
            "Number of guests is required"
        );
    }

    #[test]
    fn test_date_ordering() {
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        let today = d("2025-06-01");

        assert!(check_not_past(&CHECKIN_DATE, d("2025-05-31"), today, "").is_some());
        assert!(check_not_past(&CHECKIN_DATE, today, today, "").is_none());

        // equal dates fail, one night passes
        assert!(check_after(&CHECKOUT_DATE, d("2025-06-02"), d("2025-06-02"), "").is_some());
        assert!(check_after(&CHECKOUT_DATE, d("2025-06-03"), d("2025-06-02"), "").is_none());
    }

    #[test]
    fn test_person_errors_are_prefixed_and_complete() {
        let person = PersonView {
            name: "",
            nationality: "I",
            id_type: None,
            id_number: "123",
            document_count: 0,
        };
        let errors = validate_person("additional_guests[1].", &person);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "additional_guests[1].name",
                "additional_guests[1].nationality",
                "additional_guests[1].id_type",
                "additional_guests[1].id_number",
                "additional_guests[1].identity_document_url",
            ]
        );
    }
}
