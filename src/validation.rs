// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request validation gate.
//!
//! Payloads are checked as raw JSON before any token is minted or any vault
//! call is made. Rules run in order and the first failure wins:
//!
//! 1. `amount` is present, a JSON number, and `>= 0`
//! 2. `category` is present, a string, and non-empty after trimming
//! 3. `description` is present, a string, and non-empty after trimming
//!
//! An optional `date` must be an RFC 3339 timestamp. Bulk payloads are
//! all-or-nothing: one bad record rejects the whole batch.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::{ExpenseDraft, ExpensePatch};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Expense must be a JSON object")]
    NotAnObject,
    #[error("Amount must be a non-negative number")]
    Amount,
    #[error("Category is required and must be a non-empty string")]
    Category,
    #[error("Description is required and must be a non-empty string")]
    Description,
    #[error("Date must be an RFC 3339 timestamp")]
    Date,
    #[error("At least one expense is required")]
    EmptyBatch,
    #[error("Update must include at least one of amount, category, description or date")]
    EmptyUpdate,
    #[error("Record id is required and must be a non-empty string")]
    MissingId,
    #[error("At least one record id is required")]
    NoIds,
    #[error("Record {index}: {reason}")]
    Record {
        index: usize,
        reason: Box<ValidationError>,
    },
}

impl ValidationError {
    fn at(self, index: usize) -> Self {
        ValidationError::Record {
            index,
            reason: Box::new(self),
        }
    }
}

/// Validate a single create payload.
pub fn validate_expense(candidate: &Value) -> Result<ExpenseDraft, ValidationError> {
    let fields = candidate.as_object().ok_or(ValidationError::NotAnObject)?;

    let amount = amount_field(fields.get("amount"))?;
    let category = text_field(fields.get("category"), ValidationError::Category)?;
    let description = text_field(fields.get("description"), ValidationError::Description)?;
    let date = match fields.get("date") {
        None | Some(Value::Null) => None,
        Some(value) => Some(date_field(value)?),
    };

    Ok(ExpenseDraft {
        amount,
        category,
        description,
        date,
    })
}

/// Validate a create body: one object or an array of objects.
///
/// Every record is checked before returning, so nothing is written unless
/// the whole batch is valid.
pub fn validate_batch(body: &Value) -> Result<Vec<ExpenseDraft>, ValidationError> {
    match body {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(ValidationError::EmptyBatch);
            }
            items
                .iter()
                .enumerate()
                .map(|(index, item)| validate_expense(item).map_err(|e| e.at(index)))
                .collect()
        }
        other => validate_expense(other).map(|draft| vec![draft]),
    }
}

/// Validate a partial update. Only the fields present are checked, with the
/// same rules as creation; `id` and `_id` keys are ignored.
pub fn validate_patch(candidate: &Value) -> Result<ExpensePatch, ValidationError> {
    let fields = candidate.as_object().ok_or(ValidationError::NotAnObject)?;

    let patch = ExpensePatch {
        amount: fields
            .get("amount")
            .map(|value| amount_field(Some(value)))
            .transpose()?,
        category: fields
            .get("category")
            .map(|value| text_field(Some(value), ValidationError::Category))
            .transpose()?,
        description: fields
            .get("description")
            .map(|value| text_field(Some(value), ValidationError::Description))
            .transpose()?,
        // Null leaves the date unchanged, as on create.
        date: match fields.get("date") {
            None | Some(Value::Null) => None,
            Some(value) => Some(date_field(value)?),
        },
    };

    if patch.is_empty() {
        return Err(ValidationError::EmptyUpdate);
    }
    Ok(patch)
}

/// Validate a bulk update body: `{"updates": [{"id": "...", ...fields}]}`.
pub fn validate_patch_batch(body: &Value) -> Result<Vec<(String, ExpensePatch)>, ValidationError> {
    let updates = body
        .get("updates")
        .and_then(Value::as_array)
        .ok_or(ValidationError::EmptyBatch)?;
    if updates.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    updates
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let id = item
                .as_object()
                .and_then(record_id)
                .ok_or_else(|| ValidationError::MissingId.at(index))?;
            let patch = validate_patch(item).map_err(|e| e.at(index))?;
            Ok((id, patch))
        })
        .collect()
}

/// Validate a list of record ids for bulk delete/remove.
pub fn validate_ids(ids: &[String]) -> Result<(), ValidationError> {
    if ids.is_empty() {
        return Err(ValidationError::NoIds);
    }
    match ids.iter().position(|id| id.trim().is_empty()) {
        Some(index) => Err(ValidationError::MissingId.at(index)),
        None => Ok(()),
    }
}

fn record_id(fields: &Map<String, Value>) -> Option<String> {
    fields
        .get("id")
        .or_else(|| fields.get("_id"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn amount_field(value: Option<&Value>) -> Result<f64, ValidationError> {
    value
        .and_then(Value::as_f64)
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
        .ok_or(ValidationError::Amount)
}

fn text_field(value: Option<&Value>, error: ValidationError) -> Result<String, ValidationError> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or(error)
}

fn date_field(value: &Value) -> Result<DateTime<Utc>, ValidationError> {
    value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok_or(ValidationError::Date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_record_passes() {
        let draft = validate_expense(&json!({
            "amount": 0,
            "category": "  travel ",
            "description": "train ticket"
        }))
        .unwrap();

        assert_eq!(draft.amount, 0.0);
        assert_eq!(draft.category, "travel");
        assert_eq!(draft.description, "train ticket");
        assert_eq!(draft.date, None);
    }

    #[test]
    fn amount_rules() {
        let cases = [
            json!({"category": "a", "description": "b"}),
            json!({"amount": -0.01, "category": "a", "description": "b"}),
            json!({"amount": "12", "category": "a", "description": "b"}),
            json!({"amount": null, "category": "a", "description": "b"}),
        ];
        for case in cases {
            assert_eq!(validate_expense(&case), Err(ValidationError::Amount), "{case}");
        }
    }

    #[test]
    fn amount_is_checked_before_other_fields() {
        let result = validate_expense(&json!({"amount": -1, "category": "", "description": ""}));
        assert_eq!(result, Err(ValidationError::Amount));
    }

    #[test]
    fn category_rules() {
        for category in [json!(""), json!("   "), json!(5), Value::Null] {
            let result = validate_expense(&json!({
                "amount": 1, "category": category, "description": "x"
            }));
            assert_eq!(result, Err(ValidationError::Category));
        }
        let missing = validate_expense(&json!({"amount": 1, "description": "x"}));
        assert_eq!(missing, Err(ValidationError::Category));
    }

    #[test]
    fn description_rules() {
        for description in [json!(""), json!("\t\n"), json!(["x"])] {
            let result = validate_expense(&json!({
                "amount": 1, "category": "food", "description": description
            }));
            assert_eq!(result, Err(ValidationError::Description));
        }
    }

    #[test]
    fn date_must_be_rfc3339() {
        let ok = validate_expense(&json!({
            "amount": 1, "category": "a", "description": "b",
            "date": "2026-01-31T10:00:00+02:00"
        }))
        .unwrap();
        assert_eq!(ok.date.unwrap().to_rfc3339(), "2026-01-31T08:00:00+00:00");

        let bad = validate_expense(&json!({
            "amount": 1, "category": "a", "description": "b", "date": "yesterday"
        }));
        assert_eq!(bad, Err(ValidationError::Date));
    }

    #[test]
    fn non_object_is_rejected() {
        assert_eq!(validate_expense(&json!(42)), Err(ValidationError::NotAnObject));
    }

    #[test]
    fn batch_rejects_whole_request_on_one_bad_record() {
        let body = json!([
            {"amount": 1, "category": "a", "description": "b"},
            {"amount": 2, "category": "a", "description": "b"},
            {"amount": 3, "category": " ", "description": "b"},
        ]);
        let err = validate_batch(&body).unwrap_err();
        assert_eq!(err, ValidationError::Category.at(2));
        assert_eq!(
            err.to_string(),
            "Record 2: Category is required and must be a non-empty string"
        );
    }

    #[test]
    fn batch_accepts_single_object_and_arrays() {
        let single = json!({"amount": 1, "category": "a", "description": "b"});
        assert_eq!(validate_batch(&single).unwrap().len(), 1);
        assert_eq!(validate_batch(&json!([single.clone(), single])).unwrap().len(), 2);
        assert_eq!(validate_batch(&json!([])), Err(ValidationError::EmptyBatch));
    }

    #[test]
    fn patch_validates_present_fields_only() {
        let patch = validate_patch(&json!({"description": " lunch "})).unwrap();
        assert_eq!(patch.description.as_deref(), Some("lunch"));
        assert!(patch.amount.is_none());

        assert_eq!(
            validate_patch(&json!({"amount": -5})),
            Err(ValidationError::Amount)
        );
        assert_eq!(
            validate_patch(&json!({"id": "abc"})),
            Err(ValidationError::EmptyUpdate)
        );
    }

    #[test]
    fn patch_treats_null_date_as_absent() {
        let patch = validate_patch(&json!({"amount": 1, "date": null})).unwrap();
        assert_eq!(patch.amount, Some(1.0));
        assert!(patch.date.is_none());

        assert_eq!(
            validate_patch(&json!({"date": null})),
            Err(ValidationError::EmptyUpdate)
        );
        assert_eq!(
            validate_patch(&json!({"amount": 1, "date": "soon"})),
            Err(ValidationError::Date)
        );
    }

    #[test]
    fn patch_batch_requires_ids() {
        let ok = validate_patch_batch(&json!({
            "updates": [{"id": "r1", "amount": 3}, {"_id": "r2", "category": "fun"}]
        }))
        .unwrap();
        assert_eq!(ok[0].0, "r1");
        assert_eq!(ok[1].0, "r2");

        let missing = validate_patch_batch(&json!({"updates": [{"amount": 3}]}));
        assert_eq!(missing, Err(ValidationError::MissingId.at(0)));

        assert_eq!(
            validate_patch_batch(&json!({"updates": []})),
            Err(ValidationError::EmptyBatch)
        );
    }

    #[test]
    fn id_lists_must_be_non_empty() {
        assert_eq!(validate_ids(&[]), Err(ValidationError::NoIds));
        assert_eq!(
            validate_ids(&["a".into(), " ".into()]),
            Err(ValidationError::MissingId.at(1))
        );
        assert!(validate_ids(&["a".into()]).is_ok());
    }
}
