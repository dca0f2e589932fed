// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Expense Data Models
//!
//! Records are stored in the vault; this module only defines their shape.
//! All types serialize with camelCase field names and derive `ToSchema` for
//! the OpenAPI document.
//!
//! - [`ExpenseRecord`]: a stored expense, identified by `_id`
//! - [`ExpenseDraft`]: a validated create payload
//! - [`ExpensePatch`]: a validated partial update

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// An expense as stored in the vault.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    /// Record identifier (UUID v4).
    #[serde(rename = "_id")]
    pub id: String,
    /// Non-negative amount.
    pub amount: f64,
    /// Expense category, e.g. "groceries".
    pub category: String,
    /// Free-text description.
    pub description: String,
    /// When the expense happened.
    pub date: DateTime<Utc>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ExpenseRecord {
    /// Build a new record with a fresh identifier.
    ///
    /// `date` defaults to the creation time.
    pub fn from_draft(draft: ExpenseDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount: draft.amount,
            category: draft.category,
            description: draft.description,
            date: draft.date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A validated expense ready to be written.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    /// Non-negative amount.
    pub amount: f64,
    /// Category (non-empty after trimming).
    pub category: String,
    /// Description (non-empty after trimming).
    pub description: String,
    /// Event date (RFC 3339). Defaults to creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// A validated partial update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.date.is_none()
    }

    /// Apply the present fields and bump `updated_at`.
    pub fn apply(self, record: &mut ExpenseRecord, now: DateTime<Utc>) {
        if let Some(amount) = self.amount {
            record.amount = amount;
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(date) = self.date {
            record.date = date;
        }
        record.updated_at = now;
    }
}
