//! Canonical status handling for member contributions and receipts.
//!
//! Backends disagree on spelling and language ("PAGADO" vs "PAID",
//! "EN_REVISION" vs "REVIEW"). Everything is folded into a small canonical
//! set here so the rest of the client never compares raw strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::PaymentReceipt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionStatus {
    Pending,
    InReview,
    Rejected,
    Paid,
}

impl ContributionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InReview => "IN_REVIEW",
            Self::Rejected => "REJECTED",
            Self::Paid => "PAID",
        }
    }

    pub fn is_paid(self) -> bool {
        self == Self::Paid
    }
}

impl fmt::Display for ContributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReceiptStatus {
    /// Unknown or missing review states count as pending: a receipt nobody
    /// has acted on yet.
    pub fn parse(raw: Option<&str>) -> Self {
        match fold(raw).as_deref() {
            Some("APPROVED" | "APROBADO" | "ACCEPTED") => Self::Approved,
            Some("REJECTED" | "RECHAZADO") => Self::Rejected,
            _ => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn fold(raw: Option<&str>) -> Option<String> {
    raw.map(|value| value.trim().to_uppercase().replace([' ', '-'], "_"))
}

/// Maps a raw backend status onto the canonical set. Anything unrecognized,
/// including a missing value, is `Pending`.
pub fn normalize_status(raw: Option<&str>) -> ContributionStatus {
    match fold(raw).as_deref() {
        Some("PAID" | "PAGADO" | "PAGADA") => ContributionStatus::Paid,
        Some("EN_REVISION" | "EN_REVISIÓN" | "REVIEW" | "IN_REVIEW") => ContributionStatus::InReview,
        Some("RECHAZADO" | "RECHAZADA" | "REJECTED") => ContributionStatus::Rejected,
        _ => ContributionStatus::Pending,
    }
}

/// Status shown for a member contribution.
///
/// Paid wins over everything; otherwise a receipt awaiting approval makes the
/// row "in review" whatever the raw field says; then rejection; then pending.
pub fn derive_status(raw: Option<&str>, receipts: &[PaymentReceipt]) -> ContributionStatus {
    let has_pending_receipt = receipts
        .iter()
        .any(|receipt| receipt.status == ReceiptStatus::Pending);
    derive_status_from(normalize_status(raw), has_pending_receipt)
}

pub fn derive_status_from(
    normalized: ContributionStatus,
    has_pending_receipt: bool,
) -> ContributionStatus {
    match normalized {
        ContributionStatus::Paid => ContributionStatus::Paid,
        _ if has_pending_receipt => ContributionStatus::InReview,
        ContributionStatus::Rejected => ContributionStatus::Rejected,
        _ => ContributionStatus::Pending,
    }
}
