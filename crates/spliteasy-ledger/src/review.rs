use futures_util::future::join_all;
use serde::Serialize;
use spliteasy_core::{
    ApiError, ApiResult, HouseholdId, MemberContribution, MemberContributionFilter,
    MemberContributionId, PaymentReceipt, ReceiptId, ReceiptStatus, ReceiptUpload, SplitBackend,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PendingReceipt {
    pub receipt: PaymentReceipt,
    pub owed: MemberContribution,
}

/// Receipt upload for members and the approval queue for the representative.
pub struct ReceiptReview<'a, B>
where
    B: SplitBackend + ?Sized,
{
    backend: &'a B,
}

impl<'a, B> ReceiptReview<'a, B>
where
    B: SplitBackend + ?Sized,
{
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Receipts awaiting a decision across the household, oldest upload first.
    pub async fn pending_review(&self, household_id: HouseholdId) -> ApiResult<Vec<PendingReceipt>> {
        let filter = MemberContributionFilter::default().in_household(Some(household_id));
        let rows = self.backend.list_member_contributions(&filter).await?;

        let lookups = rows.into_iter().map(|owed| async move {
            let receipts = match self.backend.list_receipts(owed.id).await {
                Ok(receipts) => receipts,
                Err(err) => {
                    warn!(member_contribution_id = %owed.id, "receipt lookup failed: {err}");
                    Vec::new()
                }
            };
            receipts
                .into_iter()
                .filter(|receipt| receipt.status == ReceiptStatus::Pending)
                .map(|receipt| PendingReceipt {
                    receipt,
                    owed: owed.clone(),
                })
                .collect::<Vec<_>>()
        });

        let mut pending: Vec<PendingReceipt> = join_all(lookups).await.into_iter().flatten().collect();
        pending.sort_by_key(|item| {
            (
                item.receipt.uploaded_at.is_none(),
                item.receipt.uploaded_at,
                item.receipt.id,
            )
        });
        Ok(pending)
    }

    pub async fn upload(
        &self,
        member_contribution_id: MemberContributionId,
        upload: ReceiptUpload,
    ) -> ApiResult<PaymentReceipt> {
        if upload.bytes.is_empty() {
            return Err(ApiError::Invalid("receipt file is empty".to_string()));
        }
        if upload.filename.trim().is_empty() {
            return Err(ApiError::Invalid("receipt file needs a name".to_string()));
        }
        self.backend.upload_receipt(member_contribution_id, upload).await
    }

    pub async fn approve(&self, receipt_id: ReceiptId) -> ApiResult<PaymentReceipt> {
        let receipt = self.backend.approve_receipt(receipt_id).await?;
        info!(%receipt_id, "receipt approved");
        Ok(receipt)
    }

    pub async fn reject(&self, receipt_id: ReceiptId, notes: Option<String>) -> ApiResult<PaymentReceipt> {
        let notes = notes.filter(|notes| !notes.trim().is_empty());
        let receipt = self.backend.reject_receipt(receipt_id, notes).await?;
        info!(%receipt_id, "receipt rejected");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use spliteasy_core::{Contribution, ContributionId, UserId};
    use spliteasy_memstore::{Call, InMemoryBackend};

    use super::*;

    fn owed(id: i64, member: i64) -> MemberContribution {
        MemberContribution {
            id: MemberContributionId(id),
            contribution_id: ContributionId(1),
            member_id: UserId(member),
            amount: Decimal::new(5000, 2),
            status: Some("PENDING".to_string()),
            paid_at: None,
        }
    }

    fn receipt(id: i64, owed: i64, status: ReceiptStatus, day: Option<u32>) -> PaymentReceipt {
        PaymentReceipt {
            id: ReceiptId(id),
            member_contribution_id: MemberContributionId(owed),
            filename: "voucher.jpg".to_string(),
            url: None,
            status,
            uploaded_at: day.map(|day| Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()),
            reviewed_by: None,
            notes: None,
        }
    }

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new()
            .with_contribution(Contribution {
                id: ContributionId(1),
                bill_id: None,
                household_id: Some(HouseholdId(7)),
                description: None,
                strategy: None,
                due_date: None,
            })
            .with_member_contribution(owed(1, 3))
            .with_member_contribution(owed(2, 4))
            .with_receipt(receipt(10, 1, ReceiptStatus::Pending, Some(5)))
            .with_receipt(receipt(11, 1, ReceiptStatus::Approved, Some(1)))
            .with_receipt(receipt(12, 2, ReceiptStatus::Pending, Some(2)))
            .with_receipt(receipt(13, 2, ReceiptStatus::Pending, None))
    }

    #[tokio::test]
    async fn queue_holds_pending_receipts_oldest_first() {
        let backend = backend();
        let review = ReceiptReview::new(&backend);

        let queue = review.pending_review(HouseholdId(7)).await.unwrap();

        let ids: Vec<i64> = queue.iter().map(|item| item.receipt.id.0).collect();
        assert_eq!(ids, vec![12, 10, 13]);
        assert_eq!(queue[0].owed.member_id, UserId(4));
    }

    #[tokio::test]
    async fn queue_survives_one_failed_lookup() {
        let backend = backend().failing(
            Call::ListReceipts(MemberContributionId(2)),
            ApiError::http(500, None),
        );
        let review = ReceiptReview::new(&backend);

        let queue = review.pending_review(HouseholdId(7)).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].receipt.id, ReceiptId(10));
    }

    #[tokio::test]
    async fn empty_upload_never_reaches_the_backend() {
        let backend = backend();
        let review = ReceiptReview::new(&backend);

        let err = review
            .upload(
                MemberContributionId(1),
                ReceiptUpload {
                    filename: "empty.jpg".to_string(),
                    content_type: "image/jpeg".to_string(),
                    bytes: Vec::new(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Invalid(_)));
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn rejection_drops_blank_notes() {
        let backend = backend();
        let review = ReceiptReview::new(&backend);

        let rejected = review
            .reject(ReceiptId(12), Some("   ".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.status, ReceiptStatus::Rejected);
        assert_eq!(rejected.notes, None);
    }
}
