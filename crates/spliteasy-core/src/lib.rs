pub mod backend;
pub mod error;
pub mod models;
pub mod status;

pub use backend::SplitBackend;
pub use error::{ApiError, ApiResult, message_for_status};
pub use models::{
    AuthSession, Bill, BillId, Contribution, ContributionId, Household, HouseholdId,
    HouseholdMember, MemberContribution, MemberContributionFilter, MemberContributionId, NewBill,
    NewContribution, NewHousehold, PaymentReceipt, ReceiptId, ReceiptUpload, Role, SplitStrategy,
    UserId,
};
pub use status::{ContributionStatus, ReceiptStatus, derive_status, normalize_status};
