pub mod reconcile;
pub mod review;
pub mod split;

pub use reconcile::{
    ContributionReconciler, ContributionRow, ContributionSummary, RowFilter, StatusTotal,
    summarize,
};
pub use review::{PendingReceipt, ReceiptReview};
pub use split::{Share, SplitMember, preview_split};
