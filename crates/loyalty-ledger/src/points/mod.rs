//! Accrued and claimed points derived from the sales ledger.

pub mod account;
pub mod claim;
pub mod engine;
pub mod repository;

pub use account::{IntegrityViolation, PointsAccount, PointsBalance};
pub use claim::{ClaimError, ClaimOutcome, ClaimReceipt, ClaimService, RejectionReason};
pub use engine::{derive_points, PointsEngine, PointsError, RecomputeConflict, RecomputeSummary};
pub use repository::PointsRepository;
