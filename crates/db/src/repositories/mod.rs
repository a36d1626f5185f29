//! Repository layer: one zero-sized struct per table.
//!
//! Read-only lookups take `&PgPool`. Methods that take part in a
//! multi-statement transaction accept any [`sqlx::PgExecutor`], so callers
//! pass `&mut *tx` inside a transaction and `&pool` outside one. The
//! `*_for_update` variants lock the row and only make sense inside a
//! transaction.

pub mod construction_item_repo;
pub mod construction_task_repo;
pub mod contract_repo;
pub mod deferred_job_repo;
pub mod doc_repo;
pub mod payment_repo;
pub mod project_repo;
pub mod promotion_repo;
pub mod quotation_repo;
pub mod user_repo;

pub use construction_item_repo::ConstructionItemRepo;
pub use construction_task_repo::ConstructionTaskRepo;
pub use contract_repo::ContractRepo;
pub use deferred_job_repo::DeferredJobRepo;
pub use doc_repo::DocRepo;
pub use payment_repo::PaymentRepo;
pub use project_repo::ProjectRepo;
pub use promotion_repo::PromotionRepo;
pub use quotation_repo::QuotationRepo;
pub use user_repo::UserRepo;
