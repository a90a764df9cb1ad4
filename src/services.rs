pub mod dashboard_service;
pub use dashboard_service::{DashboardService, StatusPolicy};
pub mod enquiry_service;
pub use enquiry_service::EnquiryService;
pub mod export_service;
pub use export_service::ExportService;
pub mod filter_service;
pub mod normalize_service;
pub use normalize_service::{NormalizeService, OwnerDirectory};
pub mod user_service;
pub use user_service::UserService;
