// Business logic services

pub mod access;
pub mod analytics;
pub mod coach_service;
pub mod export_service;
pub mod session_service;
pub mod template_service;

pub use coach_service::CoachService;
pub use export_service::ExportService;
pub use session_service::SessionService;
pub use template_service::TemplateService;
