pub mod admin_service;
pub mod ai_service;
pub mod application_service;
pub mod application_store;
pub mod application_workflow;
pub mod audit_service;
pub mod auth_service;
pub mod candidate_service;
pub mod company_service;
pub mod consultant_service;
pub mod cv_analyzer;
pub mod job_service;
pub mod messaging_service;
pub mod notification_dispatcher;
pub mod notification_service;
pub mod search;
pub mod skill_service;
