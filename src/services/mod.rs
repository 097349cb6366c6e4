pub mod appointment_service;
pub mod dashboard_service;
pub mod pipeline_service;
pub mod shop_service;
pub mod worker_service;
