pub mod activity_log;
pub mod config;
pub mod error;
pub mod event_mapper;
pub mod google_calendar_client;
