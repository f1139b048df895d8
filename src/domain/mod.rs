pub mod filter;
pub mod models;
pub mod project_tag;
pub mod scheduler;
