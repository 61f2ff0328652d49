pub mod event_log;
pub mod link_quality;
