pub mod backend;
pub mod browser;
pub mod completion;
pub mod deep_link_router;
pub mod error_classifier;
pub mod orchestrator;
pub mod session_creator;
pub mod status_poller;
