pub mod api_client;
pub mod attempt_service;
pub mod completion;
pub mod quiz_api;
pub mod quiz_session;
pub mod session_registry;
