// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod frame;
pub mod http_camera;
pub mod json_state_store;
