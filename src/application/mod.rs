// Application layer - Door monitoring use cases and collaborator traits
pub mod camera_source;
pub mod door_monitor;
pub mod state_store;
