// Domain layer - Door position inference engine
pub mod color_match;
pub mod door_state;
pub mod error;
pub mod geometry;
pub mod line_sampler;
