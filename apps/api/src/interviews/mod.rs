pub mod frameworks;
pub mod generator;
pub mod handlers;
pub mod lifecycle;
pub mod prompts;
