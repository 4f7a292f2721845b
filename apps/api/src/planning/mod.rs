pub mod advisor;
pub mod planner;
pub mod prompts;
pub mod strategy;
