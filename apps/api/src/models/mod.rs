pub mod career_path;
pub mod job;
