pub mod profile;

pub use profile::{BasicInfo, JobsAndProjects, Partner, Skills, Socials};
