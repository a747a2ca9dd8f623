pub mod course;
pub mod exam;
pub mod question;
pub mod topic;
