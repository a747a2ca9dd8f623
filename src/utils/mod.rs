pub mod json_repair;
