pub mod exam_dto;
pub mod quiz_dto;
