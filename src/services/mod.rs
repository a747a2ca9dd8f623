pub mod ai_service;
pub mod content_service;
pub mod exam_assembler;
pub mod exam_service;
pub mod fallback_service;
pub mod grading_service;
pub mod question_generator;
pub mod quiz_service;
pub mod validation_service;
