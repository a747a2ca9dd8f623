pub mod exam_store;
pub mod memory_store;
pub mod pool;
