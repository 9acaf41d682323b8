pub mod context;
pub mod engine;
pub mod treatment;
pub mod types;
pub mod vocabulary;
