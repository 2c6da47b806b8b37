pub mod chunking;
pub mod config;
pub mod context;
pub mod database;
pub mod document;
pub mod ollama;
pub mod rag;
