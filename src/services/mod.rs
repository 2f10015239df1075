pub mod answer;
pub mod chunker;
pub mod extract;
pub mod llm;
pub mod vector;
