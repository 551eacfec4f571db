pub mod knowledge_base;
pub mod openai;
pub mod prompts;
