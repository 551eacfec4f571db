pub mod delete;
pub mod report;
pub mod scanner;
pub mod upgrade;
