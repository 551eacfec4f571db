pub mod ai;
pub mod azure;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command, ScanKindArg};

pub use ai::knowledge_base::KnowledgeBase;
pub use ai::openai::OpenAiClient;
pub use azure::arm::ArmClient;
pub use azure::resource_graph::ResourceGraphClient;
pub use config::cli::LocalStorage;
pub use config::toml_config::TomlConfig;
pub use core::delete::DeleteBatch;
pub use core::scanner::Scanner;
pub use core::upgrade::UpgradeOrchestrator;
pub use utils::error::{OptimizerError, Result};
