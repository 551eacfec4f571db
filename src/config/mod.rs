pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use command_line::{CliConfig, Command, ScanKindArg};

#[cfg(feature = "cli")]
mod command_line {
    use crate::domain::model::ScanKind;
    use clap::{Parser, Subcommand, ValueEnum};

    #[derive(Debug, Clone, Parser)]
    #[command(name = "tenant-optimizer")]
    #[command(about = "Scan an Azure tenant for orphaned and deprecated resources, then clean up or upgrade them")]
    pub struct CliConfig {
        /// TOML configuration file
        #[arg(long, default_value = "optimizer.toml")]
        pub config: String,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub log_json: bool,

        #[arg(long, help = "Log system resource usage while running")]
        pub monitor: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Scan subscriptions for problem resources and write a JSON report
        Scan {
            #[arg(value_enum)]
            kind: ScanKindArg,

            /// Override the configured subscription ids
            #[arg(long, value_delimiter = ',')]
            subscriptions: Vec<String>,

            /// Skip LLM classification even when configured
            #[arg(long)]
            no_ai: bool,
        },

        /// Delete resources by full ARM resource id
        Delete {
            #[arg(required = true, value_delimiter = ',')]
            ids: Vec<String>,
        },

        /// Upgrade deprecated resources (Public IPs, load balancers, storage accounts)
        Upgrade {
            #[arg(required = true, value_delimiter = ',')]
            ids: Vec<String>,
        },

        /// List subscriptions visible to the configured token
        Subscriptions,

        /// Show migration guidance for a resource type
        Guidance {
            /// Qualified type, e.g. Microsoft.Network/publicIPAddresses
            resource_type: String,
        },
    }

    #[derive(Debug, Clone, Copy, ValueEnum)]
    pub enum ScanKindArg {
        Orphaned,
        Deprecated,
    }

    impl From<ScanKindArg> for ScanKind {
        fn from(value: ScanKindArg) -> Self {
            match value {
                ScanKindArg::Orphaned => ScanKind::Orphaned,
                ScanKindArg::Deprecated => ScanKind::Deprecated,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parses_scan_command() {
            let cli = CliConfig::parse_from([
                "tenant-optimizer",
                "--verbose",
                "scan",
                "orphaned",
                "--subscriptions",
                "sub-1,sub-2",
            ]);

            assert!(cli.verbose);
            match cli.command {
                Command::Scan {
                    kind,
                    subscriptions,
                    no_ai,
                } => {
                    assert!(matches!(kind, ScanKindArg::Orphaned));
                    assert_eq!(subscriptions, vec!["sub-1", "sub-2"]);
                    assert!(!no_ai);
                }
                other => panic!("expected scan command, got {:?}", other),
            }
        }

        #[test]
        fn guidance_needs_only_a_resource_type() {
            let cli = CliConfig::parse_from([
                "tenant-optimizer",
                "guidance",
                "Microsoft.Network/publicIPAddresses",
            ]);
            match cli.command {
                Command::Guidance { resource_type } => {
                    assert_eq!(resource_type, "Microsoft.Network/publicIPAddresses");
                }
                other => panic!("expected guidance command, got {:?}", other),
            }
        }

        #[test]
        fn delete_requires_ids() {
            assert!(CliConfig::try_parse_from(["tenant-optimizer", "delete"]).is_err());
            let cli =
                CliConfig::parse_from(["tenant-optimizer", "delete", "/subscriptions/s/x,/subscriptions/s/y"]);
            match cli.command {
                Command::Delete { ids } => assert_eq!(ids.len(), 2),
                other => panic!("expected delete command, got {:?}", other),
            }
        }
    }
}
