mod commands;

use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use std::path::PathBuf;
use vpcflow_config::ProviderSettings;

#[derive(Parser)]
#[command(name = "vpcflow")]
#[command(about = "Declarative SSH key management for IBM Cloud VPC", long_about = None)]
struct Cli {
    #[command(flatten)]
    provider: ProviderArgs,

    /// Directory holding .vpcflow/state.json
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Provider settings; unset flags fall back to the environment
#[derive(Args)]
struct ProviderArgs {
    /// IBM Cloud API key (IC_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// IAM access token (IC_IAM_TOKEN)
    #[arg(long, global = true)]
    iam_token: Option<String>,

    /// IAM refresh token (IC_IAM_REFRESH_TOKEN)
    #[arg(long, global = true)]
    iam_refresh_token: Option<String>,

    /// Region (IC_REGION), default us-south
    #[arg(long, global = true)]
    region: Option<String>,

    /// HTTP timeout in seconds (IC_TIMEOUT), default 60
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Retries for transient API failures (MAX_RETRIES), default 10
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// VPC infrastructure generation (IC_GENERATION), default 2
    #[arg(long, global = true)]
    generation: Option<u32>,

    /// Zone (IC_ZONE)
    #[arg(long, global = true)]
    zone: Option<String>,
}

impl ProviderArgs {
    fn into_settings(self) -> ProviderSettings {
        ProviderSettings {
            ibmcloud_api_key: self.api_key.map(SecretString::from),
            ibmcloud_timeout: self.timeout,
            region: self.region,
            zone: self.zone,
            max_retries: self.max_retries,
            generation: self.generation,
            iam_token: self.iam_token.map(SecretString::from),
            iam_refresh_token: self.iam_refresh_token.map(SecretString::from),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Manage VPC SSH keys
    #[command(subcommand)]
    Sshkey(SshkeyCommands),
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum SshkeyCommands {
    /// Create or update a key to match the given attributes
    Apply {
        /// Key name
        #[arg(short, long)]
        name: String,
        /// State label for the key, defaults to the name; keep it to rename in place
        #[arg(short, long)]
        label: Option<String>,
        /// Public key data
        #[arg(short = 'k', long, conflicts_with = "public_key_file")]
        public_key: Option<String>,
        /// Read the public key from a file
        #[arg(short = 'f', long)]
        public_key_file: Option<PathBuf>,
        /// Resource group ID for the key; defaults to IC_RESOURCE_GROUP
        #[arg(long)]
        resource_group: Option<String>,
    },
    /// Start managing a key that already exists remotely
    Import {
        /// Remote key ID
        #[arg(long)]
        id: String,
        /// State label for the key, defaults to its remote name
        #[arg(short, long, visible_alias = "name", short_alias = 'n')]
        label: Option<String>,
    },
    /// Refresh and print the stored attributes
    Show {
        /// State label of the key
        #[arg(short, long, visible_alias = "name", short_alias = 'n')]
        label: String,
    },
    /// Print whether the key still exists remotely
    Exists {
        /// State label of the key
        #[arg(short, long, visible_alias = "name", short_alias = 'n')]
        label: String,
    },
    /// Delete the key and drop it from state
    Destroy {
        /// State label of the key
        #[arg(short, long, visible_alias = "name", short_alias = 'n')]
        label: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        Commands::Version => {
            println!("vpcflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Sshkey(cmd) => {
            let ctx = commands::Context::new(&cli.project_dir, cli.provider.into_settings()).await?;
            match cmd {
                SshkeyCommands::Apply {
                    name,
                    label,
                    public_key,
                    public_key_file,
                    resource_group,
                } => {
                    let public_key =
                        commands::sshkey::read_public_key(public_key, public_key_file.as_deref())?;
                    let label = label.unwrap_or_else(|| name.clone());
                    commands::sshkey::apply(&ctx, &label, &name, &public_key, resource_group)
                        .await?;
                }
                SshkeyCommands::Import { id, label } => {
                    commands::sshkey::import(&ctx, &id, label.as_deref()).await?;
                }
                SshkeyCommands::Show { label } => {
                    commands::sshkey::show(&ctx, &label).await?;
                }
                SshkeyCommands::Exists { label } => {
                    commands::sshkey::exists(&ctx, &label).await?;
                }
                SshkeyCommands::Destroy { label } => {
                    commands::sshkey::destroy(&ctx, &label).await?;
                }
            }
        }
    }

    Ok(())
}
