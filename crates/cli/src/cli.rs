use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "loyalty-admin", version, about = "Loyalty program admin client")]
pub struct Cli {
    #[arg(long, global = true, env = "LOYALTY_API_BASE_URL", help = "API root of the loyalty backend")]
    pub base_url: Option<String>,
    #[arg(long, global = true, env = "LOYALTY_API_TOKEN", hide_env_values = true, help = "Bearer token")]
    pub token: Option<String>,
    #[arg(long, global = true, help = "Request timeout in seconds")]
    pub timeout_secs: Option<u64>,
    #[arg(long, global = true, help = "Seconds fetched data stays fresh")]
    pub stale_secs: Option<u64>,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List rank (tier) definitions
    Ranks,
    /// List member loyalty profiles
    Profiles,
    /// Manually adjust a profile's point balance
    Adjust {
        /// Profile id
        id: i64,
        /// Signed point change
        #[arg(allow_negative_numbers = true)]
        delta: i64,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        reference: Option<String>,
    },
}
