use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Session-token issuance and rotation service")]
pub struct Cli {
    /// Path to the settings file.
    #[arg(long)]
    pub settings: Option<String>,

    /// Overrides `[log].filter` from the settings file.
    #[arg(long)]
    pub log_filter: Option<String>,
}
