use clap::{Parser, Subcommand};
use rezkrypt_media::SimulatedOutcome;

#[derive(Parser, Debug)]
#[command(name = "rezkrypt", about = "Rezkrypt interview screen and registration portal")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/rezkrypt.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mount a video-interview screen and drive it with commands read from stdin
    Interview(InterviewArgs),
    /// Fill in a registration form and print the resulting portal state
    Portal(PortalArgs),
    /// Run proctoring rules over detector frames read from stdin as JSON lines
    Proctor(ProctorArgs),
}

#[derive(clap::Args, Debug)]
pub struct InterviewArgs {
    /// How the simulated capture platform answers (overrides config)
    #[arg(long)]
    pub outcome: Option<SimulatedOutcome>,

    /// Interview screen identifier
    #[arg(long, default_value = "interview-1")]
    pub screen: String,
}

#[derive(clap::Args, Debug)]
pub struct PortalArgs {
    /// Show the company form instead of the student form
    #[arg(long)]
    pub company: bool,

    /// Field edit applied to the active form, e.g. --set companyName=TechCorp
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub edits: Vec<(String, String)>,

    /// List the active form's fields instead of printing state
    #[arg(long)]
    pub fields: bool,
}

#[derive(clap::Args, Debug)]
pub struct ProctorArgs {
    /// Connection the frames belong to
    #[arg(long, default_value = "conn-1")]
    pub connection: String,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
