use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a charm and print where it is stored
    #[command(arg_required_else_help = true)]
    Get {
        /// Charm URL, e.g. cs:trusty/wordpress or local:trusty/mysql
        #[arg(required = true)]
        url: String,
    },

    /// Print the latest revision of each charm
    #[command(arg_required_else_help = true)]
    Latest {
        /// Charm URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Resolve a partial charm URL to a fully qualified one
    #[command(arg_required_else_help = true)]
    Resolve {
        /// Charm URL
        #[arg(required = true)]
        url: String,
    },

    /// Print the effective configuration
    Config,
}
