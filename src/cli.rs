use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Import mlb.com video metadata", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the http api.
    Daemon {
        /// Address to listen on, overrides config and MLBV_LISTEN
        #[clap(long)]
        listen: Option<String>,
    },
    /// Import a video and print its metadata as json
    Import {
        /// An mlb.com video url
        #[clap(allow_hyphen_values = true)]
        url: String,
    },
    /// Check whether a url is a recognized mlb.com video url
    Validate {
        #[clap(allow_hyphen_values = true)]
        url: String,
    },
    /// Remove cached videos
    ClearCache {
        /// Only this slug. Clears everything when omitted.
        #[clap(short, long)]
        slug: Option<String>,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },
}
