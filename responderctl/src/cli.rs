use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Use this config file instead of the default")]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Base url of the backend server")]
    pub server: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct OutputOptions {
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "table",
        help = "How to print the markers"
    )]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Store the responder identity used for the own marker")]
    Login {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
    },
    #[command(about = "Forget the stored responder identity")]
    Logout,
    #[command(about = "Show the current configuration and identity")]
    Status,
    #[command(
        about = "Change and save configuration values",
        group(
            clap::ArgGroup::new("configure")
                .required(true)
                .multiple(true)
                .args(&["url", "identity", "interval", "timeout"]),
        ))]
    Configure {
        #[arg(long, help = "Base url of the backend server")]
        url: Option<String>,
        #[arg(long, help = "File that stores the responder identity")]
        identity: Option<PathBuf>,
        #[arg(long, help = "Seconds between marker sync ticks")]
        interval: Option<u64>,
        #[arg(long, help = "Seconds before a request to the server is abandoned")]
        timeout: Option<u64>,
    },
    #[command(about = "List the markers visible to the responder")]
    Markers {
        #[arg(long, help = "Include markers without coordinates")]
        all: bool,
        #[command(flatten)]
        output: OutputOptions,
    },
    #[command(
        about = "Keep the responder's marker in sync with the current location",
        group(
            clap::ArgGroup::new("location")
                .required(true)
                .args(&["latitude", "stdin"]),
        ))]
    Sync {
        #[arg(long = "lat", requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long = "long", requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
        #[arg(long, help = "Title of the own-location marker")]
        title: Option<String>,
        #[arg(long, help = "Read 'lat,long[,title]' fixes from stdin, one per line")]
        stdin: bool,
    },
    #[command(about = "Send a status update")]
    Submit {
        #[arg(long, help = "Service provided (e.g. BFP, PNP, Medical)")]
        service: Option<String>,
        #[arg(long, help = "Name of the person in need")]
        name: Option<String>,
        #[arg(short, long, help = "Message, including time and date")]
        message: Option<String>,
    },
}
