use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_CONTAINER: &str = "app-container";
pub const MAX_TIMEOUT_SECS: u64 = 3600;

#[derive(Parser)]
#[command(name = "imgprobe")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"))]
#[command(about = "Container image security and CA-certificate smoke tests", long_about = None)]
pub struct Cli {
    /// Container runtime CLI (docker-compatible)
    #[arg(long, global = true, env = "IMGPROBE_RUNTIME", default_value = "docker")]
    pub runtime: String,

    /// Build descriptor used to classify the image and find CA bundle copies
    #[arg(long, global = true, env = "IMGPROBE_DOCKERFILE", default_value = "Dockerfile")]
    pub dockerfile: PathBuf,

    /// Timeout in seconds for network probes (1-3600)
    #[arg(long, global = true, env = "IMGPROBE_TIMEOUT", default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub timeout: u64,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check an image for shell access, leaked env vars, sensitive files and CA certificates
    SecurityCheck {
        /// Image to check
        image: String,

        /// Application binary inside the image, started with --help
        binary_path: Option<String>,
    },

    /// Check CA certificates and outbound TLS from a running container
    CertificateCheck {
        /// Running container name or ID
        #[arg(default_value = DEFAULT_CONTAINER)]
        container: String,

        /// Exit 1 when any probe fails
        #[arg(long)]
        strict: bool,
    },
}
