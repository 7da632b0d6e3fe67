//! CLI command definitions using clap.
//!
//! - serve: run the HTTP chat server (default)
//! - ask: answer one message from the terminal
//! - tools: print the tool manifest

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Toolchat - a chat assistant that can call tools
#[derive(Parser, Debug)]
#[command(name = "toolchat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the HTTP chat server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message and print the answer
    Ask {
        /// Message text
        message: String,

        /// Session to continue
        #[arg(short, long)]
        session: Option<String>,
    },

    /// List the tools advertised to the model
    Tools,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve { host: None, port: None }
    }
}
