mod commands;
mod logging;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quire")]
#[command(version, about = "Static site generator for a personal notebook", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Create a new site directory
    Init {
        /// Path to create the site in
        path: PathBuf,

        /// Site title (defaults to the directory name)
        #[arg(long)]
        title: Option<String>,

        /// Default page author
        #[arg(long)]
        author: Option<String>,
    },

    /// Check pages, images and configuration
    Validate {
        /// Path to site directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Render the site to static files
    Build {
        /// Path to site directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output directory (defaults to build.output_dir from quire.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include pages marked as drafts
        #[arg(long)]
        drafts: bool,
    },

    /// Preview the site locally with live reload
    Serve {
        /// Path to site directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Port to serve on (defaults to serve.port from quire.toml)
        #[arg(short, long)]
        port: Option<u16>,

        /// Include pages marked as drafts
        #[arg(long)]
        drafts: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    match cli.command {
        Command::Init {
            path,
            title,
            author,
        } => commands::init::run(path, title, author).await,
        Command::Validate { path } => commands::validate::run(path).await,
        Command::Build {
            path,
            output,
            drafts,
        } => commands::build::run(path, output, drafts).await,
        Command::Serve {
            path,
            port,
            drafts,
        } => commands::serve::run(path, port, drafts).await,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "quire", &mut io::stdout());
            Ok(())
        }
    }
}
