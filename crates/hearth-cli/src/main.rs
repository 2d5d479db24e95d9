//! hearth: run and inspect gateway applications.
//!
//! ```text
//! hearth init --handler hearth.hello
//! hearth serve --config hearth.toml
//! hearth environ --target '/app/users?page=1' -H 'Accept: text/html'
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "hearth",
    about = "Hearth: gateway for mounted web applications",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the configured application over HTTP.
    Serve {
        /// Path to hearth.toml.
        #[arg(short, long, default_value = "hearth.toml")]
        config: PathBuf,
        /// Override [server].bind.
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Write a hearth.toml scaffold.
    Init {
        /// Directory to write into.
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
        /// Application to mount.
        #[arg(long, default_value = hearth_gateway::builtin::HELLO)]
        handler: String,
        /// Overwrite an existing hearth.toml.
        #[arg(long)]
        force: bool,
    },
    /// Print the environment a request would produce.
    Environ {
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Request target, e.g. `/app/users?page=1`.
        #[arg(short, long, default_value = "/")]
        target: String,
        /// Mount point; the rest of the path becomes PATH_INFO.
        #[arg(long, default_value = "")]
        script_name: String,
        /// Request header as `Name: value`. Repeatable.
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// Request body.
        #[arg(long)]
        body: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// List the built-in applications.
    Apps,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,hearth=debug"))?,
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => commands::serve::serve(&config, bind.as_deref()),
        Commands::Init {
            path,
            handler,
            force,
        } => {
            let output = commands::init::init(&path, &handler, force)?;
            println!("✓ Generated {}", output.display());
            Ok(())
        }
        Commands::Environ {
            method,
            target,
            script_name,
            headers,
            body,
            format,
        } => {
            let request = commands::environ::build_request(
                &method,
                &target,
                &script_name,
                &headers,
                body.as_deref(),
            )?;
            println!("{}", commands::environ::render(request, &format)?);
            Ok(())
        }
        Commands::Apps => {
            for name in hearth_gateway::AppRegistry::with_builtins().names() {
                println!("{name}");
            }
            Ok(())
        }
    }
}
