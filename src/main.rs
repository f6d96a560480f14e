//! Scout CLI entry point

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use anyhow::Result;

use scout::adapters::{cli::CliChannel, web::WebChannel, Channel, ChannelRegistry};
use scout::session::TurnRole;
use scout::ui;

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "🔭 Scout - chat with an assistant that can search the web")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update ~/.scout/config.json
    Onboard,

    /// Serve the browser chat UI
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat in the terminal
    Chat {
        /// Message to send; starts an interactive session when omitted
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show Scout status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Setup Global Ctrl+C handler
    let exit_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let r = exit_flag.clone();

    ctrlc::set_handler(move || {
        if r.load(std::sync::atomic::Ordering::SeqCst) {
            println!("\n👋 Bye!");
            std::process::exit(0);
        } else {
            println!("\n⚠️  Press Ctrl+C again to exit");
            r.store(true, std::sync::atomic::Ordering::SeqCst);

            // Reset flag after 3 seconds
            let r2 = r.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_secs(3));
                r2.store(false, std::sync::atomic::Ordering::SeqCst);
            });
        }
    }).ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            scout::config::onboard()?;
        }

        Commands::Serve { host, port } => {
            let mut config = load_config()?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let channel = WebChannel::new(&config);
            ui::print_scout_header(&config.model, &config.provider);
            ui::print_success(&format!("Open http://{} in your browser", channel.addr()));
            channel.start().await?;
        }

        Commands::Chat { message } => {
            let config = load_config()?;
            config.validate()?;
            let channel = CliChannel::new(&config);

            if let Some(msg) = message {
                // Single message mode
                let reply = channel.run_once(&msg).await?;
                ui::print_turn(TurnRole::Assistant, &reply.text);
            } else {
                channel.start().await?;
            }
        }

        Commands::Status => {
            let config = load_config()?;
            ui::print_scout_header(&config.model, &config.provider);
            println!("Config: {}", scout::config::config_path().display());
            println!("Reasoner: {:?} ({} rounds max)", config.agent.kind, config.agent.max_iterations);
            println!("Web UI: http://{}", config.server.addr());

            let tools = scout::tools::ToolRunner::new_with_defaults(&config.tools);
            println!("Tools: {}", tools.tool_names().join(", "));

            println!("Channels:");
            for name in ChannelRegistry::available() {
                println!("  {:<4} {}", name, ChannelRegistry::description(name));
            }
            println!("API key: entered per session, never stored");
        }
    }

    Ok(())
}

fn load_config() -> Result<scout::config::Config> {
    if !scout::config::config_path().exists() {
        ui::print_warning("No config file found, using defaults. Run 'scout onboard' to customize.");
    }
    Ok(scout::config::load_or_default()?)
}
