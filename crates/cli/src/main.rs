use clap::{Parser, Subcommand};

mod down;
mod providers;
mod spinner;
mod up;

#[derive(Parser, Debug)]
#[command(name = "cloudstrap")]
#[command(about = "Provision cloud nodes and bootstrap them against a configuration-management server")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a group of nodes and bootstrap them
    Up {
        /// Compute provider to provision with
        #[arg(short, long, default_value = "google-compute-engine")]
        provider: String,
        /// Role applied to the new nodes
        #[arg(short, long, default_value = "load-balancer")]
        role: String,
        /// Number of nodes to create
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },
    /// Destroy the demo node groups and clean up their records
    Down {
        /// Compute provider the nodes were created with
        #[arg(short, long, default_value = "google-compute-engine")]
        provider: String,
        /// Name prefix shared by the demo groups and their records
        #[arg(long, default_value = "demo")]
        prefix: String,
    },
}

fn main() {
    let args = Args::parse();

    match args.command {
        Commands::Up {
            provider,
            role,
            count,
        } => {
            if let Err(e) = up::handle_up(provider, role, count) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Down { provider, prefix } => {
            if let Err(e) = down::handle_down(provider, prefix) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
