//! `relsim`: drive a relationship-simulation server from the terminal.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use relsim_client::observability::init_observability;
use relsim_client::prelude::*;
use relsim_client::render::describe_session;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "relsim", version, about = "Relationship simulation dashboard client")]
struct Cli {
    /// Base URL of the simulation server.
    #[arg(long, env = "RELSIM_BASE_URL", default_value = relsim_client::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Timeout in seconds for non-streaming requests.
    #[arg(long, env = "RELSIM_REQUEST_TIMEOUT_SECS", default_value_t = relsim_client::config::DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the simulation the server currently holds.
    Status,
    /// List available agents.
    Agents,
    /// List available scenarios.
    Scenarios,
    /// Start a new simulation.
    Start {
        #[arg(long)]
        agent1: String,
        #[arg(long)]
        agent2: String,
        #[arg(long)]
        scenario: String,
        #[arg(long, default_value_t = 5)]
        interactions: u32,
    },
    /// Run the active simulation and stream its output.
    Run {
        #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
        mode: ModeArg,
        /// Interactions per scene; defaults to the server session's value.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        interactions: Option<u32>,
    },
    /// Save the active simulation.
    Save { filename: String },
    /// Load a saved simulation.
    Load { filename: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Auto,
    Scene,
}

impl From<ModeArg> for RunMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Auto => RunMode::Auto,
            ModeArg::Scene => RunMode::Scene,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_observability("warn");
    let cli = Cli::parse();

    let config = ClientConfig::new(cli.base_url)
        .request_timeout(Duration::from_secs(cli.timeout_secs));
    let controller = match SessionController::http(config) {
        Ok(controller) => controller,
        Err(err) => {
            notify(&Notification::from(&err));
            return ExitCode::FAILURE;
        }
    };

    match execute(&controller, cli.command).await {
        Ok(notification) => {
            if let Some(notification) = notification {
                notify(&notification);
            }
            ExitCode::SUCCESS
        }
        Err(notification) => {
            notify(&notification);
            ExitCode::FAILURE
        }
    }
}

async fn execute(
    controller: &SessionController,
    command: Command,
) -> Result<Option<Notification>, Notification> {
    match command {
        Command::Status => {
            let status = controller
                .refresh_status()
                .await
                .map_err(|e| Notification::failure("Error checking simulation status", &e))?;
            match controller.session() {
                Some(session) if status.has_simulation => {
                    print_session(&session);
                    if status.is_running {
                        println!("(running)");
                    }
                }
                _ => println!("No active simulation."),
            }
            Ok(None)
        }
        Command::Agents => {
            let agents = controller
                .agents()
                .await
                .map_err(|e| Notification::failure("Error listing agents", &e))?;
            for agent in agents {
                println!("{:<24} {}", agent.id, agent.name);
            }
            Ok(None)
        }
        Command::Scenarios => {
            let scenarios = controller
                .scenarios()
                .await
                .map_err(|e| Notification::failure("Error listing scenarios", &e))?;
            for scenario in scenarios {
                println!("{:<24} {}", scenario.id, scenario.name);
            }
            Ok(None)
        }
        Command::Start {
            agent1,
            agent2,
            scenario,
            interactions,
        } => {
            let session = controller
                .start(StartRequest::new(agent1, agent2, scenario, interactions))
                .await
                .map_err(|e| Notification::failure("Error starting simulation", &e))?;
            print_session(&session);
            Ok(Some(Notification::success("Simulation started successfully!")))
        }
        Command::Run { mode, interactions } => {
            // The server session supplies agent labels and the default interaction count.
            if let Err(err) = controller.refresh_status().await {
                debug!(error = %err, "status check before run failed");
            }
            let mut run = controller
                .run_with_interactions(mode.into(), interactions)
                .await
                .map_err(|e| Notification::failure("Error running simulation", &e))?;
            debug!(run_id = %run.run_id(), "run stream opened");
            while let Some(next) = run.next_result().await {
                let result =
                    next.map_err(|e| Notification::failure("Error running simulation", &e))?;
                println!("{result}");
            }
            Ok(Some(Notification::success("Simulation completed successfully!")))
        }
        Command::Save { filename } => {
            controller
                .save(&filename)
                .await
                .map_err(|e| Notification::failure("Error saving simulation", &e))?;
            Ok(Some(Notification::success("Simulation saved successfully!")))
        }
        Command::Load { filename } => {
            let loaded = controller
                .load(&filename)
                .await
                .map_err(|e| Notification::failure("Error loading simulation", &e))?;
            if let Some(session) = loaded {
                print_session(&session);
            }
            Ok(Some(Notification::success("Simulation loaded successfully!")))
        }
    }
}

fn print_session(session: &SimulationSession) {
    println!("Current Simulation");
    for (label, value) in describe_session(session) {
        println!("  {label}: {value}");
    }
}

fn notify(notification: &Notification) {
    eprintln!("{notification}");
}
