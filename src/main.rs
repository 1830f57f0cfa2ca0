use clap::Parser;
use input_synthesis::cli::commands::{cmd_context, cmd_parse_reply, cmd_prompt, cmd_run};
use input_synthesis::cli::config::{Cli, Commands, load_config, log_filter};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    // RUST_LOG wins over -v and the config file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, &config.logging.level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            target,
            serial,
            adb,
            output,
        } => {
            let all_passed = cmd_run(
                &target,
                serial.as_deref(),
                &adb,
                output.as_deref(),
                &config,
                cli.api_key.as_deref(),
                cli.model_type.as_deref(),
            )?;
            if !all_passed {
                std::process::exit(1);
            }
        }
        Commands::Context { screen } => cmd_context(&screen, &config)?,
        Commands::Prompt { screen } => cmd_prompt(&screen, &config)?,
        Commands::ParseReply { reply, ids } => {
            if !cmd_parse_reply(&reply, &ids)? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
