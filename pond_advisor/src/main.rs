//! Main entry point for the pond-advisor CLI.

use anyhow::Result;
use clap::Parser;
use pond_advisor::{
    advisor::{Advisor, RawReadings, Recommendation},
    assessment::assess,
    chat, cli, server,
    settings::Settings,
    telemetry,
    trainer::{self, TrainingOutputs},
};
use std::io;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::Cli::parse();

    // Load settings
    let mut settings = Settings::load_from(args.config.clone())?;

    // Initialize telemetry
    telemetry::init(&settings.logging)?;

    // Execute the requested command
    match args.command {
        cli::Commands::Train {
            episodes,
            seed,
            output,
        } => {
            if let Some(episodes) = episodes {
                settings.training.episodes = episodes;
            }
            if let Some(seed) = seed {
                settings.training.environment_seed = Some(seed);
                settings.training.exploration_seed = Some(seed.wrapping_add(1));
            }
            if let Some(output) = output {
                settings.policy.path = output;
            }
            settings.validate()?;

            let outputs = TrainingOutputs {
                policy: settings.policy.path.clone(),
                reward_history: Some(settings.diagnostics.reward_history.clone()),
            };
            let training = settings.training.clone();
            let outcome =
                tokio::task::spawn_blocking(move || trainer::train_and_save(&training, &outputs))
                    .await??;

            println!(
                "✅ Training complete. {} states learned; policy saved to {:?}.",
                outcome.table.len(),
                settings.policy.path
            );
            Ok(())
        }
        cli::Commands::Advise => {
            let advisor = Advisor::load(&settings.policy.path)?;
            let stdin = io::stdin();
            chat::run_consultation(&advisor, &mut stdin.lock(), &mut io::stdout())?;
            Ok(())
        }
        cli::Commands::Recommend {
            temperature,
            ph,
            dissolved_oxygen,
        } => {
            let advisor = Advisor::load(&settings.policy.path)?;
            let readings = RawReadings {
                temperature: &temperature,
                ph: &ph,
                dissolved_oxygen: &dissolved_oxygen,
            }
            .parse()?;

            match advisor.recommend(&readings) {
                Recommendation::Act { action, .. } => {
                    println!("✅ Recommended Action: {}", action.label());
                    println!("💡 Pond Health Score: {} / 3", assess(&readings).health_score);
                }
                Recommendation::UnknownCondition { .. } => {
                    println!("🤖 This condition is unknown. Try slightly changing values.");
                }
            }
            Ok(())
        }
        cli::Commands::Serve { addr } => {
            if let Some(addr) = addr {
                settings.server.host = addr.ip().to_string();
                settings.server.port = addr.port();
            }
            server::serve(&settings).await
        }
        cli::Commands::ShowConfig => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
    }
}
