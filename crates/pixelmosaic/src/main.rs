mod cli;
mod export;
mod paths;
mod run;
mod settings;

use anyhow::Result;
use cli::{Command, ConfigAction};
use settings::ConfigSource;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Export(args)) => {
            let source = ConfigSource::resolve(cli.run.config.as_deref())?;
            export::run_export(&source, &args)
        }
        Some(Command::Config(config_cmd)) => {
            let source = ConfigSource::resolve(cli.run.config.as_deref())?;
            handle_config_command(&source, config_cmd.action)
        }
        None => run::run(cli.run),
    }
}

fn handle_config_command(source: &ConfigSource, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Where => {
            let status = if source.exists() { "present" } else { "missing" };
            println!("{} ({status})", source.path.display());
            Ok(())
        }
        ConfigAction::Dump => {
            let file = source.load()?;
            print!("{}", file.to_toml_string()?);
            Ok(())
        }
    }
}
