use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mosaic::Quality;

#[derive(Parser, Debug)]
#[command(
    name = "pixelmosaic",
    author,
    version,
    about = "Animated pixel-mosaic background",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration file to load instead of the default location.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Backing-store density: `auto`, `0.75`, `1`, `1.5` or `2`.
    #[arg(long, value_name = "QUALITY", value_parser = parse_quality)]
    pub quality: Option<Quality>,

    /// Start with the animation frozen.
    #[arg(long)]
    pub paused: bool,

    /// Do not reload the configuration file when it changes.
    #[arg(long)]
    pub no_watch: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a single frame with the software canvas and write it as PNG.
    Export(ExportArgs),
    /// Inspect configuration paths and values.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Destination PNG file.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Animation time to render, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0, value_parser = parse_seconds)]
    pub time: f64,

    /// Image size in logical pixels.
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        default_value = "960x540",
        value_parser = parse_surface_size
    )]
    pub size: (u32, u32),

    /// Device pixel ratio to emulate; combined with the configured quality.
    #[arg(long, value_name = "RATIO", default_value_t = 1.0, value_parser = parse_scale)]
    pub scale: f64,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file that would be loaded.
    Where,
    /// Print the effective configuration as TOML.
    Dump,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

pub fn parse_quality(value: &str) -> Result<Quality, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("quality must not be empty".to_string());
    }
    trimmed.parse()
}

pub fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid time '{value}'; expected seconds"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("time must be a non-negative number of seconds".to_string());
    }
    Ok(seconds)
}

pub fn parse_scale(value: &str) -> Result<f64, String> {
    let scale: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid scale '{value}'"))?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err("scale must be greater than zero".to_string());
    }
    Ok(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_accepts_common_separators() {
        assert_eq!(parse_surface_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_surface_size(" 64 X 40 "), Ok((64, 40)));
        assert_eq!(parse_surface_size("10×20"), Ok((10, 20)));
    }

    #[test]
    fn surface_size_rejects_bad_input() {
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x720").is_err());
        assert!(parse_surface_size("wide x tall").is_err());
    }

    #[test]
    fn quality_parser_uses_supported_steps() {
        assert_eq!(parse_quality("auto"), Ok(Quality::Auto));
        assert_eq!(parse_quality("1.5"), Ok(Quality::Fixed(1.5)));
        assert!(parse_quality("3").is_err());
        assert!(parse_quality("").is_err());
    }

    #[test]
    fn seconds_and_scale_must_be_positive() {
        assert_eq!(parse_seconds("2.5"), Ok(2.5));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("NaN").is_err());
        assert_eq!(parse_scale("2"), Ok(2.0));
        assert!(parse_scale("0").is_err());
    }

    #[test]
    fn export_defaults() {
        let cli = Cli::try_parse_from(["pixelmosaic", "export", "out.png"]).expect("parse");
        let Some(Command::Export(args)) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(args.size, (960, 540));
        assert_eq!(args.scale, 1.0);
        assert_eq!(args.time, 0.0);
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["pixelmosaic", "config", "dump", "--config", "a.toml"])
            .expect("parse");
        assert_eq!(cli.run.config, Some(PathBuf::from("a.toml")));
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand {
                action: ConfigAction::Dump
            }))
        ));
    }
}
