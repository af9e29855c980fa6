use anyhow::Result;
use clap::Parser;

use crate::pointer::{PointerCliArgs, PointerConfig};

/// Control the desktop pointer with hand gestures seen by a webcam.
#[derive(Debug, Parser)]
#[command(name = "gesture-pointer", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub pointer: PointerCliArgs,
}

/// Parse process arguments into a validated configuration.
pub fn parse_config<I, T>(args: I) -> Result<PointerConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    PointerConfig::try_from(cli.pointer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_and_version_are_wired() {
        let err = Cli::try_parse_from(["gesture-pointer", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let err = Cli::try_parse_from(["gesture-pointer", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn parses_into_config() {
        let config = parse_config(["gesture-pointer", "--injector", "log", "--track-on-start"])
            .expect("valid arguments");
        assert!(config.track_on_start);
        assert_eq!(config.injector, crate::pointer::InjectorKind::Log);
    }
}
