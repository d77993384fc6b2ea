//! Command-line surface: help, version, log routing, journaling, and
//! replay, parsed with `clap`'s derive API.

use std::path::PathBuf;

use clap::Parser;

/// `vhdlstuff [-h|--help] [-v|--version] [-s|--stderr] [--logfile <path>]
/// [--journal <path>] [--replay <path>]`. No positional arguments; an
/// unrecognized flag is a usage error, mapped by `main` to exit code 1.
#[derive(Debug, Parser)]
#[command(name = "vhdlstuff", about = "Stuffs for VHDL", disable_version_flag = true)]
pub struct Cli {
    /// Output all logs to stderr at maximum verbosity.
    #[arg(short, long)]
    pub stderr: bool,

    /// Append logs to this file at maximum verbosity.
    #[arg(long, value_name = "path")]
    pub logfile: Option<PathBuf>,

    /// Write every read/write to this journal file during a live session.
    #[arg(long, value_name = "path")]
    pub journal: Option<PathBuf>,

    /// Replay this journal file instead of reading stdin, then exit.
    #[arg(long, value_name = "path")]
    pub replay: Option<PathBuf>,

    /// Print version information and exit.
    ///
    /// `clap`'s built-in `--version` flag defaults to `-V`; this host wants
    /// lowercase `-v`, so it's wired by hand instead.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::SetTrue)]
    pub version: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_flags() {
        let cli = Cli::try_parse_from([
            "vhdlstuff",
            "--stderr",
            "--logfile",
            "/tmp/vhdlstuff.log",
            "--journal",
            "/tmp/session.log",
        ])
        .unwrap();
        assert!(cli.stderr);
        assert_eq!(cli.logfile, Some(PathBuf::from("/tmp/vhdlstuff.log")));
        assert_eq!(cli.journal, Some(PathBuf::from("/tmp/session.log")));
        assert!(cli.replay.is_none());
    }

    #[test]
    fn parses_short_version_flag() {
        let cli = Cli::try_parse_from(["vhdlstuff", "-v"]).unwrap();
        assert!(cli.version);
    }

    #[test]
    fn rejects_unknown_positional_arguments() {
        assert!(Cli::try_parse_from(["vhdlstuff", "extra-positional"]).is_err());
    }
}
