use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Options shared by `copybuffer` and `copybufferkernel`.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(version, about)]
pub struct Args {
    /// Index of the platform to use
    #[arg(short, long, value_name = "INDEX", default_value_t = 0)]
    pub platform: usize,

    /// Index of the device to use
    #[arg(short, long, value_name = "INDEX", default_value_t = 0)]
    pub device: usize,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_zero() {
        let args = Args::try_parse_from(["copybuffer"]).unwrap();
        assert_eq!(args, Args::default());
    }

    #[test]
    fn short_and_long_flags() {
        let args = Args::try_parse_from(["copybuffer", "-p", "1", "--device", "3", "-vv"]).unwrap();
        assert_eq!(args.platform, 1);
        assert_eq!(args.device, 3);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn rejects_negative_and_positional() {
        assert!(Args::try_parse_from(["copybuffer", "-p", "-1"]).is_err());
        assert!(Args::try_parse_from(["copybuffer", "-d", "x"]).is_err());
        assert!(Args::try_parse_from(["copybuffer", "extra"]).is_err());
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(level(0), "warn");
        assert_eq!(level(2), "debug");
        assert_eq!(level(9), "trace");
    }

    #[test]
    fn command_is_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
