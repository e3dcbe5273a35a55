use argh::FromArgs;

#[derive(FromArgs)]
/// battery charge level max utility for Apple silicon Macs
pub struct ChargeLimiterArgs {
    /// log controller calls to stderr
    #[argh(switch, short = 'v')]
    pub verbose: bool,

    /// print the version and exit
    #[argh(switch)]
    pub version: bool,

    #[argh(subcommand)]
    pub command: Option<Command>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
pub enum Command {
    Read(ReadArgs),
    Write(WriteArgs),
    Persist(PersistArgs),
    Unpersist(UnpersistArgs),
}

#[derive(FromArgs)]
/// read the charge limit
#[argh(subcommand, name = "read")]
pub struct ReadArgs {
    /// print the raw register byte instead of the percentage
    #[argh(switch)]
    pub raw: bool,
}

#[derive(FromArgs)]
/// write a charge limit
#[argh(subcommand, name = "write")]
pub struct WriteArgs {
    /// the value to set (80 or 100)
    #[argh(positional)]
    pub value: i64,
}

#[derive(FromArgs)]
/// persist the current limit on reboot
#[argh(subcommand, name = "persist")]
pub struct PersistArgs {}

#[derive(FromArgs)]
/// stop persisting the limit on reboot
#[argh(subcommand, name = "unpersist")]
pub struct UnpersistArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ChargeLimiterArgs, argh::EarlyExit> {
        ChargeLimiterArgs::from_args(&["charge_limiter"], args)
    }

    fn parse_command(args: &[&str]) -> Result<Command, argh::EarlyExit> {
        parse(args).map(|parsed| parsed.command.expect("subcommand"))
    }

    #[test]
    fn parses_subcommands() {
        assert!(matches!(
            parse_command(&["read"]).unwrap(),
            Command::Read(ReadArgs { raw: false })
        ));
        assert!(matches!(
            parse_command(&["read", "--raw"]).unwrap(),
            Command::Read(ReadArgs { raw: true })
        ));
        assert!(matches!(
            parse_command(&["write", "80"]).unwrap(),
            Command::Write(WriteArgs { value: 80 })
        ));
        assert!(matches!(parse_command(&["persist"]).unwrap(), Command::Persist(_)));
        assert!(matches!(parse_command(&["unpersist"]).unwrap(), Command::Unpersist(_)));
        assert!(parse(&["-v", "read"]).unwrap().verbose);
    }

    #[test]
    fn out_of_range_value_still_parses() {
        // rejected later as InvalidLimit
        assert!(matches!(
            parse_command(&["write", "150"]).unwrap(),
            Command::Write(WriteArgs { value: 150 })
        ));
        assert!(parse_command(&["write"]).is_err());
        assert!(parse_command(&["write", "eighty"]).is_err());
    }

    #[test]
    fn version_needs_no_subcommand() {
        let parsed = parse(&["--version"]).unwrap();
        assert!(parsed.version);
        assert!(parsed.command.is_none());
    }
}
