use std::path::PathBuf;
use std::time::Duration;

use log::info;
use structopt::StructOpt;
use thiserror::Error;

use crate::config::ConfigError;
use crate::io::bus::{BusError, RegisterBus};
use crate::pusher::{target, Interrupted, PowerPusher, PowerSession, PushError, Waiter};

#[derive(Debug, StructOpt)]
#[structopt(name = "power_pusher", about = "Presses power buttons through an MCP23017 I/O expander")]
pub struct Opt {
    /// Config file, defaults to power_pusher.toml in the working directory
    #[structopt(long, parse(from_os_str))]
    pub config: Option<PathBuf>,
    /// Simulate the expander in memory instead of opening the I2C bus
    #[structopt(long)]
    pub dummy: bool,
    /// Don't set up pin directions before pressing
    #[structopt(long)]
    pub no_setup: bool,
    #[structopt(long)]
    pub verbose: bool,
    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, StructOpt)]
pub enum Command {
    /// Hold the power button down for an exact time
    PowerHold {
        /// Index for which to hold power
        #[structopt(long, allow_hyphen_values = true)]
        index: i64,
        /// How many seconds to "hold the power button down"
        #[structopt(long, parse(try_from_str = parse_hold_seconds))]
        hold_seconds: Duration,
    },
    /// Briefly press the power button
    PowerOn {
        /// Index for which to hold power
        #[structopt(long, allow_hyphen_values = true)]
        index: i64,
        /// How many seconds to "hold the power button down" [default: 0.5]
        #[structopt(long, parse(try_from_str = parse_hold_seconds))]
        hold_seconds: Option<Duration>,
    },
    /// Hold the power button long enough to force the target off
    PowerOff {
        /// Index for which to hold power
        #[structopt(long, allow_hyphen_values = true)]
        index: i64,
        /// How many seconds to "hold the power button down" [default: 5]
        #[structopt(long, parse(try_from_str = parse_hold_seconds))]
        hold_seconds: Option<Duration>,
    },
    /// Only configure the expander's pins
    SetupPins,
}

pub fn parse_hold_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|err| format!("{:?} is not a number of seconds: {}", s, err))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|err| format!("Hold must be a non-negative number of seconds, got {}: {}", s, err))
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to open bus: {0}")]
    Bus(#[from] BusError),
    #[error("{0}")]
    Push(#[from] PushError),
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Push(err) if err.is_critical() => 2,
            _ => 1,
        }
    }
}

/// Runs one subcommand against the expander.
///
/// Pin setup, when asked for, happens first so that the outputs are known to be driven and low
/// before the press. A bad index is reported before anything is written, setup included.
pub fn run_command<B: RegisterBus>(
    pusher: &PowerPusher<B>,
    command: &Command,
    setup_pins: bool,
    waiter: &mut dyn Waiter,
) -> Result<(), PushError> {
    match command {
        Command::PowerHold { index, .. } | Command::PowerOn { index, .. } | Command::PowerOff { index, .. } => {
            target::resolve(*index)?;
        }
        Command::SetupPins => {}
    }
    if setup_pins || *command == Command::SetupPins {
        pusher.setup_pins()?;
    }
    let mut session = pusher.session().with_waiter(|hold: Duration| -> Result<(), Interrupted> { waiter.wait(hold) });
    let index = match command {
        Command::SetupPins => return Ok(()),
        Command::PowerHold { index, hold_seconds } => {
            session.power_hold(*index, *hold_seconds)?;
            index
        }
        Command::PowerOn { index, hold_seconds: Some(hold) } => {
            session.power_on_for(*index, *hold)?;
            index
        }
        Command::PowerOn { index, hold_seconds: None } => {
            session.power_on(*index)?;
            index
        }
        Command::PowerOff { index, hold_seconds: Some(hold) } => {
            session.power_off_for(*index, *hold)?;
            index
        }
        Command::PowerOff { index, hold_seconds: None } => {
            session.power_off(*index)?;
            index
        }
    };
    session.close();
    info!("Released power button of index {}", index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::bus::BusOp;
    use crate::io::bus::dummy::Dummy;
    use crate::io::dummy::DummyIO;
    use crate::mcp23017::Register;
    use crate::pusher::HoldDurations;

    fn parse(args: &[&str]) -> Result<Opt, structopt::clap::Error> {
        Opt::from_iter_safe(std::iter::once("power_pusher").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_subcommands() {
        let opt = parse(&["power-hold", "--index", "3", "--hold-seconds", "1.5"]).unwrap();
        assert_eq!(opt.command, Command::PowerHold { index: 3, hold_seconds: Duration::from_millis(1500) });
        assert!(!opt.dummy);

        let opt = parse(&["--dummy", "--no-setup", "power-on", "--index", "4"]).unwrap();
        assert_eq!(opt.command, Command::PowerOn { index: 4, hold_seconds: None });
        assert!(opt.dummy);
        assert!(opt.no_setup);

        let opt = parse(&["power-off", "--index", "-1", "--hold-seconds", "2"]).unwrap();
        assert_eq!(opt.command, Command::PowerOff { index: -1, hold_seconds: Some(Duration::from_secs(2)) });

        let opt = parse(&["setup-pins"]).unwrap();
        assert_eq!(opt.command, Command::SetupPins);
    }

    #[test]
    fn test_parse_rejects() {
        assert!(parse(&["power-hold", "--index", "3"]).is_err(), "Hold seconds are required");
        assert!(parse(&["power-on"]).is_err(), "Index is required");
        assert!(parse(&["power-on", "--index", "3", "--hold-seconds", "-0.5"]).is_err());
        assert!(parse(&["power-on", "--index", "3", "--hold-seconds", "soon"]).is_err());
        assert!(parse(&["power-on", "--index", "three"]).is_err());
    }

    #[test]
    fn test_parse_hold_seconds() {
        assert_eq!(parse_hold_seconds("0.5"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_hold_seconds("0"), Ok(Duration::ZERO));
        assert!(parse_hold_seconds("NaN").is_err());
        assert!(parse_hold_seconds("inf").is_err());
        assert!(parse_hold_seconds("-1").is_err());
        assert!(parse_hold_seconds("1e20").is_err(), "Too long for a Duration");
        assert!(parse(&["power-hold", "--index", "3", "--hold-seconds", "1e20"]).is_err());
    }

    fn run(command: Command, setup_pins: bool) -> (Result<(), PushError>, Vec<Duration>, Dummy) {
        let (bus, _handle) = Dummy::create(&false);
        let holds = HoldDurations { power_on: Duration::from_millis(700), power_off: Duration::from_secs(9) };
        let pusher = PowerPusher::with_default_address(bus).with_holds(holds);
        let mut seen = Vec::new();
        let result = {
            let mut waiter = |hold: Duration| -> Result<(), Interrupted> {
                seen.push(hold);
                Ok(())
            };
            run_command(&pusher, &command, setup_pins, &mut waiter)
        };
        (result, seen, pusher.into_bus())
    }

    #[test]
    fn test_run_uses_configured_defaults() {
        let (result, seen, _) = run(Command::PowerOn { index: 3, hold_seconds: None }, false);
        result.unwrap();
        assert_eq!(seen, vec![Duration::from_millis(700)]);

        let (result, seen, _) = run(Command::PowerOff { index: 3, hold_seconds: None }, false);
        result.unwrap();
        assert_eq!(seen, vec![Duration::from_secs(9)]);

        let (result, seen, _) = run(Command::PowerOff { index: 3, hold_seconds: Some(Duration::from_secs(1)) }, false);
        result.unwrap();
        assert_eq!(seen, vec![Duration::from_secs(1)]);
    }

    #[test]
    fn test_run_sets_up_pins_first() {
        let (result, _, bus) = run(Command::PowerHold { index: 4, hold_seconds: Duration::ZERO }, true);
        result.unwrap();
        assert_eq!(bus.ops()[..3], [
            BusOp::Write { address: 0x20, register: Register::OLATA, value: 0x00 },
            BusOp::Write { address: 0x20, register: Register::IODIRA, value: 0xF0 },
            BusOp::Write { address: 0x20, register: Register::IODIRB, value: 0xFF },
        ]);
        assert_eq!(bus.writes_to(Register::OLATA), vec![0x00, 0x08, 0x00]);
    }

    #[test]
    fn test_run_setup_only() {
        let (result, seen, bus) = run(Command::SetupPins, false);
        result.unwrap();
        assert!(seen.is_empty());
        assert_eq!(bus.ops().len(), 3);
    }

    #[test]
    fn test_run_reports_bad_index() {
        let (result, _, bus) = run(Command::PowerOn { index: 0, hold_seconds: None }, false);
        let err = CliError::from(result.unwrap_err());
        assert_eq!(err.exit_code(), 1);
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn test_run_bad_index_skips_setup() {
        let commands = [
            Command::PowerOn { index: 7, hold_seconds: None },
            Command::PowerOff { index: -1, hold_seconds: None },
            Command::PowerHold { index: 2, hold_seconds: Duration::ZERO },
        ];
        for command in commands {
            let (result, seen, bus) = run(command, true);
            assert!(matches!(
                result,
                Err(PushError::IndexOutOfRange(_)) | Err(PushError::UnsupportedIndex(_))
            ), "Got {:?}", result);
            assert!(seen.is_empty());
            assert!(bus.ops().is_empty(), "Pins were touched: {:?}", bus.ops());
        }
    }
}
