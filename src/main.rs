use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info, warn};
use structopt::StructOpt;

use power_pusher::cli::{self, CliError, Opt};
use power_pusher::config::{Config, CONFIG_FILE};
use power_pusher::io::bus::dummy::Dummy;
use power_pusher::io::bus::i2c::open_i2c;
use power_pusher::io::bus::{BusError, RegisterBus};
use power_pusher::io::dummy::DummyIO;
use power_pusher::logging;
use power_pusher::pusher::{InterruptibleSleep, PowerPusher};

fn main() {
    let opt = Opt::from_args();

    let logging_handle = match logging::init_logging(opt.verbose) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("{}", CliError::Logging(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run(opt) {
        match &err {
            CliError::Push(push_err) if push_err.is_critical() => {
                error!("{}. The button may still be held, check the target by hand!", err)
            }
            _ => error!("{}", err),
        }
        // Flushes the non-blocking writer before exiting.
        drop(logging_handle);
        std::process::exit(err.exit_code());
    }
}

fn run(opt: Opt) -> Result<(), CliError> {
    let config_path = opt.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = Config::load(&config_path)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        let result = ctrlc::set_handler(move || {
            info!("Received termination signal, releasing.");
            stop.store(true, Ordering::Relaxed);
        });
        if let Err(err) = result {
            warn!("Failed to attach termination handler: {}", err);
        }
    }

    let bus = open_bus(&opt, &config)?;
    let pusher = PowerPusher::new(bus, config.get_bus().get_address())
        .with_holds(config.get_holds().to_hold_durations());

    let setup_pins = !opt.no_setup && config.get_pins().setup_before_hold();
    let mut waiter = InterruptibleSleep::new(stop);
    cli::run_command(&pusher, &opt.command, setup_pins, &mut waiter)?;
    Ok(())
}

fn open_bus(opt: &Opt, config: &Config) -> Result<Box<dyn RegisterBus>, BusError> {
    if opt.dummy {
        info!("Using dummy expander, nothing will be pressed.");
        let (dummy, _handle) = Dummy::create(&true);
        return Ok(Box::new(dummy));
    }
    let device = config.get_bus().get_device();
    info!("Opening {} for expander at {:#04x}", device, config.get_bus().get_address());
    Ok(Box::new(open_i2c(device)?))
}
