//! Bpcom command line interface.

use std::process;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
    ArgMatches, SubCommand,
};
use console::style;
use hexplay::HexViewBuilder;
use log::{debug, trace, warn, LevelFilter};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use simplelog::*;

use bpcom::{self as bp, Addr, I2cMaster, Session, SerialTransport};

fn main() {
    println!("[BP] bpcom v{}", crate_version!());

    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Bpcom puts a Bus Pirate in binary mode and drives its I2C bus. \
            The probe can be in any state when bpcom starts: it is first \
            synchronized into binary bit-bang mode, then switched to I2C \
            mode for the requested command, and finally sent back to its \
            text terminal.\n\
            \n\
            Register reads and writes use the probe's bulk write-then-read \
            command by default, which splits a register transaction into a \
            write and a separate read on the bus. Use --strict when another \
            master may be on the bus or when the device needs a repeated \
            start.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .setting(SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("DEVICE_TTY")
                .help("the tty device the probe is on")
                .long_help(
                    "the tty device the probe is on; when not given, the \
                     available serial ports are offered for selection.",
                )
                .short("-t")
                .long("--tty")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .short("-b")
                .long("--baud-rate")
                .takes_value(true)
                .default_value("115200")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("STRICT")
                .help("use one atomic bus transaction per register access")
                .long("--strict"),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .subcommand(SubCommand::with_name("probe").about("enter and leave binary mode"))
        .subcommand(SubCommand::with_name("scan").about("list the devices on the I2C bus"))
        .subcommand(
            SubCommand::with_name("read")
                .about("read registers of an I2C device")
                .arg(Arg::with_name("ADDR").help("7-bit device address").required(true))
                .arg(Arg::with_name("REG").help("register address").required(true))
                .arg(
                    Arg::with_name("COUNT")
                        .help("number of bytes to read")
                        .default_value("1"),
                ),
        )
        .subcommand(
            SubCommand::with_name("write")
                .about("write registers of an I2C device")
                .arg(Arg::with_name("ADDR").help("7-bit device address").required(true))
                .arg(Arg::with_name("REG").help("register address").required(true))
                .arg(
                    Arg::with_name("BYTES")
                        .help("bytes to write")
                        .multiple(true)
                        .required(true),
                ),
        )
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'bpcom -v -v -v' or 'bpcom -vvv' vs 'bpcom -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if TermLogger::init(log_level, Config::default(), TerminalMode::Mixed).is_err() {
        eprintln!("[BP] could not initialize the logger");
    }

    trace!("{:#?}", matches);

    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32).unwrap_or_else(|_| {
        println!(
            "{}: `{}` needs to be a numeric value",
            style("error").red(),
            style("baud-rate").cyan()
        );
        process::exit(-1);
    });

    let path = match matches.value_of("DEVICE_TTY") {
        Some(path) => path.to_owned(),
        None => select_port().unwrap_or_else(|| {
            println!("[BP] ❌ no serial port selected");
            process::exit(-1);
        }),
    };

    let settings = bp::SettingsBuilder::new()
        .path(path)
        .baud_rate(baud_rate)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .flow_control(FlowControl::None)
        .finalize();

    let exit_code = match run(&settings, &matches) {
        Ok(()) => 0,
        Err(err) => {
            println!("{} {}", style("[BP] 💥").red(), style(&err).red());
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                println!("     caused by: {}", cause);
                source = cause.source();
            }
            1
        }
    };
    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}

fn run(settings: &bp::Settings, matches: &ArgMatches) -> bp::Result<()> {
    let transport = SerialTransport::open(settings)?;
    let session = Session::with_policy(transport, settings.handshake);
    session.open()?;

    let result = match matches.subcommand() {
        ("probe", _) => Ok(()),
        ("scan", _) => scan(&session),
        ("read", Some(sub)) => read(&session, sub, matches.is_present("STRICT")),
        ("write", Some(sub)) => write(&session, sub, matches.is_present("STRICT")),
        _ => Ok(()),
    };

    // Always try to give the probe back its terminal.
    match session.close() {
        Ok(()) => result,
        Err(close_err) => match result {
            Ok(()) => Err(close_err),
            Err(err) => {
                warn!("could not close the session: {}", close_err);
                Err(err)
            }
        },
    }
}

fn scan(session: &Session<SerialTransport>) -> bp::Result<()> {
    let i2c = session.enter_i2c_mode()?;
    let found = i2c.scan(0x08..=0x77)?;
    if found.is_empty() {
        println!("[BP] no device answered");
    }
    for addr in found {
        println!("[BP] 👍 device at {}", style(format!("{:#04x}", addr)).green());
    }
    Ok(())
}

fn read(session: &Session<SerialTransport>, sub: &ArgMatches, strict: bool) -> bp::Result<()> {
    let addr = parse_byte(sub, "ADDR");
    let reg = parse_byte(sub, "REG");
    let count = value_t!(sub.value_of("COUNT"), usize).unwrap_or_else(|e| e.exit());

    let mut data = vec![0u8; count];
    transact(session, strict, addr, reg, &[], &mut data)?;

    let view = HexViewBuilder::new(&data)
        .address_offset(usize::from(reg))
        .row_width(16)
        .finish();
    println!("{}", view);
    Ok(())
}

fn write(session: &Session<SerialTransport>, sub: &ArgMatches, strict: bool) -> bp::Result<()> {
    let addr = parse_byte(sub, "ADDR");
    let reg = parse_byte(sub, "REG");
    let bytes: Vec<u8> = sub
        .values_of("BYTES")
        .into_iter()
        .flatten()
        .map(|value| parse_number(value, "BYTES"))
        .collect();

    let (written, _) = transact(session, strict, addr, reg, &bytes, &mut [])?;
    println!("[BP] 👍 {} byte(s) written", written);
    Ok(())
}

fn transact(
    session: &Session<SerialTransport>,
    strict: bool,
    addr: u8,
    reg: u8,
    w: &[u8],
    r: &mut [u8],
) -> bp::Result<(usize, usize)> {
    let addr = Addr::SevenBit(addr);
    if strict {
        session.enter_i2c_mode()?.transact_8x8(addr, reg, w, r)
    } else {
        session
            .enter_non_strict_i2c_mode()?
            .transact_8x8(addr, reg, w, r)
    }
}

fn parse_byte(matches: &ArgMatches, name: &str) -> u8 {
    // Required arguments are always present.
    parse_number(matches.value_of(name).unwrap_or_default(), name)
}

/// Parse a byte given in decimal or in hex with a `0x` prefix.
fn parse_number(value: &str, name: &str) -> u8 {
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    parsed.unwrap_or_else(|_| {
        println!(
            "{}: `{}` needs to be a byte value",
            style("error").red(),
            style(name).cyan()
        );
        println!(
            "   {} `{}` is not a valid value",
            style("-->").cyan(),
            style(value).on_red()
        );
        process::exit(-1);
    })
}

/// Let the user pick one of the serial ports found on the system.
fn select_port() -> Option<String> {
    use console::Term;
    use dialoguer::{theme::ColorfulTheme, Select};

    let ports = bp::available_ports();
    if ports.is_empty() {
        println!("[BP] ⌛ no serial port found, is the probe plugged?");
        return None;
    }

    let term = Term::buffered_stderr();
    let theme = ColorfulTheme::default();

    let mut select = Select::with_theme(&theme);
    select.with_prompt("Select the port the probe is on");
    for item in &ports {
        select.item(item);
    }

    let selection = select.default(0).interact_on_opt(&term).ok()??;
    ports
        .get(selection)
        .and_then(|port| port.split(':').next())
        .map(String::from)
}
