use std::io::{self, Write};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use log::{debug, LevelFilter};

mod config;
mod dispatch;
mod error;
mod mac;
mod resolve;
mod wol;

use config::Config;
use dispatch::Outcome;
use error::Error;

const EXAMPLES: &str = "\
Examples:
  wol-ip -i 192.168.1.1 -p 9
  wol-ip -m 00-0c-29-14-98-f3";

/// Sends a Wake-on-LAN packet to a specified IP address or MAC address.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, after_help = EXAMPLES)]
struct Args {
    /// Destination IP address, used to look up the MAC address.
    #[arg(short, long, value_name = "ADDRESS")]
    ip: Option<String>,

    /// Destination MAC address (format: 00-00-00-00-00-00).
    #[arg(short, long, value_name = "ADDRESS")]
    mac: Option<String>,

    /// Destination UDP port.
    #[arg(short, long, default_value_t = 9, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Print verbose details during execution.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).target(env_logger::Target::Stdout);
    if !verbose {
        builder.parse_default_env();
    }
    builder.init();
}

fn config(args: &Args) -> Result<Config, Error> {
    Config::new(args.ip.as_deref(), args.mac.as_deref(), args.port, args.verbose)
}

fn wake(config: &Config) -> Result<Outcome, Error> {
    debug!("target: {:?} port: {}", config.target, config.port);
    dispatch::run(config, &resolve::system(), &wol::UdpBroadcast)
}

/// Help and version requests are not failures; anything else clap rejects
/// is bad input.
fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

fn print_usage(out: &mut impl Write) {
    // Nothing useful to do if stdout has gone away.
    let _ = Args::command().write_help(out);
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = usage_exit_code(&err);
            if code == 0 {
                let _ = err.print();
            } else {
                println!("{err}");
            }
            return ExitCode::from(code);
        }
    };

    let result = config(&args).and_then(|config| {
        init_logger(config.verbose);
        wake(&config)
    });

    match result {
        Ok(Outcome::Usage) => {
            print_usage(&mut io::stdout());
            ExitCode::SUCCESS
        }
        Ok(Outcome::Sent { mac, port }) => {
            println!("Sent Wake-on-LAN packet to {mac} on UDP port {port}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
