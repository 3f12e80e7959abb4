use clap::{Arg, ArgAction, Command};
use log::debug;
use std::time::Instant;

fn presets_arg(help: &'static str) -> Arg {
    Arg::new("presets")
        .long("presets")
        .value_name("NUMBERS")
        .help(help)
        .action(ArgAction::Set)
}

pub fn build_cli() -> Command {
    debug!("⚙️ Building CLI interface...");
    let start_time = Instant::now();
    let cmd = Command::new("ptzcount")
        .version("0.1.0")
        .author("PTZCount Developers")
        .about("Counts people across the presets of a VISCA-over-IP PTZ camera.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom configuration file")
                .action(ArgAction::Set)
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
        )
        .subcommand(
            Command::new("count")
                .about("Visits every preset, captures a snapshot and counts the people in it")
                .arg(presets_arg("Comma-separated list of preset numbers to visit (default: all configured)"))
        )
        .subcommand(
            Command::new("recall")
                .about("Moves the camera to a single preset")
                .arg(Arg::new("preset").long("preset").value_name("N").required(true).help("Preset number (1-256)").value_parser(clap::value_parser!(u16)).action(ArgAction::Set))
        )
        .subcommand(
            Command::new("snapshot")
                .about("Captures preset snapshots without running detection")
                .arg(presets_arg("Comma-separated list of preset numbers to capture (default: all configured)"))
                .arg(Arg::new("output").short('o').long("output").value_name("DIR").help("Output directory for the snapshots").action(ArgAction::Set))
        )
        .subcommand(
            Command::new("reprocess")
                .about("Runs detection again over the raw images of an earlier run")
                .arg(Arg::new("run-dir").long("run-dir").value_name("DIR").required(true).help("Run directory containing raw_images/").action(ArgAction::Set))
        );
    debug!("✅ CLI interface built in {:?}", start_time.elapsed());
    cmd
}
