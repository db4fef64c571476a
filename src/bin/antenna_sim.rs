use clap::{App, Arg, ArgMatches, SubCommand};
use colored::*;
use obdh_antenna::antenna::{AntennaData, AntennaDevice};
use obdh_antenna::config::AntennaConfig;
use obdh_antenna::deployment::{DeployOutcome, PhaseResult};
use obdh_antenna::drivers::{select_driver, AntennaDriver, DriverKind};
use obdh_antenna::protocol::AntennaId;
use obdh_antenna::sim::{SimFaultPlan, SimulatedDeployPin, SimulatedIsisBoard, VirtualClock};
use obdh_antenna::temperature::raw_to_telemetry_kelvin;
use tracing::Level;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("antenna-sim")
        .version("0.1.0")
        .author("Space Systems Engineering Team")
        .about("📡 Antenna deployment simulator - runs the antenna device layer against a simulated board")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON antenna configuration")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("driver")
                .short("d")
                .long("driver")
                .value_name("DRIVER")
                .help("Override the configured antenna driver")
                .takes_value(true)
                .possible_values(&["isis", "space-lab-sl"])
                .global(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table", "compact"])
                .default_value("table")
                .global(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Log driver commands (-vv for bus traffic)")
                .global(true),
        )
        .arg(
            Arg::with_name("offline")
                .long("offline")
                .help("Simulate a board that never acknowledges")
                .global(true),
        )
        .arg(
            Arg::with_name("reject-arm")
                .long("reject-arm")
                .value_name("COUNT")
                .help("Refuse the first COUNT arm commands")
                .takes_value(true)
                .global(true)
                .validator(|v| match v.parse::<u32>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("COUNT must be a non-negative number".into()),
                }),
        )
        .arg(
            Arg::with_name("stuck")
                .long("stuck")
                .value_name("ANTENNA")
                .help("Antenna (1-4) whose restraint never releases")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .possible_values(&["1", "2", "3", "4"])
                .global(true),
        )
        .arg(
            Arg::with_name("nack")
                .long("nack")
                .value_name("OPCODE")
                .help("Opcode the board refuses, e.g. 0xC3")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .global(true)
                .validator(|v| match parse_opcode(&v) {
                    Some(_) => Ok(()),
                    None => Err("OPCODE must be a byte, decimal or 0x-prefixed hex".into()),
                }),
        )
        .arg(
            Arg::with_name("temperature-raw")
                .long("temperature-raw")
                .value_name("COUNT")
                .help("Raw 10-bit temperature sensor count the board reports")
                .takes_value(true)
                .global(true)
                .validator(|v| match v.parse::<u16>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("COUNT must be a 16-bit number".into()),
                }),
        )
        .subcommand(SubCommand::with_name("init").about("🔌 Initialize the antenna device"))
        .subcommand(SubCommand::with_name("status").about("📊 Read deployment status and temperature"))
        .subcommand(
            SubCommand::with_name("deploy")
                .about("🚀 Run the full deployment sequence")
                .arg(
                    Arg::with_name("timeout")
                        .short("t")
                        .long("timeout")
                        .value_name("MS")
                        .help("Arming timeout in milliseconds, overrides the configuration")
                        .takes_value(true)
                        .validator(|v| match v.parse::<u32>() {
                            Ok(_) => Ok(()),
                            Err(_) => Err("MS must be a number".into()),
                        }),
                ),
        )
        .subcommand(SubCommand::with_name("reports").about("🔥 Read per-antenna burn counters and timers"))
        .get_matches();

    let verbosity = matches.occurrences_of("verbose");
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    let format = matches.value_of("format").unwrap_or("table");
    let config = load_config(&matches)?;

    let mut board = SimulatedIsisBoard::with_faults(fault_plan(&matches));
    if let Some(raw) = matches.value_of("temperature-raw").and_then(|v| v.parse().ok()) {
        board.set_temperature_raw(raw);
    }

    let driver = select_driver(config.driver, &mut board, SimulatedDeployPin::new(), VirtualClock::new());
    let mut device = AntennaDevice::from_config(driver, &config);

    if format == "table" {
        println!("{}", "📡 Antenna Deployment Simulator".bright_blue().bold());
        println!("{} {}", "Driver:".bright_white(), config.driver.to_string().bright_cyan());
    }

    match matches.subcommand() {
        ("init", Some(_)) => handle_init(&mut device, format),
        ("status", Some(_)) => handle_status(&mut device, format)?,
        ("deploy", Some(sub_matches)) => {
            let timeout_ms = sub_matches
                .value_of("timeout")
                .and_then(|v| v.parse().ok())
                .unwrap_or(config.arming_timeout_ms);
            handle_deploy(&mut device, timeout_ms, format)?;
        }
        ("reports", Some(_)) => handle_reports(&mut device, format)?,
        _ => {
            println!("{}", "Quick start:".bright_green());
            println!("  antenna-sim deploy");
            println!("  antenna-sim --reject-arm 3 --stuck 2 deploy");
            println!("  antenna-sim --driver space-lab-sl deploy");
        }
    }

    drop(device);
    if format == "table" && config.driver == DriverKind::Isis {
        println!(
            "{} {} commands, {:.1} s simulated",
            "Board:".bright_white(),
            board.command_log().len(),
            board.elapsed_ms() as f64 / 1000.0
        );
    }

    Ok(())
}

fn load_config(matches: &ArgMatches<'_>) -> Result<AntennaConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.value_of("config") {
        Some(path) => AntennaConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => AntennaConfig::default(),
    };
    match matches.value_of("driver") {
        Some("isis") => config.driver = DriverKind::Isis,
        Some("space-lab-sl") => config.driver = DriverKind::SpaceLabSl,
        _ => {}
    }
    Ok(config)
}

fn fault_plan(matches: &ArgMatches<'_>) -> SimFaultPlan {
    SimFaultPlan {
        offline: matches.is_present("offline"),
        nacked_opcodes: matches
            .values_of("nack")
            .map(|values| values.filter_map(parse_opcode).collect())
            .unwrap_or_default(),
        rejected_arm_commands: matches
            .value_of("reject-arm")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        stuck_antennas: matches
            .values_of("stuck")
            .map(|values| {
                values
                    .filter_map(|v| v.parse().ok())
                    .filter_map(AntennaId::from_number)
                    .collect()
            })
            .unwrap_or_default(),
        failing_reads: false,
    }
}

fn parse_opcode(value: &str) -> Option<u8> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn handle_init<D: AntennaDriver>(device: &mut AntennaDevice<D>, format: &str) {
    let result = device.init();
    match (format, result) {
        ("json", result) => println!("{}", serde_json::json!({ "initialized": result.is_ok() })),
        ("compact", Ok(())) => println!("{}", "OK".bright_green()),
        ("compact", Err(_)) => println!("{}", "FAIL".bright_red()),
        (_, Ok(())) => println!("{} {}", "✅".green(), "Antenna device initialized".bright_green()),
        (_, Err(e)) => println!("{} {}", "❌".red(), e.to_string().bright_red()),
    }
}

fn handle_status<D: AntennaDriver>(
    device: &mut AntennaDevice<D>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut data = AntennaData::poisoned();
    let result = device.get_data_into(&mut data);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&data)?),
        "compact" => println!("{}", data.status.summary()),
        _ => {
            if let Err(e) = &result {
                println!("{} {}", "⚠️".yellow(), format!("read failed: {}", e).bright_red());
            }
            print_data(&data);
        }
    }
    Ok(())
}

fn handle_deploy<D: AntennaDriver>(
    device: &mut AntennaDevice<D>,
    timeout_ms: u32,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = device.deploy(timeout_ms);
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        "compact" => println!("errors={}", outcome.errors),
        _ => print_outcome(&outcome),
    }
    Ok(())
}

fn handle_reports<D: AntennaDriver>(
    device: &mut AntennaDevice<D>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let reports = match device.activation_reports() {
        Ok(reports) => reports,
        Err(e) => {
            println!("{} {}", "❌".red(), e.to_string().bright_red());
            return Ok(());
        }
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
        _ => {
            for (antenna, report) in AntennaId::ALL.iter().zip(reports.iter()) {
                println!(
                    "{:<5} activations {:>3}  burn time {:>6} ms",
                    antenna.to_string().bright_white(),
                    report.activation_count,
                    report.activation_time_ms()
                );
            }
        }
    }
    Ok(())
}

fn print_data(data: &AntennaData) {
    println!("\n{}", "📊 Antenna Status".bright_blue().bold());
    for antenna in AntennaId::ALL {
        let channel = data.status.channel(antenna);
        let state = if channel.deployed { "deployed".bright_green() } else { "stowed".yellow() };
        let mut line = format!("{:<5} {}", antenna.to_string(), state);
        if channel.burning_active {
            line.push_str(&format!(" {}", "burning".bright_red()));
        }
        if channel.stopped_by_timeout {
            line.push_str(&format!(" {}", "timed out".red()));
        }
        println!("{}", line);
    }
    println!(
        "{} {}",
        "Armed:".bright_white(),
        if data.status.armed { "yes".bright_red() } else { "no".green() }
    );
    match data.temperature_celsius() {
        Some(celsius) => println!(
            "{} {} C ({} K)",
            "Temperature:".bright_white(),
            celsius,
            raw_to_telemetry_kelvin(data.temperature)
        ),
        None => println!("{} {}", "Temperature:".bright_white(), "out of calibrated range".yellow()),
    }
}

fn print_outcome(outcome: &DeployOutcome) {
    println!("\n{}", "🚀 Deployment Sequence".bright_blue().bold());
    for record in &outcome.phases {
        let result = match record.result {
            PhaseResult::Ok => "ok".bright_green(),
            PhaseResult::Failed => "failed".bright_red(),
            PhaseResult::Skipped => "skipped".bright_black(),
        };
        println!("  {:<24} {}", record.phase.to_string(), result);
    }
    println!("{} {}", "Arming attempts:".bright_white(), outcome.arming_attempts);

    match &outcome.final_status {
        Some(status) => println!(
            "{} {}/4 deployed ({})",
            "Final status:".bright_white(),
            status.deployed_count(),
            status.summary()
        ),
        None => println!("{} {}", "Final status:".bright_white(), "unavailable".yellow()),
    }

    if outcome.is_clean() {
        println!("{} {}", "✅".green(), "Deployment completed cleanly".bright_green());
    } else {
        println!(
            "{} {}",
            "⚠️".yellow(),
            format!("Deployment completed with {} error(s)", outcome.errors).bright_red()
        );
    }
}
