//! sireprat
//!
//! Command-line client for the Sirep service on Windows IoT Core devices.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use sirepkit::env_tokens::{is_true_flag, moustache_to_env_var};
use sirepkit::hexdump::hexdump;
use sirepkit::{
    Command, CommandType, Config, LaunchCommand, Session, SirepResult, Termination, SIREP_PORT,
};
use tracing_subscriber::{fmt, EnvFilter};

const EPILOG: &str = "\
available commands:
*\tLaunchCommandWithOutput
*\tPutFileOnDevice
*\tGetFileFromDevice
*\tGetFileInformationFromDevice
*\tGetSystemInformationFromDevice

remarks:
-\tUse moustaches to wrap remote environment variables to expand (e.g. {{userprofile}})

Usage example: sireprat 192.168.3.17 GetFileFromDevice --remote-path C:\\Windows\\System32\\hostname.exe";

/// Sirep CLI
#[derive(Parser, Debug)]
#[command(name = "sireprat")]
#[command(about = "Execute remote commands on a Windows IoT Core device through its Sirep service")]
#[command(version, after_help = EPILOG)]
struct Args {
    /// The IP address of the target IoT Core device
    target_device_ip: String,

    /// The Sirep command to use. Available commands are listed below
    command_type: CommandType,

    /// Have the target device return the command output stream
    #[arg(long)]
    return_output: bool,

    /// Program path to execute
    #[arg(long)]
    cmd: Option<String>,

    /// Impersonate the currently logged on user on the target device
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    as_logged_on_user: Option<String>,

    /// Arguments string for the program
    #[arg(long, allow_hyphen_values = true)]
    args: Option<String>,

    /// The working directory from which to run the desired program
    #[arg(long)]
    base_directory: Option<String>,

    /// Path on target device
    #[arg(long)]
    remote_path: Option<String>,

    /// Data string to write to file
    #[arg(long)]
    data: Option<String>,

    /// Sirep service port
    #[arg(long, default_value_t = SIREP_PORT)]
    port: u16,

    /// Connect/read/write timeout in milliseconds
    #[arg(long, default_value = "3000")]
    timeout_ms: u64,

    /// Print results as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbose - if printable, print result data
    #[arg(short = 'v', long = "verbose", visible_alias = "v")]
    v: bool,

    /// Very verbose - print socket buffers and more
    #[arg(long)]
    vv: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    let command = match build_command(&args) {
        Ok(command) => command,
        Err(e) => e.exit(),
    };

    let config = Config::builder()
        .target(&args.target_device_ip)
        .port(args.port)
        .connect_timeout_ms(args.timeout_ms)
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .build();

    let mut session = Session::new(config);
    let banner = match session.connect() {
        Ok(banner) => banner,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if args.vv {
        println!("RECV:");
        print!("{}", hexdump(&banner));
        println!("SEND:");
        print!("{}", hexdump(&command.serialize()));
    }

    let received = session.send(&command).and_then(|()| session.receive());
    let (results, termination) = match received {
        Ok(received) => received,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    for result in &results {
        print_result(&args, result);
    }

    tracing::info!("Exchange finished: {}", termination);
    match termination {
        Termination::Aborted(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    }
}

/// Install the tracing subscriber; `RUST_LOG` wins over the verbosity flags
fn init_tracing(args: &Args) {
    let default_level = if args.vv {
        "debug"
    } else if args.v {
        "info"
    } else {
        "error"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_result(args: &Args, result: &SirepResult) {
    if args.vv {
        println!("RECV:");
        print!("{}", hexdump(result.raw_payload()));
    }
    if args.v || args.vv {
        if let Some(text) = result.printable_text() {
            println!("---------\n{}\n---------", text);
        }
    }

    if args.json {
        let value = serde_json::json!({
            "type": result.type_code(),
            "name": result.result_type().name(),
            "payload_length": result.payload_length(),
            "fields": result.fields(),
        });
        println!("{}", value);
    } else {
        println!("{}", result);
    }
}

/// Build the requested command, checking its required arguments
fn build_command(args: &Args) -> Result<Command, clap::Error> {
    let missing = |usage: &str| {
        Args::command().error(
            ErrorKind::MissingRequiredArgument,
            format!("usage: sireprat <target_device_ip> {} {}", args.command_type, usage),
        )
    };
    let remote_path = |usage: &str| {
        args.remote_path
            .clone()
            .filter(|path| !path.is_empty())
            .ok_or_else(|| missing(usage))
    };

    let command = match args.command_type {
        CommandType::LaunchCommandWithOutput => {
            let cmd = args.cmd.as_deref().filter(|cmd| !cmd.is_empty()).ok_or_else(|| {
                missing("--cmd <program_path> [--args <arguments_string>] [--return-output] [--as-logged-on-user]")
            })?;
            let launch = LaunchCommand::new(cmd)
                .return_output(args.return_output)
                .as_logged_on_user(args.as_logged_on_user.as_deref().is_some_and(is_true_flag))
                .parameters(moustache_to_env_var(args.args.as_deref().unwrap_or_default()))
                .base_directory(args.base_directory.clone().unwrap_or_default());
            Command::LaunchCommandWithOutput(launch)
        }
        CommandType::PutFileOnDevice => Command::PutFileOnDevice {
            remote_path: remote_path("--remote-path <remote_destination_path> [--data <data_to_write>]")?,
            data: args.data.clone().unwrap_or_default(),
        },
        CommandType::GetFileFromDevice => Command::GetFileFromDevice {
            remote_path: remote_path("--remote-path <remote_path>")?,
        },
        CommandType::GetFileInformationFromDevice => Command::GetFileInformationFromDevice {
            remote_path: remote_path("--remote-path <remote_path>")?,
        },
        CommandType::GetSystemInformationFromDevice => Command::GetSystemInformationFromDevice,
    };

    Ok(command)
}
