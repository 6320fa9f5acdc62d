use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{config, convert, list, search, selected};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "carryover")]
#[command(version = VERSION)]
#[command(about = "Stage source files for language conversion without losing their history")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List convertible files matching a name pattern and/or line count
    Search(search::SearchArgs),
    /// Search, confirm, commit the renames, then convert
    Convert(convert::ConvertArgs),
    /// Convert files named in a newline-separated list
    List(list::ListArgs),
    /// Convert explicitly chosen files or directories
    Selected(selected::SelectedArgs),
    /// Manage global carryover configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    if !matches!(cli.command, Commands::Config(_)) {
        tty::status("carryover is working...");
    }

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
