//! GG-TESTBED entry point.
//!
//! Runs the bundled demonstration suite through the execution engine:
//! - Configuration loading (file, environment, flags)
//! - Logging initialization
//! - Isolated execution and reporting
//!
//! ## CLI Subcommands
//!
//! - `gg-testbed` or `gg-testbed run` - Run the suite (default)
//! - `gg-testbed list` - List registered tests
//! - `gg-testbed config show` - Show effective configuration

use std::process::ExitCode;

use gg_testbed::cli::{config_cmd, run_list, run_suite, RunArgs};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("run");

    // Bare flags run the suite: `gg-testbed --json`.
    let (command, rest) = if command.starts_with("--") && !is_meta_flag(command) {
        ("run", &args[1..])
    } else {
        (command, args.get(2..).unwrap_or(&[]))
    };

    match command {
        "run" | "" => match RunArgs::parse(rest) {
            Ok(run_args) => exit_code(run_suite(&run_args)),
            Err(e) => {
                eprintln!("Error: {}", e);
                print_command_help("run");
                ExitCode::from(2u8)
            }
        },
        "list" => exit_code(run_list()),
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = rest.first() {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("gg-testbed {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        "config" => {
            let subcommand = rest.first().map(|s| s.as_str()).unwrap_or("show");
            let flags = rest.get(1..).unwrap_or(&[]);
            let run_args = match RunArgs::parse(flags) {
                Ok(run_args) => run_args,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    print_command_help("config");
                    return ExitCode::from(2u8);
                }
            };
            match subcommand {
                "show" => exit_code(config_cmd::run_show(&run_args)),
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => exit_code(config_cmd::run_validate(&run_args)),
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::FAILURE
                }
            }
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn is_meta_flag(arg: &str) -> bool {
    matches!(arg, "--help" | "--version")
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(2))
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "GG-TESTBED - Isolated Unit-Test Execution Engine v{}

USAGE:
    gg-testbed [COMMAND] [OPTIONS]

COMMANDS:
    run          Run the test suite (default when no command given)
    list         List registered tests in execution order
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

OPTIONS:
    -h, --help         Show help for command
    -V, --version      Show version information
    --monochrome       Disable color styling
    --omit-runtime     Hide timing fields
    --omit-successes   Hide lines for passed tests
    --json             Emit JSON lines instead of text
    --inline           Run tests in-process (no crash containment)
    --config FILE      Load configuration from a TOML file

EXAMPLES:
    gg-testbed                          # Run the suite
    gg-testbed run --monochrome         # Plain output for logs
    gg-testbed --json > results.jsonl   # Machine-readable results
    gg-testbed list                     # Show registered tests
    gg-testbed config validate          # Check configuration

ENVIRONMENT:
    GG_TESTBED_MONOCHROME           Disable color styling (NO_COLOR also honored)
    GG_TESTBED_OMIT_RUNTIME         Hide timing fields
    GG_TESTBED_OMIT_SUCCESSES       Hide lines for passed tests
    GG_TESTBED_FORMAT               Report format (text, json)
    GG_TESTBED_ISOLATION            Isolation backend (fork, inline)
    GG_TESTBED_DIAGNOSTIC_CAPACITY  Diagnostic bytes per test (64-8192)
    GG_TESTBED_TIMEOUT_MS           Per-test timeout, fork only (0 disables)
    GG_TESTBED_LOG                  Log filter (debug, info, warn, error)
    GG_TESTBED_LOG_FORMAT           Log format (pretty, json)

EXIT CODES:
    0  All tests passed or were skipped
    1  One or more tests failed or crashed
    2  Configuration or infrastructure error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "run" => {
            eprintln!(
                "gg-testbed run - Run the test suite

USAGE:
    gg-testbed run [OPTIONS]

OPTIONS:
    --monochrome       Disable color styling
    --omit-runtime     Hide timing fields
    --omit-successes   Hide lines for passed tests
    --json             Emit JSON lines instead of text
    --inline           Run tests in-process (no crash containment)
    --config FILE      Load configuration from a TOML file

DESCRIPTION:
    Runs every registered test in registration order. Each test gets a
    fresh fixture instance; setup, body and teardown run in that order
    and teardown always runs. With fork isolation a crashing test is
    reported as CRASH and the run continues.

EXIT CODES:
    0  No test failed or crashed
    1  One or more tests failed or crashed
    2  Configuration or infrastructure error

EXAMPLES:
    gg-testbed run
    gg-testbed run --omit-successes --monochrome
    gg-testbed run --config testbed.toml
"
            );
        }
        "list" => {
            eprintln!(
                "gg-testbed list - List registered tests

USAGE:
    gg-testbed list

DESCRIPTION:
    Prints fixture.test names in execution order. Parameterized tests
    appear once per case with their case tag.
"
            );
        }
        "config" => {
            eprintln!(
                "gg-testbed config - Inspect configuration

USAGE:
    gg-testbed config <SUBCOMMAND> [OPTIONS]

SUBCOMMANDS:
    show        Show effective configuration (default)
    defaults    Show built-in defaults
    validate    Check for invalid or conflicting values

OPTIONS:
    --config FILE  Layer a TOML file under the environment

EXIT CODES (validate):
    0  Configuration is valid
    1  Warnings found
    2  Configuration file could not be loaded

EXAMPLES:
    gg-testbed config show
    gg-testbed config validate --config testbed.toml
"
            );
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
        }
    }
}
