use std::process::ExitCode;

fn main() -> ExitCode {
    billed_cli::run()
}
