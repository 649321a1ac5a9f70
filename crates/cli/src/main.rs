use std::process::ExitCode;

fn main() -> ExitCode {
    linebook_cli::run()
}
