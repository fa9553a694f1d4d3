use std::process::ExitCode;

fn main() -> ExitCode {
    server_starter_lib::run()
}
