use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(err) = macro_pipeline::app::run() {
        eprintln!("mp: {err}");
        return ExitCode::from(err.exit_code());
    }
    ExitCode::SUCCESS
}
