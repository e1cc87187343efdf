use std::process::ExitCode;

fn print_usage(program: &str) {
    eprintln!("Usage: {} --type=[segment|score] [--level <level>] [--db <path>] [--config <path>]", program);
    eprintln!("Note: --level is required when --type=score");
    eprintln!("Level values must be 'note', 'structure', or 'shared_segments'");
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("folkalign");

    let invocation = match folkalign::parse_args(&args[1..]) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = folkalign::run(&invocation) {
        log::error!("Run failed: {:#}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
