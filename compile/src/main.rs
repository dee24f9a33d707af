use clap::Parser as _;
use hvcc_compile::Compiler;
use hvcc_compile::cli::{self, Args};

fn main() {
    match run() {
        Ok(false) => {}
        Ok(true) => std::process::exit(1),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `true` if the compile reported errors.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let default_filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    let Some(config) = cli::initialize(&args)? else {
        return Ok(false); // An early-exit argument was passed.
    };
    let compiler = Compiler::from_config(&config);
    cli::run(&compiler, &args)
}
