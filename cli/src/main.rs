pub(crate) mod cli;
pub(crate) mod error;
pub(crate) mod run;

fn main() {
    let cli = cli::Cli::new();

    if let Err(e) = cli.execute() {
        log::error!("{e}");
        eprintln!("\x1b[31mError: {e}\x1b[0m");
        std::process::exit(1);
    }
}
