//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    env_logger::init();
    if let Err(err) = changepipe_cli::run() {
        log::error!("changepipe: {err}");
        std::process::exit(1);
    }
}
