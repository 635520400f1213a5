//! Binary entry point: open a fireball viewer window, optionally seeded
//! from a TOML options preset named on the command line.

use std::path::Path;

use pyre::{Options, Viewer};

fn load_preset(arg: &str) -> Result<Options, pyre::PyreError> {
    let options = Options::load(Path::new(arg))?;
    log::info!("loaded options preset from {arg}");
    Ok(options)
}

fn main() {
    env_logger::init();

    let mut builder = Viewer::builder();
    if let Some(arg) = std::env::args().nth(1) {
        match load_preset(&arg) {
            Ok(options) => builder = builder.with_options(options),
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = builder.build().run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
