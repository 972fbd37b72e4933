mod config;
mod convert;

use std::error::Error;

use config::Config;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    env_logger::init();
    let config = Config::load(&["mcvox.toml", "mcvox/mcvox.toml"])?;
    log::debug!("{:?}", config);
    convert::convert_saves(&config)?;
    Ok(())
}
