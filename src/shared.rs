//! Optional process-wide resolver.
//!
//! Library code never reaches for this; it exists for small programs that
//! want one resolver without threading it around.

use once_cell::sync::OnceCell;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::resolver::Resolver;

static DEFAULT: OnceCell<Resolver> = OnceCell::new();

/// Install the process-wide resolver. Fails with `AlreadyInitialized` once
/// one exists, including one created lazily by [`resolver`].
pub fn init(config: &Config) -> Result<&'static Resolver> {
    let mut created = false;
    let resolver = DEFAULT.get_or_try_init(|| {
        created = true;
        Resolver::from_config(config)
    })?;

    if !created {
        return Err(Error::AlreadyInitialized);
    }
    log::info!("Default resolver initialized with store {}", config.database);
    Ok(resolver)
}

/// The process-wide resolver, created with an in-memory store on first use
/// if [`init`] was never called
pub fn resolver() -> Result<&'static Resolver> {
    DEFAULT.get_or_try_init(|| {
        log::info!("No default resolver configured, using an in-memory store");
        Resolver::from_config(&Config::default())
    })
}
