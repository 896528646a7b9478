use std::net::{IpAddr, SocketAddr};

use tracing::{error, info};

use crate::{config::AppConfig, error::StartupError};

/// Refuse to start unless the safety interlock line is asserted.
pub fn check_interlock(config: &AppConfig) -> Result<(), StartupError> {
    if config.interlock_asserted {
        Ok(())
    } else {
        error!("safety interlock not asserted; refusing to start");
        Err(StartupError::InterlockNotAsserted)
    }
}

/// Obtain the address the relay listens on.
pub fn associate(config: &AppConfig) -> Result<SocketAddr, StartupError> {
    let ip: IpAddr = config.bind_address.trim().parse().map_err(|_| {
        StartupError::Association(format!("invalid bind address `{}`", config.bind_address))
    })?;
    let addr = SocketAddr::new(ip, config.port);
    info!(%addr, "network associated");
    Ok(addr)
}
