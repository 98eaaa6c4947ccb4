//! Country lookup using a MaxMind GeoLite2/GeoIP2 MMDB file

use anyhow::{Context, Result};
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::warn;

use crate::analytics::models::GeoLocation;

/// Resolves a client IP to a country
pub trait GeoLookup: Send + Sync {
    /// Never fails; unresolvable addresses map to [`GeoLocation::unknown`].
    fn lookup(&self, ip: IpAddr) -> GeoLocation;
}

/// Memory-mapped country database. Without a database every lookup is unknown.
#[derive(Clone, Default)]
pub struct GeoIpService {
    reader: Option<Arc<Reader<Mmap>>>,
}

impl GeoIpService {
    /// Open the database at `path`; a Country or City database both work.
    pub fn new(path: Option<&str>) -> Result<Self> {
        let reader = match path {
            Some(path) => {
                let reader = unsafe { Reader::open_mmap(path) }
                    .with_context(|| format!("Failed to open GeoIP database at {}", path))?;
                Some(Arc::new(reader))
            }
            None => {
                warn!("No GeoIP database configured, visits will be recorded with an unknown country");
                None
            }
        };

        Ok(Self { reader })
    }

    pub fn is_enabled(&self) -> bool {
        self.reader.is_some()
    }
}

impl GeoLookup for GeoIpService {
    fn lookup(&self, ip: IpAddr) -> GeoLocation {
        let Some(reader) = self.reader.as_ref() else {
            return GeoLocation::unknown();
        };

        let country = match reader.lookup(ip) {
            Ok(result) => match result.decode::<geoip2::Country>() {
                Ok(Some(country)) => country,
                Ok(None) => return GeoLocation::unknown(),
                Err(e) => {
                    warn!(%ip, error = %e, "Failed to decode GeoIP record");
                    return GeoLocation::unknown();
                }
            },
            Err(e) => {
                warn!(%ip, error = %e, "GeoIP lookup failed");
                return GeoLocation::unknown();
            }
        };

        match (country.country.names.english, country.country.iso_code) {
            (Some(name), Some(code)) => GeoLocation {
                country_name: name.to_string(),
                country_code: code.to_string(),
            },
            _ => GeoLocation::unknown(),
        }
    }
}
