use std::{env, net::IpAddr, path::PathBuf, time::Duration};

const DEFAULT_DATABASE_URL: &str = "sqlite://blog.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MEDIA_ROOT: &str = "media";
const DEFAULT_CACHE_TTL_SECS: u64 = 20;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{name} must be {expected}, got {value:?}")]
	Invalid {
		name: &'static str,
		expected: &'static str,
		value: String,
	},
}

/// Runtime configuration, read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
	pub database_url: String,
	pub host: IpAddr,
	pub port: u16,
	pub media_root: PathBuf,
	/// How long a rendered index page is served from the page cache.
	pub cache_ttl: Duration,
}

impl Config {
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
		let media_root = lookup("MEDIA_ROOT").map_or_else(|| DEFAULT_MEDIA_ROOT.into(), PathBuf::from);

		let host = parse(&lookup, "HOST", "an ip address", DEFAULT_HOST.parse().ok())?;
		let port = parse(&lookup, "PORT", "a port number", Some(DEFAULT_PORT))?;
		let ttl = parse(
			&lookup,
			"CACHE_TTL_SECS",
			"a number of seconds",
			Some(DEFAULT_CACHE_TTL_SECS),
		)?;

		Ok(Self {
			database_url,
			host,
			port,
			media_root,
			cache_ttl: Duration::from_secs(ttl),
		})
	}
}

fn parse<T: std::str::FromStr>(
	lookup: &impl Fn(&str) -> Option<String>,
	name: &'static str,
	expected: &'static str,
	default: Option<T>,
) -> Result<T, Error> {
	let invalid = |value: String| Error::Invalid {
		name,
		expected,
		value,
	};

	match lookup(name) {
		Some(value) => value.trim().parse().map_err(|_| invalid(value)),
		None => default.ok_or_else(|| invalid(String::new())),
	}
}
