use std::{path::Path, time::Duration};

use serde::*;

use crate::{data::{Style, Viewport}, error::{Error, Result}};

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(default)]
pub struct Config {
	pub server: Server,
	pub view: Viewport,
	pub style: Styles,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct Server {
	/// Base URL of the matching service, `/match_wkt` is appended.
	pub url: String,
	pub timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct Styles {
	pub trajectory: Style,
	pub matched: Style,
}

impl Default for Server {
	fn default() -> Self {
		Self {
			url: "http://localhost:5000".to_string(),
			timeout_secs: 10,
		}
	}
}

impl Default for Viewport {
	fn default() -> Self {
		Self {
			center: (59.3293, 18.0686),
			zoom: 11,
		}
	}
}

impl Default for Styles {
	fn default() -> Self {
		Self {
			trajectory: Style { color: "#996633".to_string(), weight: 4.0 },
			matched: Style { color: "red".to_string(), weight: 4.0 },
		}
	}
}

impl Server {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

impl Config {
	/// Load from YAML (`.yaml`/`.yml`) or JSON (anything else).
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let file = std::fs::File::open(path)?;
		let config: Self = match path.extension().and_then(|e| e.to_str()) {
			Some("yaml") | Some("yml") => serde_yaml::from_reader(file)?,
			_ => serde_json::from_reader(file)?,
		};
		log::info!("Loaded configuration from {}", path.display());
		config.validate()
	}
	pub fn validate(self) -> Result<Self> {
		if self.server.url.trim().is_empty() {
			return Err(Error::Config("server.url is empty".to_string()));
		}
		if self.server.timeout_secs == 0 {
			return Err(Error::Config("server.timeout_secs must be positive".to_string()));
		}
		Ok(self)
	}
}
