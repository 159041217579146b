use std::fmt;

use serde::*;

/// Body of a `/match_wkt` response.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Envelope {
	pub state: i64,
	#[serde(default)]
	pub wkt: Option<String>,
}

#[derive(Clone, PartialEq, Debug)]
pub enum MatchOutcome {
	Matched(String),
	Unmatched,
}

impl Envelope {
	/// Interpret the envelope, or describe how it breaks the contract.
	pub fn outcome(self) -> Result<MatchOutcome, String> {
		match (self.state, self.wkt) {
			(1, Some(wkt)) if !wkt.trim().is_empty() => Ok(MatchOutcome::Matched(wkt)),
			(1, _) => Err("state 1 without a wkt geometry".to_string()),
			(0, _) => Ok(MatchOutcome::Unmatched),
			(state, _) => Err(format!("unknown state {}", state)),
		}
	}
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Style {
	pub color: String,
	pub weight: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(default)]
pub struct Viewport {
	/// (lat, lon)
	pub center: (f64, f64),
	pub zoom: u8,
}

impl fmt::Display for Viewport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "center {} {} zoom {}", self.center.0, self.center.1, self.zoom)
	}
}

/// One-shot, non-fatal notices shown to the user.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Notice {
	NoFeaturesDrawn,
	CannotMatch,
	FetchError,
}

impl fmt::Display for Notice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Notice::NoFeaturesDrawn => "No features drawn",
			Notice::CannotMatch => "Cannot match the trajectory, try another one",
			Notice::FetchError => "Error fetching data from server",
		})
	}
}
