use geo::{Distance, Haversine, LineString, MultiLineString, Point};
use geojson::{FeatureCollection, JsonObject};
use itertools::Itertools;

use crate::{client::MatchError, codec, config::{Config, Styles}, data::*};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LayerKind {
	Trajectory,
	Matched,
}

impl LayerKind {
	pub fn name(self) -> &'static str {
		match self {
			LayerKind::Trajectory => "trajectory",
			LayerKind::Matched => "matched",
		}
	}
}

#[derive(Clone, PartialEq, Debug)]
pub struct Layer {
	pub kind: LayerKind,
	pub style: Style,
	pub lines: MultiLineString<f64>,
}

/// A match request the session wants sent; `seq` must come back with the response.
#[derive(Clone, PartialEq, Debug)]
pub struct MatchRequest {
	pub seq: u64,
	pub wkt: String,
}

/// Drawing session: the rendered layers, the viewport and the bookkeeping of match requests.
///
/// Only the response to the most recently issued request is ever applied, and clearing the map retires it too.
#[derive(Clone, Debug)]
pub struct Session {
	layers: Vec<Layer>,
	issued: u64,
	live: Option<u64>,
	in_flight: usize,
	panel: Option<String>,
	view: Viewport,
	home: Viewport,
	styles: Styles,
}

impl Session {
	pub fn new(config: &Config) -> Self {
		Self {
			layers: Vec::new(),
			issued: 0,
			live: None,
			in_flight: 0,
			panel: None,
			view: config.view,
			home: config.view,
			styles: config.style.clone(),
		}
	}

	pub fn layers(&self) -> impl Iterator<Item = &Layer> {
		self.layers.iter()
	}
	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}
	pub fn panel(&self) -> Option<&str> {
		self.panel.as_deref()
	}
	pub fn view(&self) -> Viewport {
		self.view
	}
	pub fn in_flight(&self) -> usize {
		self.in_flight
	}

	pub fn on_draw_start(&mut self) {
		self.clear();
	}

	/// Put the drawn line on the map and issue its match request.
	pub fn on_shape_created(&mut self, line: LineString<f64>) -> MatchRequest {
		let wkt = codec::to_wkt(&line);
		self.add_layer(LayerKind::Trajectory, MultiLineString::new(vec![line]));
		self.issued += 1;
		self.live = Some(self.issued);
		self.in_flight += 1;
		MatchRequest { seq: self.issued, wkt }
	}

	pub fn on_clean(&mut self) -> Option<Notice> {
		if self.is_empty() {
			return Some(Notice::NoFeaturesDrawn);
		}
		self.clear();
		None
	}

	pub fn recenter(&mut self) {
		self.view = self.home;
	}
	pub fn set_view(&mut self, view: Viewport) {
		self.view = view;
	}

	/// Apply the outcome of request `seq`, unless a newer request or a clear has superseded it.
	pub fn on_match_response(&mut self, seq: u64, result: Result<MatchOutcome, MatchError>) -> Option<Notice> {
		self.in_flight = self.in_flight.saturating_sub(1);
		if self.live != Some(seq) {
			log::info!("Discarding stale response to request #{} (latest #{})", seq, self.issued);
			return None;
		}
		self.live = None;
		match result {
			Ok(MatchOutcome::Matched(wkt)) => match codec::drawable_lines_from_wkt(&wkt) {
				Ok(lines) => {
					log::info!("Request #{} matched {} line(s)", seq, lines.0.len());
					self.panel = Some(summarize(&lines));
					self.add_layer(LayerKind::Matched, lines);
					None
				}
				Err(e) => {
					log::warn!("Request #{} returned undecodable geometry ({}): {}", seq, e, wkt);
					Some(Notice::FetchError)
				}
			},
			Ok(MatchOutcome::Unmatched) => {
				log::info!("Request #{} could not be matched", seq);
				Some(Notice::CannotMatch)
			}
			Err(e) => {
				log::warn!("Request #{} failed: {}", seq, e);
				Some(Notice::FetchError)
			}
		}
	}

	/// All layers as one styled GeoJSON collection, in drawing order.
	pub fn render(&self) -> FeatureCollection {
		let features = self.layers.iter().flat_map(|layer| {
			let mut properties = JsonObject::new();
			properties.insert("layer".to_string(), layer.kind.name().into());
			properties.insert("stroke".to_string(), layer.style.color.clone().into());
			properties.insert("stroke-width".to_string(), layer.style.weight.into());
			codec::lines_to_features(&layer.lines, &properties).features
		}).collect();
		FeatureCollection { bbox: None, features, foreign_members: None }
	}

	pub fn status(&self) -> String {
		format!(
			"view: {}\nlayers: {}\nin flight: {}\nresult: {}",
			self.view(),
			self.layers().map(|l| l.kind.name()).join(", "),
			self.in_flight,
			self.panel().unwrap_or("-"),
		)
	}

	fn add_layer(&mut self, kind: LayerKind, lines: MultiLineString<f64>) {
		let style = match kind {
			LayerKind::Trajectory => self.styles.trajectory.clone(),
			LayerKind::Matched => self.styles.matched.clone(),
		};
		self.layers.push(Layer { kind, style, lines });
	}

	fn clear(&mut self) {
		self.layers.clear();
		self.panel = None;
		if let Some(seq) = self.live.take() {
			log::debug!("Retired request #{}", seq);
		}
	}
}

fn summarize(lines: &MultiLineString<f64>) -> String {
	let positions: usize = lines.0.iter().map(|l| l.0.len()).sum();
	let meters: f64 = lines.0.iter().flat_map(|l| l.points().tuple_windows::<(Point<f64>, Point<f64>)>()).map(|(a, b)| Haversine.distance(a, b)).fold(0.0, |acc, d| acc + d);
	format!("{} matched line(s), {} positions, {:.0} m", lines.0.len(), positions, meters)
}
