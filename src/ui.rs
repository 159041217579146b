use std::{io::Write, str::FromStr};

use geo::LineString;
use tokio::{io::{AsyncBufRead, AsyncBufReadExt}, sync::mpsc};

use crate::{client::{MatchError, MatchService}, codec, data::*, error::Result, session::{MatchRequest, Session}};

pub const HELP: &str = "\
start                          begin a new drawing (clears the map)
draw <lon> <lat> <lon> <lat>.. draw a polyline and match it
clean                          remove everything drawn and matched
recenter                       go back to the default view
view <lat> <lon> <zoom>        move the view
wait                           wait for pending match requests
show                           print the map as GeoJSON
status                         print view, layers and last result
help                           this text
quit                           leave";

#[derive(Clone, PartialEq, Debug)]
pub enum Command {
	Start,
	Draw(LineString<f64>),
	Clean,
	Recenter,
	View(Viewport),
	Wait,
	Show,
	Status,
	Help,
	Quit,
}

impl FromStr for Command {
	type Err = String;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut words = s.split_whitespace();
		let cmd = words.next().ok_or_else(|| "empty command".to_string())?;
		let args = words.map(|w| w.parse::<f64>().map_err(|_| format!("not a number: {}", w))).collect::<Result<Vec<_>, _>>()?;
		match (cmd, args.as_slice()) {
			("start", []) => Ok(Command::Start),
			("draw", coords) if coords.len() % 2 == 0 => {
				let line = codec::line_from_coords(coords.chunks(2).map(|c| (c[0], c[1])).collect()).map_err(|e| e.to_string())?;
				Ok(Command::Draw(line))
			}
			("draw", _) => Err("draw takes lon/lat pairs".to_string()),
			("clean", []) => Ok(Command::Clean),
			("recenter", []) => Ok(Command::Recenter),
			("view", [lat, lon, zoom]) if zoom.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(zoom) => Ok(Command::View(Viewport { center: (*lat, *lon), zoom: *zoom as u8 })),
			("view", _) => Err("usage: view <lat> <lon> <zoom>".to_string()),
			("wait", []) => Ok(Command::Wait),
			("show", []) => Ok(Command::Show),
			("status", []) => Ok(Command::Status),
			("help", []) => Ok(Command::Help),
			("quit", []) | ("exit", []) => Ok(Command::Quit),
			(cmd, []) => Err(format!("unknown command {}, try help", cmd)),
			(cmd, _) => Err(format!("{} takes no arguments", cmd)),
		}
	}
}

/// Non-blocking sink for one-shot notices.
pub trait Toaster {
	fn toast(&mut self, notice: Notice);
}

pub struct StderrToaster;

impl Toaster for StderrToaster {
	fn toast(&mut self, notice: Notice) {
		eprintln!("[!] {}", notice);
	}
}

impl Toaster for Vec<Notice> {
	fn toast(&mut self, notice: Notice) {
		self.push(notice);
	}
}

struct Response {
	seq: u64,
	result: Result<MatchOutcome, MatchError>,
}

/// Single event loop: user commands and match responses are handled one at a time,
/// while the requests themselves run in the background.
pub struct Ui<S: MatchService, T: Toaster> {
	session: Session,
	service: S,
	toaster: T,
	tx: mpsc::UnboundedSender<Response>,
	rx: mpsc::UnboundedReceiver<Response>,
}

impl<S: MatchService, T: Toaster> Ui<S, T> {
	pub fn new(session: Session, service: S, toaster: T) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		Self { session, service, toaster, tx, rx }
	}

	pub fn session(&self) -> &Session {
		&self.session
	}
	#[cfg(test)]
	pub fn toaster(&self) -> &T {
		&self.toaster
	}

	/// Handle one command; `false` means quit.
	pub async fn handle<W: Write>(&mut self, cmd: Command, out: &mut W) -> Result<bool> {
		match cmd {
			Command::Start => self.session.on_draw_start(),
			Command::Draw(line) => {
				self.session.on_draw_start();
				let req = self.session.on_shape_created(line);
				self.dispatch(req);
			}
			Command::Clean => {
				if let Some(notice) = self.session.on_clean() {
					self.toaster.toast(notice);
				}
			}
			Command::Recenter => self.session.recenter(),
			Command::View(view) => self.session.set_view(view),
			Command::Wait => self.settle().await,
			Command::Show => writeln!(out, "{}", serde_json::to_string_pretty(&self.session.render())?)?,
			Command::Status => writeln!(out, "{}", self.session.status())?,
			Command::Help => writeln!(out, "{}", HELP)?,
			Command::Quit => return Ok(false),
		}
		Ok(true)
	}

	/// Wait until every issued request has answered.
	pub async fn settle(&mut self) {
		while self.session.in_flight() > 0 {
			match self.rx.recv().await {
				Some(resp) => self.apply(resp),
				None => break,
			}
		}
	}

	/// Read commands line by line until `quit` or end of input, then settle.
	pub async fn run<R: AsyncBufRead + Unpin, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
		let mut lines = input.lines();
		loop {
			tokio::select! {
				line = lines.next_line() => match line? {
					Some(line) if line.trim().is_empty() => {}
					Some(line) => match line.parse::<Command>() {
						Ok(cmd) => if !self.handle(cmd, out).await? {
							return Ok(());
						},
						Err(e) => writeln!(out, "{}", e)?,
					},
					None => break,
				},
				Some(resp) = self.rx.recv() => self.apply(resp),
			}
		}
		self.settle().await;
		Ok(())
	}

	fn dispatch(&self, req: MatchRequest) {
		log::info!("Sending request #{}", req.seq);
		log::debug!("Request #{}: {}", req.seq, req.wkt);
		let service = self.service.clone();
		let tx = self.tx.clone();
		tokio::spawn(async move {
			let result = service.match_wkt(req.wkt).await;
			// the loop is gone if this fails, nobody is left to show the result
			let _ = tx.send(Response { seq: req.seq, result });
		});
	}

	fn apply(&mut self, resp: Response) {
		log::debug!("Response to request #{} arrived", resp.seq);
		if let Some(notice) = self.session.on_match_response(resp.seq, resp.result) {
			self.toaster.toast(notice);
		}
	}
}
