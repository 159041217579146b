mod client;
mod codec;
mod config;
mod data;
mod error;
mod session;
mod ui;

use clap::{App, Arg, ArgMatches, SubCommand, crate_version};
use geojson::GeoJson;
use geo::LineString;

use error::{Error, Result};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	env_logger::init_from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"));
	let matches = App::new("FMM Demo")
							.version(crate_version!())
							.about("Draw a trajectory, match it against a map-matching service")
							.arg(Arg::with_name("config")
									.long("config")
									.short("c")
									.takes_value(true)
									.global(true)
									.help("Configuration file (YAML or JSON)"))
							.arg(Arg::with_name("server")
									.long("server")
									.takes_value(true)
									.global(true)
									.help("Base URL of the matching service"))
							.arg(Arg::with_name("timeout")
									.long("timeout")
									.takes_value(true)
									.global(true)
									.help("Request timeout in seconds"))
							.subcommand(SubCommand::with_name("wkt")
								.about("Convert a GeoJSON trajectory to WKT")
								.arg(Arg::with_name("trajectory")
										.takes_value(true)
										.required(true)
										.index(1)
										.help("Trajectory GeoJSON (LineString, Feature or single-feature FeatureCollection)"))
							)
							.subcommand(SubCommand::with_name("geojson")
								.about("Convert a WKT LINESTRING or MULTILINESTRING to a GeoJSON FeatureCollection")
								.arg(Arg::with_name("wkt")
										.takes_value(true)
										.required(true)
										.index(1)
										.help("WKT text, or - to read it from stdin"))
							)
							.subcommand(SubCommand::with_name("match")
								.about("Match one trajectory and write the resulting map")
								.arg(Arg::with_name("trajectory")
										.takes_value(true)
										.required(true)
										.index(1)
										.help("Trajectory GeoJSON"))
								.arg(Arg::with_name("output")
										.takes_value(true)
										.index(2)
										.help("Output GeoJSON (stdout if omitted)"))
							)
							.subcommand(SubCommand::with_name("session")
								.about("Interactive drawing session on stdin, type help for commands")
								.arg(Arg::with_name("output")
										.takes_value(true)
										.index(1)
										.help("Write the final map here on exit"))
							)
							.get_matches();
	let mut config = match matches.value_of("config") {
		Some(path) => config::Config::load(path)?,
		None => config::Config::default(),
	};
	if let Some(url) = matches.value_of("server") {
		config.server.url = url.to_string();
	}
	if let Some(t) = matches.value_of("timeout") {
		config.server.timeout_secs = t.parse().map_err(|_| Error::Usage(format!("timeout must be whole seconds, got {}", t)))?;
	}
	let config = config.validate()?;
	if let Some(matches) = matches.subcommand_matches("wkt") {
		let line = read_trajectory(arg(matches, "trajectory")?)?;
		println!("{}", codec::to_wkt(&line));
	} else if let Some(matches) = matches.subcommand_matches("geojson") {
		let wkt = match arg(matches, "wkt")? {
			"-" => std::io::read_to_string(std::io::stdin())?,
			wkt => wkt.to_string(),
		};
		println!("{}", serde_json::to_string_pretty(&codec::from_wkt(&wkt)?)?);
	} else if let Some(matches) = matches.subcommand_matches("match") {
		let line = read_trajectory(arg(matches, "trajectory")?)?;
		let mut ui = ui::Ui::new(session::Session::new(&config), matcher(&config)?, ui::StderrToaster);
		ui.handle(ui::Command::Draw(line), &mut std::io::sink()).await?;
		ui.settle().await;
		write_map(ui.session(), matches.value_of("output"))?;
	} else if let Some(matches) = matches.subcommand_matches("session") {
		let mut ui = ui::Ui::new(session::Session::new(&config), matcher(&config)?, ui::StderrToaster);
		log::info!("Type help for commands");
		ui.run(tokio::io::BufReader::new(tokio::io::stdin()), &mut std::io::stdout()).await?;
		if let Some(path) = matches.value_of("output") {
			write_map(ui.session(), Some(path))?;
		}
	} else {
		return Err(Error::Usage(matches.usage().to_string()));
	}
	Ok(())
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
	matches.value_of(name).ok_or_else(|| Error::Usage(format!("missing <{}>", name)))
}

fn matcher(config: &config::Config) -> Result<client::HttpMatcher> {
	let m = client::HttpMatcher::new(&config.server.url, config.server.timeout())?;
	log::info!("Matching against {} (timeout {}s)", m.url(), config.server.timeout_secs);
	Ok(m)
}

fn read_trajectory(path: &str) -> Result<LineString<f64>> {
	let gj: GeoJson = serde_json::from_reader(std::io::BufReader::new(std::fs::File::open(path)?))?;
	let line = codec::line_from_geojson(&gj)?;
	log::info!("Loaded trajectory with {} positions", line.0.len());
	Ok(line)
}

fn write_map(session: &session::Session, output: Option<&str>) -> Result<()> {
	let map = session.render();
	match output {
		Some(path) => {
			serde_json::to_writer_pretty(std::fs::File::create(path)?, &map)?;
			log::info!("Wrote {} feature(s) to {}", map.features.len(), path);
		}
		None => println!("{}", serde_json::to_string_pretty(&map)?),
	}
	Ok(())
}
