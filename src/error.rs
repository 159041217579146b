use thiserror::Error;

use crate::{client::MatchError, codec::CodecError};

#[derive(Error, Debug)]
pub enum Error {
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	#[error("invalid JSON: {0}")]
	Json(#[from] serde_json::Error),
	#[error("invalid YAML: {0}")]
	Yaml(#[from] serde_yaml::Error),
	#[error("invalid configuration: {0}")]
	Config(String),
	#[error(transparent)]
	Codec(#[from] CodecError),
	#[error(transparent)]
	Match(#[from] MatchError),
	#[error("invalid argument: {0}")]
	Usage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
