use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::{Context, Error};
use log::debug;
use structopt::StructOpt;

use finbert::{export::read_model, inspect::describe_outputs};

use crate::exit_code::NO_ERROR;

/// Prints the declared outputs of an exported graph.
#[derive(Debug, StructOpt)]
pub struct InspectCmd {
    /// Path to the exported graph file.
    #[structopt(default_value = "models/sentiment.onnx")]
    file: PathBuf,
}

impl InspectCmd {
    pub fn run(self) -> Result<i32, Error> {
        debug!("Reading the graph from {}.", self.file.display());
        let reader = BufReader::new(
            File::open(&self.file)
                .with_context(|| format!("Failed to open the graph {}", self.file.display()))?,
        );
        let model = read_model(reader).context("Failed to read the graph")?;

        println!("Model outputs:");
        for output in describe_outputs(&model)? {
            println!("  - {}", output);
        }

        Ok(NO_ERROR)
    }
}
