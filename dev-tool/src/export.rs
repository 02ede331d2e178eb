use std::{
    fs::{create_dir_all, File},
    io::{BufReader, BufWriter},
    path::PathBuf,
};

use anyhow::{Context, Error};
use log::debug;
use structopt::StructOpt;

use finbert::export::{read_model, write_model, Export};

use crate::{exit_code::NO_ERROR, hub::resolve_pretrained_file};

/// Exports the pretrained sentiment model to its inference graph.
///
/// The raw pretrained graph is restricted to the `logits` output, the inputs are renamed to
/// `input_ids` and `attention_mask` and all three tensors get a dynamic batch axis.
#[derive(Debug, StructOpt)]
pub struct ExportCmd {
    /// Hub name of the pretrained model.
    #[structopt(short, long, default_value = "ProsusAI/finbert")]
    model: String,

    /// File name of the raw graph in the hub repository.
    #[structopt(long, default_value = "model.onnx")]
    hub_file: String,

    /// Local raw graph file, skips the hub.
    #[structopt(short, long)]
    source: Option<PathBuf>,

    /// File the exported graph is written to.
    #[structopt(short, long, default_value = "models/sentiment.onnx")]
    output: PathBuf,

    /// Fixed token length declared for the model inputs.
    #[structopt(short, long, default_value = "128")]
    token_size: usize,
}

impl ExportCmd {
    pub fn run(self) -> Result<i32, Error> {
        let source = resolve_pretrained_file(self.source, &self.model, &self.hub_file)?;

        debug!("Reading the raw graph from {}.", source.display());
        let reader = BufReader::new(
            File::open(&source)
                .with_context(|| format!("Failed to open the raw graph {}", source.display()))?,
        );
        let mut model = read_model(reader).context("Failed to read the raw graph")?;

        let summary = Export::new(self.token_size)?
            .rewrite(&mut model)
            .context("Failed to rewrite the graph")?;
        debug!(
            "Kept {} nodes, pruned {} nodes and {} initializers.",
            summary.kept_nodes, summary.pruned_nodes, summary.pruned_initializers,
        );

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent).with_context(|| {
                    format!("Failed to create the output directory {}", parent.display())
                })?;
            }
        }
        let output = &self.output;
        let writer = BufWriter::new(
            File::create(output).with_context(|| {
                format!("Failed to create the output file {}", output.display())
            })?,
        );
        write_model(&model, writer).context("Failed to write the exported graph")?;

        println!(
            "Exported {} to {} ({} nodes, {} pruned)",
            self.model,
            self.output.display(),
            summary.kept_nodes,
            summary.pruned_nodes,
        );

        Ok(NO_ERROR)
    }
}
