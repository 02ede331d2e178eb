use std::process::exit;

use anyhow::Error;
use structopt::StructOpt;

use crate::{
    analyze::AnalyzeCmd,
    exit_code::FATAL_ERROR,
    export::ExportCmd,
    inspect::InspectCmd,
    tokenize::TokenizeCmd,
};

mod analyze;
mod exit_code;
mod export;
mod hub;
mod inspect;
mod tokenize;

/// Tooling for the FinBERT sentiment model.
#[derive(StructOpt, Debug)]
enum CommandArgs {
    Export(ExportCmd),
    Inspect(InspectCmd),
    Tokenize(TokenizeCmd),
    Analyze(AnalyzeCmd),
}

impl CommandArgs {
    fn run(self) -> Result<i32, Error> {
        match self {
            CommandArgs::Export(cmd) => cmd.run(),
            CommandArgs::Inspect(cmd) => cmd.run(),
            CommandArgs::Tokenize(cmd) => cmd.run(),
            CommandArgs::Analyze(cmd) => cmd.run(),
        }
    }
}

fn main() {
    env_logger::init();

    let exit_code = match CommandArgs::from_args().run() {
        Ok(exit_code) => exit_code,
        Err(error) => {
            eprintln!("ERROR: {:#}", error);
            FATAL_ERROR
        }
    };

    exit(exit_code);
}
