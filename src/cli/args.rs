//! Command-line arguments for the `among` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "among",
    version,
    about = "Compile and inspect Among scripts."
)]
pub struct AmongArgs {
    #[command(flatten)]
    pub options: CompileOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options that shape every compilation.
#[derive(Debug, Clone, Default, Args)]
pub struct CompileOptions {
    /// JSON file with engine options; flags below override it.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report duplicate object keys as warnings instead of errors.
    #[arg(long, global = true)]
    pub allow_duplicate_properties: bool,

    /// Report conflicting operator definitions as warnings instead of errors.
    #[arg(long, global = true)]
    pub allow_invalid_operators: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile scripts and print every report. Directories are searched for `.among` files.
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the compiled values of a script as JSON.
    Ast {
        #[arg(required = true)]
        file: PathBuf,
        /// Print on a single line.
        #[arg(long)]
        compact: bool,
    },
    /// List the operators and macros a script exports.
    Macros {
        #[arg(required = true)]
        file: PathBuf,
    },
}
