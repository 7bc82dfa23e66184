use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tensormap::{MergeOptions, TensorMap};
use tracing::info;

mod synthetic;

use synthetic::SyntheticOptions;

#[derive(Parser)]
#[command(name = "tensormap")]
#[command(about = "Generate, inspect and merge stored tensor maps")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a synthetic per-atom tensor map with keys (l, center, neighbor)
    Generate {
        /// Output file
        output: PathBuf,

        /// Random seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Number of structures
        #[arg(long, default_value_t = 4)]
        structures: usize,

        /// Atoms per structure
        #[arg(long, default_value_t = 3)]
        atoms: usize,

        /// Largest angular channel l
        #[arg(long, default_value_t = 2)]
        max_l: i32,

        /// Properties per block
        #[arg(long, default_value_t = 4)]
        properties: usize,
    },

    /// Print the keys and block metadata of a stored tensor map
    Inspect {
        input: PathBuf,
    },

    /// Move a key variable into the property axis
    KeysToProperties {
        input: PathBuf,
        output: PathBuf,
        variable: String,

        /// Sort merged samples
        #[arg(long)]
        sort_samples: bool,
    },

    /// Move a key variable into the sample axis
    KeysToSamples {
        input: PathBuf,
        output: PathBuf,
        variable: String,

        /// Sort merged samples
        #[arg(long)]
        sort_samples: bool,
    },

    /// Sum every block over some sample variables
    SumOverSamples {
        input: PathBuf,
        output: PathBuf,

        #[arg(required = true)]
        variables: Vec<String>,
    },
}

fn load(path: &Path) -> Result<TensorMap<f64>> {
    tensormap_io::load(path).with_context(|| format!("failed to load {}", path.display()))
}

fn save(path: &Path, tensor: &TensorMap<f64>) -> Result<()> {
    tensormap_io::save(path, tensor).with_context(|| format!("failed to save {}", path.display()))
}

fn describe(tensor: &TensorMap<f64>) -> String {
    let mut out = format!(
        "TensorMap with {} blocks\nkeys: {}\n",
        tensor.len(),
        tensor.keys().names().join(", ")
    );
    for (key, block) in tensor.iter() {
        let gradients: Vec<&str> = block.gradient_parameters().collect();
        out.push_str(&format!(
            "  {:?}: samples ({}) x{}, components {:?}, properties ({}) x{}, values {:?}, gradients {:?}\n",
            key,
            block.samples().names().join(", "),
            block.samples().len(),
            block
                .components()
                .iter()
                .map(|c| c.names().join(", "))
                .collect::<Vec<_>>(),
            block.properties().names().join(", "),
            block.properties().len(),
            block.values().shape(),
            gradients,
        ));
    }
    out
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Generate {
            output,
            seed,
            structures,
            atoms,
            max_l,
            properties,
        } => {
            let options = SyntheticOptions {
                seed,
                n_structures: structures,
                atoms_per_structure: atoms,
                max_l,
                n_properties: properties,
            };
            let tensor = synthetic::generate(&options)?;
            save(&output, &tensor)?;
            info!(blocks = tensor.len(), path = %output.display(), "generated tensor map");
        }
        Command::Inspect { input } => {
            print!("{}", describe(&load(&input)?));
        }
        Command::KeysToProperties {
            input,
            output,
            variable,
            sort_samples,
        } => {
            let mut tensor = load(&input)?;
            let options = MergeOptions::default().with_sort_samples(sort_samples);
            tensor
                .keys_to_properties(&variable, &options)
                .with_context(|| format!("failed to move '{variable}' to properties"))?;
            save(&output, &tensor)?;
        }
        Command::KeysToSamples {
            input,
            output,
            variable,
            sort_samples,
        } => {
            let mut tensor = load(&input)?;
            let options = MergeOptions::default().with_sort_samples(sort_samples);
            tensor
                .keys_to_samples(&variable, &options)
                .with_context(|| format!("failed to move '{variable}' to samples"))?;
            save(&output, &tensor)?;
        }
        Command::SumOverSamples {
            input,
            output,
            variables,
        } => {
            let tensor = load(&input)?;
            let names: Vec<&str> = variables.iter().map(String::as_str).collect();
            let summed = tensor
                .sum_over_samples(&names)
                .with_context(|| format!("failed to sum over {names:?}"))?;
            save(&output, &summed)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Args::parse())
}
