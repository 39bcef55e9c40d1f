//! coriolis-inspect - dump the structure of a NetCDF product.
//!
//! Prints dimensions, variables, attributes and the chunk layout the reader
//! would use, without realizing any data.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use coriolis::logging::log_dataset_stats;
use coriolis::readers::open_dataset;
use coriolis::{init_tracing, Args, AttributeValue, Config};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, path) = Config::from_args(args)?;
    config.validate()?;
    init_tracing(&config.log_level);

    info!("Inspecting product: {}", path.display());

    let ds = open_dataset(&path, &config.chunks)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let names: Vec<&str> = ds.variable_names().map(|n| n.as_str()).collect();
    let dim_details = ds
        .dims()
        .into_iter()
        .map(|(name, size)| format!("{}={}", name, size))
        .collect::<Vec<_>>()
        .join(", ");
    log_dataset_stats(&path.display().to_string(), ds.len(), &names, &dim_details);

    println!("Dimensions:");
    let mut dims: Vec<_> = ds.dims().into_iter().collect();
    dims.sort();
    for (name, size) in dims {
        println!("  {} = {}", name, size);
    }

    println!("\nVariables:");
    let mut names: Vec<_> = ds.variable_names().collect();
    names.sort();
    for name in names {
        let var = ds.get_variable_checked(name)?;
        println!(
            "  {} ({}) [{}]",
            name,
            var.dtype(),
            var.dims().join(", ")
        );
        let blocks: Vec<String> = (0..var.ndim())
            .map(|axis| var.chunks().nblocks(axis).to_string())
            .collect();
        println!("    shape: {:?}, blocks per dim: [{}]", var.shape(), blocks.join(", "));
        for (key, value) in &var.attrs {
            println!("    {}: {}", key, format_attr(value));
        }
    }

    if !ds.attrs.is_empty() {
        println!("\nGlobal Attributes:");
        for (key, value) in &ds.attrs {
            println!("  {}: {}", key, format_attr(value));
        }
    }

    Ok(())
}

fn format_attr(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Text(s) => s.clone(),
        AttributeValue::Number(n) => n.to_string(),
        AttributeValue::NumberArray(v) => format!("{:?}", v),
    }
}
