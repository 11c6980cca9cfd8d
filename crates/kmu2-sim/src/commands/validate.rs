use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use kmu2_select::hash::stable_hash_string;
use kmu2_select::{load_config, SelectionPipeline};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// YAML selection configuration to check.
    #[arg(long)]
    pub config: PathBuf,
}

pub fn run(args: &ValidateArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config)?;
    let hash = stable_hash_string(&config)?;
    let pipeline = SelectionPipeline::new(config)?;
    println!("config_hash: {hash}");
    for (index, stage) in pipeline.stage_ids().iter().enumerate() {
        println!("{:>2} {stage}", index + 1);
    }
    Ok(())
}
