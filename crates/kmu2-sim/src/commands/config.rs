use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use kmu2_select::serde::to_yaml_string;
use kmu2_select::Variant;

use super::VariantArg;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Preset to print.
    #[arg(long, value_enum, default_value_t = VariantArg::Kmu2)]
    pub variant: VariantArg,
    /// Write the YAML to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &ConfigArgs) -> Result<(), Box<dyn Error>> {
    let config = Variant::from(args.variant).config();
    let yaml = to_yaml_string(&config)?;
    match &args.out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, yaml)?;
        }
        None => print!("{yaml}"),
    }
    Ok(())
}
