pub mod config;
pub mod select;
pub mod validate;

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use kmu2_select::{load_config, SelectionConfig, Variant};
use tracing::info;

/// Preset names accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantArg {
    Kmu2,
    OneTrack,
    OneTrackSelection,
}

impl From<VariantArg> for Variant {
    fn from(value: VariantArg) -> Self {
        match value {
            VariantArg::Kmu2 => Variant::Kmu2,
            VariantArg::OneTrack => Variant::OneTrack,
            VariantArg::OneTrackSelection => Variant::OneTrackSelection,
        }
    }
}

/// Either a YAML file or a named preset.
#[derive(Args, Debug, Clone)]
pub struct ConfigSource {
    /// YAML selection configuration; overrides `--variant`.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Preset used when no configuration file is given.
    #[arg(long, value_enum, default_value_t = VariantArg::Kmu2)]
    pub variant: VariantArg,
}

impl ConfigSource {
    /// Loads and validates the selected configuration.
    pub fn resolve(&self) -> Result<SelectionConfig, Box<dyn Error>> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => {
                let config = Variant::from(self.variant).config();
                config.validate()?;
                config
            }
        };
        info!(
            source = %self.describe(),
            downstream = config.downstream.len(),
            "selection configuration resolved"
        );
        Ok(config)
    }

    /// Human readable name of the configuration origin.
    pub fn describe(&self) -> String {
        match &self.config {
            Some(path) => path.display().to_string(),
            None => match self.variant.to_possible_value() {
                Some(value) => format!("preset:{}", value.get_name()),
                None => "preset".to_string(),
            },
        }
    }
}
