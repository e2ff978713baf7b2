pub mod assess;
pub mod deductions;
pub mod schedule;
pub mod tax;

use slab_tax_core::EngineConfig;

use crate::input;

/// Load an engine configuration override, if one was given.
pub fn load_config(path: Option<&str>) -> Result<Option<EngineConfig>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let config: EngineConfig = input::file::read_structured(path)?;
            config.validate()?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}
