use std::error::Error;

use super::ConfigAction;
use crate::core::config::data::{path_display, SETTING_KEYS};
use crate::core::config::Config;

pub fn run(action: ConfigAction) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            config.print_all();
            println!();
            config.resolve().print_effective();
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            if let Err(err) = config.set_value(&key, &value) {
                eprintln!("❌ {err}");
                eprintln!("Known keys: {}", SETTING_KEYS.join(", "));
                return Err(Box::new(err));
            }
            config.save()?;
            println!("✅ Set {key} to: {value}");
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load()?;
            config.unset_value(&key)?;
            config.save()?;
            println!("✅ Unset {key}");
        }
        ConfigAction::Path => {
            println!("{}", path_display(Config::config_path()?));
        }
    }
    Ok(())
}
