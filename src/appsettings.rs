use config::{Config, ConfigError, Environment, File};
use sprout_models::settings::Settings;

/// Reads `appsettings`, then `appsettings.local`, then `APP__`-prefixed
/// environment variables, e.g. `APP__TELEGRAM__TOKEN`.
pub fn load() -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name("appsettings").required(true))
        .add_source(File::with_name("appsettings.local").required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}
