//! NVDA user configuration (`nvda.ini`).

use crate::pipeline::{
    Result,
    error::ErrorExt,
    settings::Settings,
    utils::fs,
};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::PathBuf;

const NVDA_INI_TEMPLATE: &str = include_str!("templates/nvda.ini.hbs");

/// Config schema understood by NVDA 2024.x.
const SCHEMA_VERSION: u32 = 13;

#[derive(Serialize)]
struct IniContext<'a> {
    schema_version: u32,
    synthesizer: &'a str,
    language: &'a str,
    logging_level: &'a str,
}

/// Renders the `nvda.ini` contents for `settings`.
pub fn render_nvda_ini(settings: &Settings) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);

    let context = IniContext {
        schema_version: SCHEMA_VERSION,
        synthesizer: settings.synthesizer(),
        language: "Windows",
        logging_level: "INFO",
    };
    Ok(handlebars.render_template(NVDA_INI_TEMPLATE, &context)?)
}

/// Writes `nvda.ini` into [`Settings::user_config_dir`].
///
/// Update checks, usage-stat prompts and the welcome dialog are switched off so that an
/// unattended instance never blocks on a dialog.
pub async fn write_nvda_config(settings: &Settings) -> Result<PathBuf> {
    let content = render_nvda_ini(settings)?;
    let path = settings.nvda_ini_path();

    fs::create_dir_all(settings.user_config_dir()).await?;
    tokio::fs::write(&path, content)
        .await
        .fs_context("writing NVDA configuration", &path)?;

    log::info!("Wrote NVDA configuration to {}", path.display());
    Ok(path)
}
