//! Implementation of `pim init`.

use anyhow::Result;
use std::path::Path;

use crate::output::{Formatter, OutputFormat};
use pim_core::config::PimConfig;
use pim_core::core::CoreContext;

use super::helpers::core_error;

/// Create `.pim/` with a config, an administrator token and the stock
/// templates. Re-running keeps the existing config and only re-seeds
/// templates that are missing.
#[tracing::instrument(skip(root, format))]
pub fn run_init(root: &Path, admin_name: &str, format: OutputFormat) -> Result<()> {
    let config_path = PimConfig::config_path(root);
    let created = !config_path.exists();

    let config = if created {
        let config = PimConfig::initial(admin_name)?;
        config.save(root)?;
        tracing::info!(path = %config_path.display(), "wrote pim config");
        config
    } else {
        PimConfig::load(root)?
    };

    let ctx = CoreContext::with_config(root, config);
    let db = ctx.open_db().map_err(core_error)?;
    let seeded = db
        .templates()
        .seed(&ctx.config().templates)
        .map_err(core_error)?;

    let admin_token = ctx
        .config()
        .principals
        .first()
        .filter(|_| created)
        .map(|p| p.token.clone());

    let formatter = Formatter::new(format);
    match format {
        OutputFormat::Json => formatter.print(&serde_json::json!({
            "root": root.display().to_string(),
            "database": ctx.db_path().display().to_string(),
            "created": created,
            "templates_seeded": seeded,
            "admin_token": admin_token,
        }))?,
        OutputFormat::Text => {
            if created {
                println!("Initialized pim in {}", PimConfig::pim_dir(root).display());
            } else {
                println!("pim already initialized in {}", PimConfig::pim_dir(root).display());
            }
            if seeded > 0 {
                println!("Seeded {seeded} template(s)");
            }
            if let Some(token) = admin_token {
                println!();
                println!("Administrator token (store it; it is not shown again):");
                println!("  {token}");
                println!();
                println!("Use it with --token or PIM_TOKEN.");
            }
        }
    }
    Ok(())
}
