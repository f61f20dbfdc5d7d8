use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::process;

use crate::config::Settings;

/// Required directories that will be created if missing
const REQUIRED_DIRS: &[&str] = &[
    "website",
    "website/db",
    "website/static",
    "website/static/css",
    "website/static/img",
];

/// Settings each upstream needs, with what breaks without them.
const CREDENTIALS: &[(&[&str], &str)] = &[
    (
        &["contentful_space_id", "contentful_access_token"],
        "every CMS section will show as unavailable",
    ),
    (&["openai_api_key"], "the chat assistant will answer with an error"),
    (&["email_user", "email_pass"], "newsletter subscriptions will fail"),
    (&["admin_email"], "new subscribers will not be reported"),
];

/// Run all boot checks. Call this before Rocket launches.
/// Creates missing directories, warns about missing credentials, and
/// aborts if the database directory is unusable.
pub fn run(settings: &Settings) {
    info!("[boot] Portfolio boot check starting...");

    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Directories ─────────────────────────────────
    for dir in REQUIRED_DIRS {
        let path = Path::new(dir);
        if !path.exists() {
            match fs::create_dir_all(path) {
                Ok(_) => info!("[boot]   Created directory: {}", dir),
                Err(e) => {
                    error!("[boot]   FAILED to create directory {}: {}", dir, e);
                    errors += 1;
                }
            }
        }
    }

    // ── 2. Placeholder image ───────────────────────────
    let placeholder = Path::new("website/static/img/placeholder1.jpg");
    if !placeholder.exists() {
        warn!("[boot]   Missing {} (entries without an image will show a broken picture)", placeholder.display());
        warnings += 1;
    }

    // ── 3. Upstream credentials ────────────────────────
    for (keys, consequence) in CREDENTIALS {
        let missing: Vec<&str> = keys
            .iter()
            .filter(|k| settings.get(k).is_none())
            .copied()
            .collect();
        if !missing.is_empty() {
            warn!("[boot]   Not configured: {} ({})", missing.join(", "), consequence);
            warnings += 1;
        }
    }

    // ── 4. Database directory writable ──────────────────
    let db_path = settings.get_or("database_path", "website/db/portfolio.db");
    let db_dir = Path::new(&db_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if let Err(e) = fs::create_dir_all(db_dir) {
        error!("[boot]   Cannot create database directory {}: {}", db_dir.display(), e);
        errors += 1;
    } else {
        let test_file = db_dir.join(".write_test");
        match fs::write(&test_file, "test") {
            Ok(_) => {
                let _ = fs::remove_file(&test_file);
            }
            Err(e) => {
                error!("[boot]   Database directory not writable: {}", e);
                errors += 1;
            }
        }
    }

    // ── 5. Rocket.toml exists ───────────────────────────
    if !Path::new("Rocket.toml").exists() {
        info!("[boot]   Rocket.toml not found, using default config");
    }

    // ── Summary ─────────────────────────────────────────
    if errors > 0 {
        error!(
            "[boot] Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            errors, warnings
        );
        process::exit(1);
    }

    if warnings > 0 {
        warn!(
            "[boot] Boot check passed with {} warning(s). Some features may not work correctly.",
            warnings
        );
    } else {
        info!("[boot] Boot check passed. All systems go.");
    }
}
