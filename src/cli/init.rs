//! taskraffle init command implementation
//!
//! Creates the store directory and a default config at the root.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::storage::{CONFIG_FILE, STORE_DIR};

use super::{resolve_storage, GlobalOptions};

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    store_dir: bool,
}

pub fn run(options: &GlobalOptions) -> Result<()> {
    let storage = resolve_storage(options.root.as_deref())?;
    std::fs::create_dir_all(storage.root())?;

    let created_store_dir = !storage.is_initialized();
    storage.init()?;

    let config_path = storage.config_file();
    let created_config = !config_path.exists();
    if created_config {
        Config::default().save(&config_path)?;
    }

    let report = InitReport {
        root: storage.root().to_path_buf(),
        created: InitCreated {
            config: created_config,
            store_dir: created_store_dir,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }
    if created_store_dir {
        created_items.push(format!("{STORE_DIR}/"));
    }

    let header = if created_items.is_empty() {
        "taskraffle init: nothing to do"
    } else {
        "taskraffle init: initialized"
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("root", storage.root().display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("taskraffle add \"<title>\" --description \"<details>\"");
    human.push_next_step("taskraffle raffle");

    emit_success(options.output(), "init", &report, Some(&human))
}
