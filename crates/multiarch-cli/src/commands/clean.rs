use multiarch_build::context::{self, CONTEXT_DIR};
use std::path::Path;

pub async fn clean() -> anyhow::Result<()> {
    if context::clean_context(Path::new("."))? {
        println!("Removed {CONTEXT_DIR}/");
    } else {
        println!("Nothing to clean");
    }
    Ok(())
}
