//! `version` — print version information.

use anyhow::Result;

pub fn run(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!(
            "{}",
            serde_json::json!({ "name": "hygon-deploy", "version": version })
        );
    } else {
        println!("hygon-deploy {version}");
    }
    Ok(())
}
