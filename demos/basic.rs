// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Edits a nested object through a staged view, inspects the pending changes and commits them.
//!
//! Run with `RUST_LOG=staged=trace cargo run --example basic` to see what the staging layer does.
use staged::{PropertyState, Staged, StagedValue, object};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = object! {
        "theme" => "light",
        "editor" => { "tabWidth" => 4, "legacyMode" => true },
        "draft" => "unsaved text"
    };
    let form = Staged::new(&settings)?;

    form.set("theme", "dark")?;
    form.set("plugins", object! {})?;
    form.delete("draft")?;
    let editor = form
        .get("editor")?
        .and_then(StagedValue::into_staged)
        .ok_or("editor settings are not an object")?;
    editor.set("tabWidth", 2)?;
    editor.delete("legacyMode")?;

    println!("live:   {}", settings.to_json()?);
    println!("staged: {}", form.to_json()?);
    for key in ["theme", "plugins", "draft", "editor"] {
        let state = form.property_state(key)?.map_or("-", |s| PropertyState::as_str(&s));
        println!("  {key:>8}: {state}");
    }

    form.commit()?;
    println!("committed: {}", settings.to_json()?);
    assert!(!form.changed()?);
    Ok(())
}
