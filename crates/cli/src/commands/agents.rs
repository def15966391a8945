//! `devloop agents`: List registered agent kinds.

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = devloop_agent::default_registry()?;
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}
