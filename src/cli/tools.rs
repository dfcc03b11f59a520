use netpulse_tools::{ToolCatalog, ToolTier};

pub fn run() -> anyhow::Result<()> {
    let catalog = ToolCatalog::global();
    println!("🧰 NetPulse diagnostic tools ({})\n", catalog.len());

    for tier in ToolTier::ALL {
        println!("{}", tier.label());
        for tool in catalog.by_tier(tier) {
            println!("  {:<20} {}", tool.kind.id(), tool.name);
            println!("  {:<20} {}", "", tool.description);

            let params: Vec<String> = tool
                .parameters
                .iter()
                .map(|p| match &p.default {
                    Some(default) => format!("{}={}", p.name, default),
                    None => p.name.clone(),
                })
                .collect();
            if !params.is_empty() {
                println!("  {:<20} params: {}", "", params.join(", "));
            }
            if !tool.kind.aliases().is_empty() {
                println!("  {:<20} aliases: {}", "", tool.kind.aliases().join(", "));
            }
        }
        println!();
    }

    Ok(())
}
