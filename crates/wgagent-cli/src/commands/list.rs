use anyhow::Result;
use wgagent_core::Subcommand;

pub fn run(json: bool) -> Result<()> {
    if json {
        let table: Vec<_> = Subcommand::ALL
            .iter()
            .map(|sub| {
                serde_json::json!({
                    "name": sub,
                    "params": sub.params(),
                    "description": sub.description(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    let width = Subcommand::ALL
        .iter()
        .map(|sub| sub.name().len())
        .max()
        .unwrap_or(0);

    for sub in Subcommand::ALL {
        let params = sub
            .params()
            .iter()
            .map(|p| format!("<{}>", p))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{:<width$}  {:<40}  {}", sub.name(), params, sub.description(), width = width);
    }

    Ok(())
}
