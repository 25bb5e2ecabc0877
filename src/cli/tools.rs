//! `ferret tools`: configured servers and live tool catalogs.

use anyhow::Result;
use colored::Colorize;

use crate::config::{builtin_description, Config};
use crate::mcp::McpClient;

pub(crate) async fn handle_tools(config: &Config, server: Option<&str>) -> Result<()> {
    match server {
        None => {
            if config.servers.is_empty() {
                println!("{}", "No MCP servers configured.".dimmed());
                return Ok(());
            }
            for (name, server) in &config.servers {
                let launch = if server.args.is_empty() {
                    server.command.clone()
                } else {
                    format!("{} {}", server.command, server.args.join(" "))
                };
                println!("{} {}", format!("{:<14}", name).cyan().bold(), launch.dimmed());
                if let Some(docs) = server
                    .description
                    .as_deref()
                    .or_else(|| builtin_description(name))
                {
                    for line in docs.lines() {
                        println!("{:14} {}", "", line);
                    }
                }
            }
            println!();
            println!("Query a server's live catalog with: {}", "ferret tools <server>".cyan());
            Ok(())
        }
        Some(name) => {
            let client = McpClient::new(config);
            eprintln!("{} {}", "starting".dimmed(), name.cyan());
            let tools = client.list_tools(name).await?;
            if tools.is_empty() {
                println!("{}", "Server advertises no tools.".dimmed());
            }
            for tool in &tools {
                println!("{}", tool.name.bold());
                if let Some(desc) = &tool.description {
                    for line in desc.lines().filter(|l| !l.trim().is_empty()) {
                        println!("  {}", line.trim());
                    }
                }
                if let Some(schema) = &tool.input_schema {
                    println!("  {} {}", "args:".dimmed(), schema.to_string().dimmed());
                }
            }
            Ok(())
        }
    }
}
