use serde_json::Value;

use super::config::{current_server_url, load_environment_config};
use super::OutputFormat;

/// HTTP client carrying the stored bearer token, if any
pub fn api_client() -> anyhow::Result<(reqwest::Client, String)> {
    let base_url = current_server_url()?;
    let client = reqwest::Client::new();
    Ok((client, base_url))
}

pub fn bearer_token() -> anyhow::Result<Option<String>> {
    Ok(load_environment_config()?.token)
}

/// GET a path on the active server, attaching the token when present
pub async fn api_get(path: &str) -> anyhow::Result<Value> {
    let (client, base_url) = api_client()?;
    let mut request = client.get(format!("{}{}", base_url, path));
    if let Some(token) = bearer_token()? {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("request failed");
        anyhow::bail!("{} ({})", message, status);
    }

    Ok(body)
}

pub fn print_value(output_format: &OutputFormat, value: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => print_text(value, 0),
    }
    Ok(())
}

fn print_text(value: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}{}:", pad, key);
                        print_text(val, indent + 1);
                    }
                    _ => println!("{}{}: {}", pad, key, display_scalar(val)),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                print_text(item, indent);
                println!();
            }
        }
        other => println!("{}{}", pad, display_scalar(other)),
    }
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
