//! Asks for tool-call confirmation on the terminal.

use relay_permissions::{PromptHandler, PromptResponse};
use relay_types::truncate_str;
use serde_json::{Map, Value};
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::pin::Pin;

const MAX_VALUE_BYTES: usize = 60;

pub struct TerminalPromptHandler;

impl PromptHandler for TerminalPromptHandler {
    fn prompt_permission<'a>(
        &'a self,
        tool_name: &'a str,
        arguments: &'a Map<String, Value>,
        description: &'a str,
    ) -> Pin<Box<dyn Future<Output = PromptResponse> + Send + 'a>> {
        let tool_name = tool_name.to_string();
        let description = description.to_string();
        let argument_lines = describe_arguments(arguments);

        Box::pin(async move {
            // stdin reads block
            let answer = tokio::task::spawn_blocking(move || {
                let mut err = io::stderr().lock();
                let _ = writeln!(err);
                let _ = writeln!(err, "  Tool call requested: {tool_name} ({description})");
                for line in &argument_lines {
                    let _ = writeln!(err, "    {line}");
                }
                let _ = write!(err, "  [y] Allow once  [a] Always allow  [n] Deny  > ");
                let _ = err.flush();

                let mut input = String::new();
                let _ = io::stdin().lock().read_line(&mut input);
                parse_answer(&input)
            })
            .await;

            answer.unwrap_or(PromptResponse::Deny)
        })
    }
}

fn parse_answer(input: &str) -> PromptResponse {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => PromptResponse::AllowOnce,
        "a" | "always" => PromptResponse::AlwaysAllow,
        _ => PromptResponse::Deny,
    }
}

/// One `key: value` line per argument, long values cut short.
fn describe_arguments(arguments: &Map<String, Value>) -> Vec<String> {
    arguments
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if text.len() > MAX_VALUE_BYTES {
                format!("{key}: {}...", truncate_str(&text, MAX_VALUE_BYTES))
            } else {
                format!("{key}: {text}")
            }
        })
        .collect()
}
