use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::cli::SettingsUpdate;
use crate::client::ChatClient;
use crate::error::{Result, SEND_FALLBACK};
use crate::models::{ChatMessage, ChatRequest, StreamChunk};
use crate::settings::{ApiSettings, SettingsStore};
use crate::streaming::{StreamCallbacks, StreamOutcome};

/// Interactive chat loop over stdin.
pub async fn chat(client: &ChatClient, store: &SettingsStore, stream: bool) -> Result<()> {
    warn_if_unconfigured(store);

    let settings = store.settings();
    println!(
        "Chatting via {} ({}). /clear starts over, /exit quits.",
        settings.provider, settings.model_name
    );

    let mut transcript: Vec<ChatMessage> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                transcript.clear();
                println!("[conversation cleared]");
                continue;
            }
            input => transcript.push(ChatMessage::user(input)),
        }

        let request = settings.build_request(transcript.clone());
        match reply(client, request, stream).await {
            Some(content) => transcript.push(ChatMessage::assistant(content)),
            // Drop the unanswered turn so the next request stays well-formed
            None => {
                transcript.pop();
            }
        }
    }

    Ok(())
}

/// One-shot question. Returns whether a reply arrived.
pub async fn ask(
    client: &ChatClient,
    store: &SettingsStore,
    message: &str,
    stream: bool,
) -> Result<bool> {
    warn_if_unconfigured(store);

    let request = store
        .settings()
        .build_request(vec![ChatMessage::user(message)]);
    Ok(reply(client, request, stream).await.is_some())
}

pub async fn test_connection(client: &ChatClient, store: &SettingsStore) -> Result<()> {
    let result = client
        .test_connection(&store.settings().api_config())
        .await?;

    println!("{}: {}", result.status, result.message);
    if let Some(response) = result.response {
        println!("{}", response);
    }
    Ok(())
}

pub async fn health(client: &ChatClient) -> Result<()> {
    let health = client.health_check().await?;
    let base_url = &client.config().base_url;
    match health.timestamp {
        Some(ts) => println!("{}: {} ({})", base_url, health.status, ts),
        None => println!("{}: {}", base_url, health.status),
    }
    Ok(())
}

pub async fn info(client: &ChatClient) -> Result<()> {
    let info = client.get_info().await?;
    println!("{} v{} [{}]", info.message, info.version, info.status);
    Ok(())
}

pub async fn config_get(client: &ChatClient, provider: &str) -> Result<()> {
    let config = client.get_config(provider).await?;
    println!("provider = {}", config.provider);
    println!("api_key  = {}", config.api_key);
    println!("base_url = {}", config.base_url);
    println!("model    = {}", config.model);
    Ok(())
}

pub async fn config_save(client: &ChatClient, store: &SettingsStore) -> Result<()> {
    let response = client.save_config(&store.settings().api_config()).await?;
    match response.get("message").and_then(|m| m.as_str()) {
        Some(message) => println!("{}", message),
        None => println!("{}", serde_json::to_string_pretty(&response)?),
    }
    Ok(())
}

pub fn settings_show(store: &SettingsStore) -> Result<()> {
    let mut shown = store.settings().clone();
    shown.api_key = mask_key(&shown.api_key);

    println!("# {}", store.path().display());
    print!("{}", toml::to_string_pretty(&shown)?);
    if !store.is_configured() {
        println!("# incomplete: API key and base URL are required outside demo mode");
    }
    Ok(())
}

pub fn settings_set(store: &mut SettingsStore, update: SettingsUpdate) -> Result<()> {
    let settings = apply_update(store.settings().clone(), update);
    store.save(settings)?;
    println!("Settings saved to {}", store.path().display());
    Ok(())
}

async fn reply(client: &ChatClient, request: ChatRequest, stream: bool) -> Option<String> {
    if !stream {
        return match client.send_chat(&request).await {
            Ok(response) => {
                println!("{}", response.message.content);
                Some(response.message.content)
            }
            Err(e) => {
                eprintln!("Error: {}", e.user_message_or(SEND_FALLBACK));
                None
            }
        };
    }

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut text = String::new();
    let outcome = {
        let mut handler = StreamCallbacks::new(
            |chunk: StreamChunk| {
                print!("{}", chunk.content);
                let _ = io::stdout().flush();
                text.push_str(&chunk.content);
            },
            |message: String| eprintln!("\nError: {}", message),
            || println!(),
        );
        client.stream_chat(request, &mut handler, &cancel).await
    };
    interrupt.abort();

    match outcome {
        StreamOutcome::Completed => Some(text),
        StreamOutcome::Errored(_) => None,
        StreamOutcome::Cancelled => {
            println!("\n[stopped]");
            None
        }
    }
}

fn apply_update(mut settings: ApiSettings, update: SettingsUpdate) -> ApiSettings {
    if let Some(provider) = update.provider {
        settings.provider = provider;
    }
    if let Some(api_key) = update.api_key {
        settings.api_key = api_key;
    }
    if let Some(base_url) = update.provider_url {
        settings.base_url = base_url;
    }
    if let Some(model) = update.model {
        settings.model_name = model;
    }
    if let Some(temperature) = update.temperature {
        settings.temperature = temperature;
    }
    if let Some(max_tokens) = update.max_tokens {
        settings.max_tokens = max_tokens;
    }
    settings
}

fn warn_if_unconfigured(store: &SettingsStore) {
    if !store.is_configured() {
        eprintln!("Settings incomplete, run `ai-chat settings set` to add an API key and base URL");
    }
}

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        let visible: String = key.chars().take(4).collect();
        format!("{}***", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_update_keeps_unset_fields() {
        let update = SettingsUpdate {
            provider: Some("openai".to_string()),
            api_key: Some("sk-abc".to_string()),
            ..SettingsUpdate::default()
        };
        let settings = apply_update(ApiSettings::default(), update);

        assert_eq!(settings.provider, "openai");
        assert_eq!(settings.api_key, "sk-abc");
        assert_eq!(settings.model_name, "demo-model");
        assert_eq!(settings.max_tokens, 2048);
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key(""), "");
        assert_eq!(mask_key("sk-1234567"), "sk-1***");
        assert_eq!(mask_key("ab"), "ab***");
    }
}
