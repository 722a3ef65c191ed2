use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};

use sitewright_config::SitewrightConfig;
use sitewright_context::{
    ContextService, EvictionNoteSummarizer, SqliteSessionStore, get_pruning_stats, prune_messages,
};
use sitewright_types::{Message, PruningPolicy, Role, SessionKey};

type Service = ContextService<SqliteSessionStore>;

fn read_messages(path: &Path) -> Result<Vec<Message>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read messages from {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("{} is not a JSON array of messages", path.display()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn session_key(raw: &str) -> Result<SessionKey> {
    Ok(SessionKey::new(raw)?)
}

pub fn file_stats(path: &Path) -> Result<()> {
    let messages = read_messages(path)?;
    print_json(&get_pruning_stats(&messages))
}

pub fn prune_file(
    path: &Path,
    summary: Option<&str>,
    policy: &PruningPolicy,
    output: Option<&Path>,
) -> Result<()> {
    let messages = read_messages(path)?;
    let result = prune_messages(&messages, summary, policy);
    tracing::info!(
        input = messages.len(),
        pruned = result.pruned_count,
        token_count = result.token_count,
        "Pruned messages file"
    );

    match output {
        Some(out) => {
            let json = serde_json::to_string_pretty(&result)?;
            std::fs::write(out, json)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            eprintln!(
                "kept {} of {} messages (~{} tokens) -> {}",
                result.messages.len(),
                messages.len(),
                result.token_count,
                out.display()
            );
            Ok(())
        }
        None => print_json(&result),
    }
}

pub fn open_service(config: &SitewrightConfig, store: Option<PathBuf>) -> Result<Service> {
    let path = store
        .or_else(|| config.store_path())
        .ok_or_else(|| anyhow!("Could not determine session store path; pass --store"))?;
    let store = SqliteSessionStore::open(&path)?;
    Ok(ContextService::new(store, config.policy()).with_summarizer(EvictionNoteSummarizer))
}

pub fn list_sessions(service: &Service) -> Result<()> {
    for key in service.store().session_keys()? {
        println!("{key}");
    }
    Ok(())
}

pub fn show_session(service: &Service, key: &str) -> Result<()> {
    let key = session_key(key)?;
    let record = service
        .get_context(&key)?
        .ok_or_else(|| anyhow!("No session named {key}"))?;
    print_json(&record)
}

pub fn session_stats(service: &Service, key: &str) -> Result<()> {
    let key = session_key(key)?;
    let stats = service
        .context_stats(&key)?
        .ok_or_else(|| anyhow!("No session named {key}"))?;
    print_json(&stats)
}

pub fn append_message(service: &mut Service, key: &str, role: Role, content: String) -> Result<()> {
    let key = session_key(key)?;
    let outcome = service.append_message(&key, Message::new(role, content, SystemTime::now()))?;
    println!(
        "{key}: {} messages, ~{} tokens{}",
        outcome.record.len(),
        outcome.record.token_count,
        if outcome.pruned_count > 0 {
            format!(", pruned {}", outcome.pruned_count)
        } else {
            String::new()
        }
    );
    Ok(())
}

pub fn clear_session(service: &mut Service, key: &str) -> Result<()> {
    let key = session_key(key)?;
    if service.clear_context(&key)? {
        println!("cleared {key}");
    } else {
        println!("no session named {key}");
    }
    Ok(())
}
