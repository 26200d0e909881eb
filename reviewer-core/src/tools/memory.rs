// reviewer-core/src/tools/memory.rs
use crate::context::ToolContext;
use crate::errors::ToolError;
use serde::Deserialize;

const PREVIEW_CHARS: usize = 50;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemoryAction {
    Set,
    Get,
    List,
    Delete,
    Search,
    Clear,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MemoryArgs {
    pub action: MemoryAction,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Substring for `search`.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Also write the entry to the memory file (`set` only).
    #[serde(default)]
    pub persist: bool,
}

fn required<'a>(value: &'a Option<String>, field: &str, action: &str) -> Result<&'a str, ToolError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ToolError::invalid(field, format!("required for the {} action", action)))
}

fn not_found(key: &str) -> String {
    format!("❌ Memory: Key '{}' not found", key)
}

pub fn memory(ctx: &ToolContext, args: &MemoryArgs) -> Result<String, ToolError> {
    let store = &ctx.memory;
    match args.action {
        MemoryAction::Set => {
            let key = required(&args.key, "key", "set")?;
            let value = required(&args.value, "value", "set")?;
            store.set(key, value, args.tags.clone(), args.persist)?;
            Ok(format!("✅ Memory: Set '{}' = '{}'", key, preview(value)))
        }
        MemoryAction::Get => {
            let key = required(&args.key, "key", "get")?;
            Ok(match store.get(key) {
                Some(entry) if entry.tags.is_empty() => format!("✅ Memory: '{}' = '{}'", key, entry.value),
                Some(entry) => format!(
                    "✅ Memory: '{}' = '{}' [{}]",
                    key,
                    entry.value,
                    entry.tags.join(", ")
                ),
                None => not_found(key),
            })
        }
        MemoryAction::List => {
            if store.is_empty() {
                return Ok("✅ Memory: No entries stored".to_string());
            }
            let keys = store.keys(&args.tags);
            if keys.is_empty() {
                return Ok(format!("✅ Memory: No entries found with tags: {}", args.tags.join(", ")));
            }
            Ok(format!("✅ Memory: {} entries | Keys: {}", keys.len(), keys.join(", ")))
        }
        MemoryAction::Delete => {
            let key = required(&args.key, "key", "delete")?;
            Ok(if store.delete(key)? {
                format!("✅ Memory: Deleted '{}'", key)
            } else {
                not_found(key)
            })
        }
        MemoryAction::Search => {
            let pattern = required(&args.pattern, "pattern", "search")?;
            let keys = store.search(pattern);
            if keys.is_empty() {
                return Ok(format!("✅ Memory: No entries matching '{}'", pattern));
            }
            Ok(format!(
                "✅ Memory: Found {} entries matching '{}' | Keys: {}",
                keys.len(),
                pattern,
                keys.join(", ")
            ))
        }
        MemoryAction::Clear => Ok(format!("✅ Memory: Cleared {} entries", store.clear()?)),
    }
}

/// First 50 characters, with `...` appended when cut.
fn preview(value: &str) -> String {
    if value.chars().count() > PREVIEW_CHARS {
        format!("{}...", value.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        value.to_string()
    }
}
