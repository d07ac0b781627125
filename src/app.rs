use crate::cache::{
  CacheContext, CacheResult, CacheSource, ListEntry, ListKey, Pagination, ResourceCache,
  SelectedSlot,
};
use crate::commands::{self, Action, Command, COMMANDS};
use crate::config::{Config, ResourceConfig};
use crate::transport::HttpTransport;
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// What the shell should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
  Continue(String),
  Quit,
}

/// Shell state: one cache per resource, all sharing a session context
pub struct App {
  caches: BTreeMap<String, ResourceCache<Value>>,
  current: String,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let transport = HttpTransport::new(&config.server).map_err(|e| eyre!("{}", e))?;
    let context = CacheContext::new(transport).with_stale_time(config.stale_time());
    Self::with_context(&context, config.resources())
  }

  pub fn with_context(context: &CacheContext, resources: Vec<ResourceConfig>) -> Result<Self> {
    let current = resources
      .first()
      .map(|r| r.name.clone())
      .ok_or_else(|| eyre!("No resources configured"))?;

    let caches = resources
      .iter()
      .map(|r| (r.name.clone(), context.resource(r.to_def())))
      .collect();

    Ok(Self { caches, current })
  }

  pub fn current(&self) -> &str {
    &self.current
  }

  /// Switch resource by singular or plural name.
  pub fn select_resource(&mut self, name: &str) -> Result<()> {
    let found = self
      .caches
      .iter()
      .find(|(key, cache)| key.as_str() == name || cache.definition().plural == name)
      .map(|(key, _)| key.clone())
      .ok_or_else(|| eyre!("Unknown resource `{}`. Try `resources`.", name))?;
    self.current = found;
    Ok(())
  }

  fn cache(&self) -> Result<&ResourceCache<Value>> {
    self
      .caches
      .get(&self.current)
      .ok_or_else(|| eyre!("Unknown resource `{}`", self.current))
  }

  /// Run one command given as words, e.g. `["list", "author", "u1"]`.
  pub async fn execute(&mut self, words: &[String]) -> Result<Flow> {
    let Some((first, args)) = words.split_first() else {
      return Ok(Flow::Continue(String::new()));
    };

    let command =
      commands::resolve(first).map_err(|suggestions| unknown_command(first, &suggestions))?;
    debug!(command = command.name, ?args, resource = %self.current, "executing");

    let output = match command.action {
      Action::List => {
        let result = self.cache()?.fetch_list_if_needed(commands::parse_list_key(args)).await;
        render_result(&result)
      }
      Action::Get => {
        let id = required_arg(args, 0, command)?;
        let result = self.cache()?.fetch_single_if_needed(id).await;
        render_result(&result)
      }
      Action::Create => {
        let item = self.template_with(parse_json(required_arg(args, 0, command)?)?);
        let cache = self.cache()?;
        let result = cache.send_create(item).await;
        if let Some(id) = result.data.as_ref().and_then(|item| cache.definition().id_of(item)) {
          info!(resource = %self.current, %id, "created");
          cache.add_to_list(&id, ListKey::all());
        }
        render_result(&result)
      }
      Action::Update => {
        let item = parse_json(required_arg(args, 0, command)?)?;
        let result = self.cache()?.send_update(item).await;
        render_result(&result)
      }
      Action::Delete => {
        let id = required_arg(args, 0, command)?;
        let cache = self.cache()?;
        let result = cache.send_delete(id).await;
        if result.is_success() {
          cache.remove_from_all_lists(id);
          format!("deleted {}", id)
        } else {
          render_result(&result)
        }
      }
      Action::Invalidate => {
        let cache = self.cache()?;
        match args {
          [] => {
            cache.invalidate_selected();
            "invalidated selected".to_string()
          }
          [only] if only == "selected" => {
            cache.invalidate_selected();
            "invalidated selected".to_string()
          }
          _ => {
            let key = commands::parse_list_key(args);
            cache.invalidate_list(key.clone());
            format!("invalidated {}", key)
          }
        }
      }
      Action::Add => {
        let id = required_arg(args, 0, command)?;
        let key = commands::parse_list_key(&args[1..]);
        self.cache()?.add_to_list(id, key.clone());
        format!("added {} to {}", id, key)
      }
      Action::Remove => {
        let id = required_arg(args, 0, command)?;
        let key = commands::parse_list_key(&args[1..]);
        self.cache()?.remove_from_list(id, key.clone());
        format!("removed {} from {}", id, key)
      }
      Action::Filter => {
        let raw = required_arg(args, 0, command)?;
        let filter = if raw == "none" { None } else { Some(parse_json(raw)?) };
        let key = commands::parse_list_key(&args[1..]);
        self.cache()?.set_filter(filter, key.clone());
        format!("filter set on {}", key)
      }
      Action::Page => {
        let page = parse_number(required_arg(args, 0, command)?)?;
        let per = parse_number(required_arg(args, 1, command)?)?;
        let key = commands::parse_list_key(&args[2..]);
        self.cache()?.set_pagination(Some(Pagination { page, per }), key.clone());
        format!("page {} ({} per page) set on {}", page, per, key)
      }
      Action::Show => {
        let key = commands::parse_list_key(args);
        let cache = self.cache()?;
        match cache.list_entry(key.clone()) {
          Some(entry) => pretty(&json!({
            "list": key.to_string(),
            "status": entry_status(&entry),
            "items": cache.get_list(key),
          })),
          None => format!("no list at {}", key),
        }
      }
      Action::Selected => {
        let cache = self.cache()?;
        pretty(&json!({
          "status": slot_status(&cache.selected_slot()),
          "item": cache.get_selected(),
        }))
      }
      Action::Default => match self.cache()?.default_item() {
        Some(item) => pretty(&item),
        None => format!("{} has no template", self.current),
      },
      Action::Use => {
        self.select_resource(required_arg(args, 0, command)?)?;
        format!("using {}", self.current)
      }
      Action::Resources => self
        .caches
        .iter()
        .map(|(name, cache)| {
          let marker = if *name == self.current { "*" } else { " " };
          format!("{} {} ({})", marker, name, cache.definition().collection_address())
        })
        .collect::<Vec<_>>()
        .join("\n"),
      Action::Help => help_text(),
      Action::Quit => return Ok(Flow::Quit),
    };

    Ok(Flow::Continue(output))
  }

  /// Overlay user fields on the resource's template for new entities.
  fn template_with(&self, fields: Value) -> Value {
    let template = self.cache().ok().and_then(|c| c.default_item());
    match (template, fields) {
      (Some(Value::Object(mut base)), Value::Object(fields)) => {
        base.extend(fields);
        Value::Object(base)
      }
      (_, fields) => fields,
    }
  }

  /// Run a single command and print its output.
  pub async fn run_once(&mut self, words: &[String]) -> Result<()> {
    if let Flow::Continue(output) = self.execute(words).await? {
      if !output.is_empty() {
        println!("{}", output);
      }
    }
    Ok(())
  }

  /// Interactive loop over stdin lines until `quit` or end of input.
  pub async fn run(&mut self) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
      print!("yote:{}> ", self.current);
      std::io::stdout().flush()?;

      let Some(line) = lines.next_line().await? else {
        break;
      };

      let words = match commands::tokenize(&line) {
        Ok(words) => words,
        Err(e) => {
          eprintln!("error: {}", e);
          continue;
        }
      };

      match self.execute(&words).await {
        Ok(Flow::Quit) => break,
        Ok(Flow::Continue(output)) => {
          if !output.is_empty() {
            println!("{}", output);
          }
        }
        Err(e) => eprintln!("error: {}", e),
      }
    }

    Ok(())
  }
}

fn required_arg<'a>(args: &'a [String], index: usize, command: &Command) -> Result<&'a str> {
  args
    .get(index)
    .map(String::as_str)
    .ok_or_else(|| eyre!("usage: {}", command.usage))
}

fn parse_json(raw: &str) -> Result<Value> {
  serde_json::from_str(raw).map_err(|e| eyre!("Invalid JSON `{}`: {}", raw, e))
}

fn parse_number(raw: &str) -> Result<u32> {
  raw
    .parse()
    .map_err(|_| eyre!("Expected a positive number, got `{}`", raw))
}

fn unknown_command(input: &str, suggestions: &[&Command]) -> color_eyre::Report {
  if suggestions.is_empty() {
    eyre!("Unknown command `{}`. Try `help`.", input)
  } else {
    let names: Vec<&str> = suggestions.iter().map(|c| c.name).collect();
    eyre!("Ambiguous command `{}`: {}", input, names.join(", "))
  }
}

fn pretty<T: Serialize>(value: &T) -> String {
  serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {}>", e))
}

fn render_result<T: Serialize>(result: &CacheResult<T>) -> String {
  let source = match result.source {
    CacheSource::Network => "network",
    CacheSource::Cache => "cache",
    CacheSource::InFlight => "in flight",
    CacheSource::Local => "local",
  };

  match &result.error {
    Some(err) => format!("error: {} ({})", err, source),
    None => format!("{}\n({})", pretty(&result.data), source),
  }
}

fn entry_status(entry: &ListEntry) -> Value {
  json!({
    "isFetching": entry.is_fetching,
    "didInvalidate": entry.did_invalidate,
    "lastUpdated": entry.last_updated.map(|t| t.to_rfc3339()),
    "error": entry.error,
    "filter": entry.filter,
    "pagination": entry.pagination,
  })
}

fn slot_status(slot: &SelectedSlot) -> Value {
  json!({
    "id": slot.id,
    "isFetching": slot.is_fetching,
    "didInvalidate": slot.did_invalidate,
    "lastUpdated": slot.last_updated.map(|t| t.to_rfc3339()),
    "error": slot.error,
  })
}

fn help_text() -> String {
  let width = COMMANDS.iter().map(|c| c.usage.len()).max().unwrap_or(0);
  let mut lines: Vec<String> = COMMANDS
    .iter()
    .map(|c| format!("  {:width$}  {}", c.usage, c.description, width = width))
    .collect();
  lines.push(String::new());
  lines.push("A segment with commas is a sequence: `list tag a,b`.".to_string());
  lines.join("\n")
}
