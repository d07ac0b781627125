/// Shell commands, autocomplete logic and argument parsing
use crate::cache::{ListKey, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  List,
  Get,
  Create,
  Update,
  Delete,
  Invalidate,
  Add,
  Remove,
  Filter,
  Page,
  Show,
  Selected,
  Default,
  Use,
  Resources,
  Help,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
  pub action: Action,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "list",
    aliases: &["ls", "l"],
    usage: "list [segment...]",
    description: "Fetch a list if stale and print it",
    action: Action::List,
  },
  Command {
    name: "get",
    aliases: &["g", "fetch"],
    usage: "get <id>",
    description: "Fetch one entity if stale and print it",
    action: Action::Get,
  },
  Command {
    name: "create",
    aliases: &["c", "new"],
    usage: "create <json>",
    description: "Create an entity and add it to the `all` list",
    action: Action::Create,
  },
  Command {
    name: "update",
    aliases: &["u", "edit"],
    usage: "update <json>",
    description: "Update an entity in place",
    action: Action::Update,
  },
  Command {
    name: "delete",
    aliases: &["d", "rm"],
    usage: "delete <id>",
    description: "Delete an entity and drop it from every list",
    action: Action::Delete,
  },
  Command {
    name: "invalidate",
    aliases: &["inv", "refresh"],
    usage: "invalidate [selected | segment...]",
    description: "Force the next fetch of a list or the selection",
    action: Action::Invalidate,
  },
  Command {
    name: "add",
    aliases: &["push"],
    usage: "add <id> [segment...]",
    description: "Append an id to a list",
    action: Action::Add,
  },
  Command {
    name: "remove",
    aliases: &["pull"],
    usage: "remove <id> [segment...]",
    description: "Remove an id from a list",
    action: Action::Remove,
  },
  Command {
    name: "filter",
    aliases: &["f"],
    usage: "filter <json|none> [segment...]",
    description: "Store a filter on a list",
    action: Action::Filter,
  },
  Command {
    name: "page",
    aliases: &["p"],
    usage: "page <page> <per> [segment...]",
    description: "Store pagination on a list",
    action: Action::Page,
  },
  Command {
    name: "show",
    aliases: &["s", "status"],
    usage: "show [segment...]",
    description: "Print a cached list and its status without fetching",
    action: Action::Show,
  },
  Command {
    name: "selected",
    aliases: &["sel"],
    usage: "selected",
    description: "Print the selected entity and its status",
    action: Action::Selected,
  },
  Command {
    name: "default",
    aliases: &["template"],
    usage: "default",
    description: "Print the template for new entities",
    action: Action::Default,
  },
  Command {
    name: "use",
    aliases: &["r", "resource"],
    usage: "use <resource>",
    description: "Switch the current resource",
    action: Action::Use,
  },
  Command {
    name: "resources",
    aliases: &["res"],
    usage: "resources",
    description: "List configured resources",
    action: Action::Resources,
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "Show this help",
    action: Action::Help,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit yote",
    action: Action::Quit,
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Resolve a typed word to a command. Exact names and aliases always win;
/// a prefix only resolves when it is unambiguous.
pub fn resolve(input: &str) -> Result<&'static Command, Vec<&'static Command>> {
  let suggestions = get_suggestions(input);
  let lower = input.to_lowercase();

  match suggestions.as_slice() {
    [first, ..] if first.name == lower || first.aliases.contains(&lower.as_str()) => Ok(first),
    [only] if only.name.starts_with(&lower) => Ok(only),
    _ => Err(suggestions),
  }
}

/// Split a shell line into words. Quoted strings and balanced `{}` / `[]`
/// groups stay in one word so JSON arguments can contain spaces.
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
  let mut words = Vec::new();
  let mut current = String::new();
  let mut depth = 0usize;
  let mut quote: Option<char> = None;
  let mut escaped = false;

  for c in line.chars() {
    if let Some(q) = quote {
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == q {
        quote = None;
        if depth == 0 && q == '\'' {
          continue;
        }
      }
      if depth > 0 || q == '"' || c != q {
        current.push(c);
      }
      continue;
    }

    match c {
      '"' => {
        quote = Some(c);
        current.push(c);
      }
      '\'' if depth == 0 => quote = Some(c),
      '{' | '[' => {
        depth += 1;
        current.push(c);
      }
      '}' | ']' => {
        depth = depth.checked_sub(1).ok_or_else(|| format!("unbalanced `{}`", c))?;
        current.push(c);
      }
      c if c.is_whitespace() && depth == 0 => {
        if !current.is_empty() {
          words.push(std::mem::take(&mut current));
        }
      }
      c => current.push(c),
    }
  }

  if quote.is_some() {
    return Err("unterminated quote".to_string());
  }
  if depth > 0 {
    return Err("unbalanced brackets".to_string());
  }
  if !current.is_empty() {
    words.push(current);
  }

  Ok(words)
}

/// A word with commas is a sequence segment: `tag a,b` is `["tag", ["a","b"]]`.
pub fn parse_segment(word: &str) -> Segment {
  if word.contains(',') {
    Segment::Seq(
      word
        .split(',')
        .map(|part| part.trim().trim_matches('"').to_string())
        .collect(),
    )
  } else {
    Segment::Scalar(word.trim_matches('"').to_string())
  }
}

pub fn parse_list_key(words: &[String]) -> ListKey {
  ListKey::new(words.iter().map(|w| parse_segment(w)).collect())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(line: &str) -> Vec<String> {
    tokenize(line).unwrap()
  }

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("list");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "list");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("ls");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "list");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("inv");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "invalidate");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("lida");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "invalidate");
  }

  #[test]
  fn test_resolve() {
    assert_eq!(resolve("get").unwrap().action, Action::Get);
    assert_eq!(resolve("q").unwrap().action, Action::Quit);
    assert_eq!(resolve("upd").unwrap().action, Action::Update);
    // `re` prefixes remove, resources and refresh
    assert!(resolve("re").is_err());
    assert!(resolve("zzz").unwrap_err().is_empty());
  }

  #[test]
  fn test_tokenize_keeps_json_together() {
    assert_eq!(
      words(r#"create {"name": "tee shirt", "size": "m"}"#),
      vec!["create", r#"{"name": "tee shirt", "size": "m"}"#]
    );
    assert_eq!(words("  list   author  u1 "), vec!["list", "author", "u1"]);
    assert_eq!(words("filter 'red shirts' all"), vec!["filter", "red shirts", "all"]);
    assert!(tokenize("create {\"name\": 1").is_err());
    assert!(tokenize("get }").is_err());
  }

  #[test]
  fn test_parse_list_key() {
    let key = parse_list_key(&words("tag a,b"));
    assert_eq!(
      key.segments(),
      &[Segment::from("tag"), Segment::Seq(vec!["a".into(), "b".into()])]
    );
    assert!(parse_list_key(&[]).is_all());
  }
}
