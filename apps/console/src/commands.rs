//! Line commands accepted by the interactive browser.

use shared::domain::{ColumnSet, NewPost, PostField, PostId, PostPatch};

pub const HELP: &str = "\
commands:
  page <n>                   jump to page n
  next | prev                move one page
  size <n>                   rows per page
  sort <field>               sort by field (repeat to flip direction)
  search <text>              filter rows (debounced); `search` alone clears
  cols <field,field,...>     choose visible columns
  toggle <field>             show or hide one column
  refresh                    reload the current page
  show <id>                  print one post in full
  new <title> | <author> | <body>
  edit <id> <field>=<value> | <field>=<value> ...
  delete <id>                delete after confirmation
  help | quit
fields: id, title, author, body, lastUpdated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Page(u32),
    Next,
    Previous,
    PageSize(u32),
    Sort(PostField),
    Search(String),
    Columns(ColumnSet),
    Toggle(PostField),
    Refresh,
    Show(PostId),
    Create(NewPost),
    Edit { post_id: PostId, patch: PostPatch },
    Delete(PostId),
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "page" => parse_positive(rest, "page").map(ConsoleCommand::Page),
        "next" | "n" => Ok(ConsoleCommand::Next),
        "prev" | "p" => Ok(ConsoleCommand::Previous),
        "size" => parse_positive(rest, "size").map(ConsoleCommand::PageSize),
        "sort" => parse_field(rest).map(ConsoleCommand::Sort),
        "search" | "/" => Ok(ConsoleCommand::Search(rest.to_string())),
        "cols" => rest
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(parse_field)
            .collect::<Result<ColumnSet, _>>()
            .map(ConsoleCommand::Columns),
        "toggle" => parse_field(rest).map(ConsoleCommand::Toggle),
        "refresh" | "r" => Ok(ConsoleCommand::Refresh),
        "show" => parse_id(rest).map(ConsoleCommand::Show),
        "new" => parse_new_post(rest).map(ConsoleCommand::Create),
        "edit" => parse_edit(rest),
        "delete" | "rm" => parse_id(rest).map(ConsoleCommand::Delete),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
        "" => Err("empty command; type `help`".to_string()),
        other => Err(format!("unknown command `{other}`; type `help`")),
    }
}

fn parse_positive(raw: &str, what: &str) -> Result<u32, String> {
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(format!("{what} needs a positive number")),
    }
}

fn parse_id(raw: &str) -> Result<PostId, String> {
    raw.parse::<i64>()
        .map(PostId)
        .map_err(|_| format!("`{raw}` is not a post id"))
}

fn parse_field(raw: &str) -> Result<PostField, String> {
    raw.parse::<PostField>().map_err(|err| err.to_string())
}

fn parse_new_post(raw: &str) -> Result<NewPost, String> {
    let parts: Vec<&str> = raw.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [title, author, body] => Ok(NewPost::new(*title, *author, *body)),
        _ => Err("usage: new <title> | <author> | <body>".to_string()),
    }
}

fn parse_edit(raw: &str) -> Result<ConsoleCommand, String> {
    let (id, assignments) = raw
        .split_once(char::is_whitespace)
        .ok_or_else(|| "usage: edit <id> <field>=<value> | ...".to_string())?;
    let post_id = parse_id(id)?;

    let mut patch = PostPatch::default();
    for assignment in assignments.split('|') {
        let (field, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("expected <field>=<value>, got `{}`", assignment.trim()))?;
        let value = Some(value.trim().to_string());
        match parse_field(field)? {
            PostField::Title => patch.title = value,
            PostField::Author => patch.author = value,
            PostField::Body => patch.body = value,
            other => return Err(format!("{other} is assigned by the server")),
        }
    }
    Ok(ConsoleCommand::Edit { post_id, patch })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_commands() {
        assert_eq!(parse_line("page 3"), Ok(ConsoleCommand::Page(3)));
        assert_eq!(parse_line("  NEXT "), Ok(ConsoleCommand::Next));
        assert!(parse_line("page 0").is_err());
        assert!(parse_line("size many").is_err());
    }

    #[test]
    fn search_keeps_inner_spaces_and_allows_clearing() {
        assert_eq!(
            parse_line("search rust  async"),
            Ok(ConsoleCommand::Search("rust  async".to_string()))
        );
        assert_eq!(parse_line("search"), Ok(ConsoleCommand::Search(String::new())));
    }

    #[test]
    fn parses_column_lists() {
        let expected: ColumnSet = [PostField::Title, PostField::Body].into_iter().collect();
        assert_eq!(parse_line("cols body, title"), Ok(ConsoleCommand::Columns(expected)));
        assert!(parse_line("cols title,secret").is_err());
    }

    #[test]
    fn parses_new_post_from_pipe_separated_fields() {
        assert_eq!(
            parse_line("new Hello world | Ann | First post"),
            Ok(ConsoleCommand::Create(NewPost::new("Hello world", "Ann", "First post")))
        );
        assert!(parse_line("new only a title").is_err());
    }

    #[test]
    fn parses_edit_assignments() {
        let parsed = parse_line("edit 7 title=New title | body=x=y").expect("edit");
        assert_eq!(
            parsed,
            ConsoleCommand::Edit {
                post_id: PostId(7),
                patch: PostPatch {
                    title: Some("New title".into()),
                    author: None,
                    body: Some("x=y".into()),
                },
            }
        );
        assert!(parse_line("edit 7 lastUpdated=now").is_err());
        assert!(parse_line("edit 7").is_err());
    }

    #[test]
    fn unknown_verbs_are_rejected() {
        assert!(parse_line("frobnicate").is_err());
        assert!(parse_line("").is_err());
    }
}
