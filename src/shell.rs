//! Line-oriented front end.
//!
//! Reads one command per line and prints the result. While a command waits
//! on a confirmation, the next input line is taken as the answer.

use crate::workspace::{
    ConnectionUpdate, EditorPhase, PendingConfirmation, SaveOutcome, SelectOutcome, TreeView,
    Workspace,
};

use anyhow::{Context, Result, anyhow, bail};
use kvdesk_core::format::{ContentFormat, PREVIEW_MAX_CHARS, format_ttl, truncate_preview};
use kvdesk_core::keys::ROOT;
use kvdesk_core::types::{Connection, Credentials};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const HELP: &str = "\
connections:
  conns                          list connections
  sync                           re-list connections from the service
  add <name> <url>[,<url>..] [user:pass]
  rename-conn <conn> <new-name>
  connect <conn> | disconnect <conn> | remove <conn>
  use <conn> | use none          choose the connection to browse
keys:
  root                           reload the tree root
  tree [filter]                  show the cached tree, optionally filtered
  expand <dir> | collapse <dir> | refresh <dir>
  open <key>                     open a key in the editor
  new <dir> <name> [value]       create a key (a name ending in / makes a directory)
  mv <from> <to> [--force] | cp <from> <to> [--force]
  rm <key>
  batch                          arm/disarm multi-select
  mark <path> | rm-marked
editor:
  show | set <value> | format <json|yaml|text> | ttl <secs>
  revert | check | save | close | delete
  history | preview <rev> | rollback <rev>
  help | quit";

/// A parsed input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Conns,
    Sync,
    Add {
        name: String,
        endpoints: Vec<String>,
        credentials: Option<Credentials>,
    },
    RenameConn { conn: String, name: String },
    Connect(String),
    Disconnect(String),
    Remove(String),
    Use(Option<String>),
    Root,
    Tree(String),
    Expand(String),
    Collapse(String),
    Refresh(String),
    Open(String),
    New { dir: String, name: String, value: String },
    Move { from: String, to: String, force: bool },
    Copy { from: String, to: String, force: bool },
    Rm(String),
    Batch,
    Mark(String),
    RmMarked,
    Show,
    Set(String),
    Format(ContentFormat),
    Ttl(i64),
    Revert,
    Check,
    Save,
    Close,
    Delete,
    History,
    Preview(i64),
    Rollback(i64),
}

/// Unescape `\n` and `\t` so multi-line values fit on one input line.
fn unescape(value: &str) -> String {
    value.replace("\\n", "\n").replace("\\t", "\t")
}

fn parse_credentials(raw: &str) -> Result<Credentials> {
    let (username, password) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("credentials must look like user:pass"))?;
    Ok(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

fn parse_revision(raw: Option<&str>) -> Result<i64> {
    raw.context("missing revision")?
        .parse()
        .with_context(|| format!("invalid revision: {}", raw.unwrap_or_default()))
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();
        let arg = |name: &str, value: Option<&str>| -> Result<String> {
            value
                .map(str::to_string)
                .ok_or_else(|| anyhow!("missing {}", name))
        };

        let command = match word {
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "conns" => Command::Conns,
            "sync" => Command::Sync,
            "add" => {
                let name = arg("name", args.next())?;
                let endpoints = arg("endpoint", args.next())?
                    .split(',')
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect();
                let credentials = args.next().map(parse_credentials).transpose()?;
                Command::Add {
                    name,
                    endpoints,
                    credentials,
                }
            }
            "rename-conn" => Command::RenameConn {
                conn: arg("connection", args.next())?,
                name: arg("name", args.next())?,
            },
            "connect" => Command::Connect(arg("connection", args.next())?),
            "disconnect" => Command::Disconnect(arg("connection", args.next())?),
            "remove" => Command::Remove(arg("connection", args.next())?),
            "use" => match arg("connection", args.next())?.as_str() {
                "none" | "-" => Command::Use(None),
                conn => Command::Use(Some(conn.to_string())),
            },
            "root" => Command::Root,
            "tree" => Command::Tree(rest.to_string()),
            "expand" => Command::Expand(args.next().unwrap_or(ROOT).to_string()),
            "collapse" => Command::Collapse(arg("directory", args.next())?),
            "refresh" => Command::Refresh(args.next().unwrap_or(ROOT).to_string()),
            "open" => Command::Open(arg("key", args.next())?),
            "new" => {
                let dir = arg("directory", args.next())?;
                let name = arg("name", args.next())?;
                let value = args.collect::<Vec<_>>().join(" ");
                Command::New {
                    dir,
                    name,
                    value: unescape(&value),
                }
            }
            "mv" | "cp" => {
                let from = arg("source", args.next())?;
                let to = arg("destination", args.next())?;
                let force = matches!(args.next(), Some("--force" | "-f"));
                if word == "mv" {
                    Command::Move { from, to, force }
                } else {
                    Command::Copy { from, to, force }
                }
            }
            "rm" => Command::Rm(arg("key", args.next())?),
            "batch" => Command::Batch,
            "mark" => Command::Mark(arg("path", args.next())?),
            "rm-marked" => Command::RmMarked,
            "show" => Command::Show,
            "set" => Command::Set(unescape(rest)),
            "format" => Command::Format(
                arg("format", args.next())?
                    .parse()
                    .map_err(|e: String| anyhow!(e))?,
            ),
            "ttl" => Command::Ttl(
                arg("seconds", args.next())?
                    .parse()
                    .context("ttl must be a number of seconds")?,
            ),
            "revert" => Command::Revert,
            "check" => Command::Check,
            "save" => Command::Save,
            "close" => Command::Close,
            "delete" => Command::Delete,
            "history" => Command::History,
            "preview" => Command::Preview(parse_revision(args.next())?),
            "rollback" => Command::Rollback(parse_revision(args.next())?),
            other => bail!("unknown command: {} (try 'help')", other),
        };
        Ok(Some(command))
    }
}

fn describe_connection(conn: &Connection, active: Option<&str>) -> String {
    let marker = if active == Some(conn.id.as_str()) { "*" } else { " " };
    format!(
        "{} {} [{}] {} ({})",
        marker,
        conn.name,
        conn.status.display_name(),
        conn.endpoints.join(","),
        conn.id
    )
}

fn render_tree(views: &[TreeView], depth: usize, marked: &[String], out: &mut String) {
    for view in views {
        let node = &view.node;
        let mark = if marked.contains(&node.path) { "[x] " } else { "" };
        let _ = write!(out, "{}{}{}", "  ".repeat(depth), mark, node.label);
        if node.is_dir {
            out.push_str(if view.expanded { "/" } else { "/ +" });
        } else if let Some(value) = node.value.as_deref() {
            let _ = write!(
                out,
                " = {}",
                truncate_preview(&value.replace('\n', " "), PREVIEW_MAX_CHARS)
            );
        }
        if node.ttl > 0 {
            let _ = write!(out, " (ttl {})", format_ttl(node.ttl));
        }
        out.push('\n');
        render_tree(&view.children, depth + 1, marked, out);
    }
}

/// Interactive command loop over a [`Workspace`].
pub struct Shell {
    workspace: Arc<Workspace>,
    confirmations: async_channel::Receiver<PendingConfirmation>,
}

impl Shell {
    pub fn new(
        workspace: Arc<Workspace>,
        confirmations: async_channel::Receiver<PendingConfirmation>,
    ) -> Self {
        Self {
            workspace,
            confirmations,
        }
    }

    /// Find a connection by id or by name.
    fn resolve(&self, conn: &str) -> Result<Connection> {
        let connections = self.workspace.registry().list();
        connections
            .iter()
            .find(|c| c.id == conn)
            .or_else(|| connections.iter().find(|c| c.name == conn))
            .cloned()
            .ok_or_else(|| anyhow!("no connection named {}", conn))
    }

    fn connections(&self) -> String {
        let active = self.workspace.registry().active_id();
        let list = self.workspace.registry().list();
        if list.is_empty() {
            return "(no connections)".to_string();
        }
        list.iter()
            .map(|c| describe_connection(c, active.as_deref()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn tree(&self, filter: &str) -> String {
        let views = self.workspace.browser().filter(filter);
        if views.is_empty() {
            return "(empty)".to_string();
        }
        let marked = self.workspace.browser().marked();
        let mut out = String::new();
        render_tree(&views, 0, &marked, &mut out);
        out.trim_end().to_string()
    }

    fn show_editor(&self) -> String {
        let snap = self.workspace.editor().snapshot();
        let Some(key) = snap.key.as_deref() else {
            return "(no key open)".to_string();
        };
        let state = match snap.phase {
            EditorPhase::Empty => "empty",
            EditorPhase::Loading => "loading",
            EditorPhase::Clean => "clean",
            EditorPhase::Dirty => "modified",
        };
        let mut out = format!(
            "{} [{}] {} ttl: {}\n{}",
            key,
            state,
            snap.format.display_name(),
            format_ttl(snap.ttl),
            snap.working
        );
        if let Some(rev) = snap.preview {
            let _ = write!(
                out,
                "\n--- revision {} (version {}) ---\n{}",
                rev.revision, rev.version, rev.value
            );
        }
        out
    }

    /// Run one command and describe the result.
    pub async fn execute(&self, command: Command) -> Result<String> {
        let ws = &self.workspace;
        let out = match command {
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
            Command::Conns => self.connections(),
            Command::Sync => {
                ws.refresh_connections().await?;
                self.connections()
            }
            Command::Add {
                name,
                endpoints,
                credentials,
            } => {
                let conn = ws.add_connection(&name, endpoints, credentials).await?;
                format!("added {} ({})", conn.name, conn.id)
            }
            Command::RenameConn { conn, name } => {
                let conn = self.resolve(&conn)?;
                let update = ConnectionUpdate {
                    name: Some(name),
                    ..ConnectionUpdate::default()
                };
                let conn = ws.update_connection(&conn.id, update).await?;
                format!("renamed to {}", conn.name)
            }
            Command::Connect(conn) => {
                let conn = self.resolve(&conn)?;
                let conn = ws.connect(&conn.id).await?;
                format!("{} is {}", conn.name, conn.status.display_name())
            }
            Command::Disconnect(conn) => {
                let conn = self.resolve(&conn)?;
                let conn = ws.disconnect(&conn.id).await?;
                format!("{} is {}", conn.name, conn.status.display_name())
            }
            Command::Remove(conn) => {
                let conn = self.resolve(&conn)?;
                ws.remove_connection(&conn.id).await?;
                format!("removed {}", conn.name)
            }
            Command::Use(None) => {
                ws.set_active(None).await?;
                "no active connection".to_string()
            }
            Command::Use(Some(conn)) => {
                let conn = self.resolve(&conn)?;
                if ws.editor().is_dirty() {
                    log::warn!("Switching connections discards unsaved edits");
                }
                ws.set_active(Some(&conn.id)).await?;
                self.tree("")
            }
            Command::Root => {
                ws.load_root().await?;
                self.tree("")
            }
            Command::Tree(filter) => self.tree(&filter),
            Command::Expand(dir) => {
                ws.expand(&dir).await?;
                self.tree("")
            }
            Command::Collapse(dir) => {
                ws.collapse(&dir);
                self.tree("")
            }
            Command::Refresh(dir) => {
                ws.refresh(&dir).await?;
                self.tree("")
            }
            Command::Open(key) => match ws.select(&key).await? {
                SelectOutcome::Opened => self.show_editor(),
                SelectOutcome::Declined => "kept unsaved changes".to_string(),
                SelectOutcome::Superseded => "another key was opened first".to_string(),
                SelectOutcome::Directory => {
                    ws.expand(&key).await?;
                    self.tree("")
                }
            },
            Command::New { dir, name, value } => {
                let key = ws.create_key(&dir, &name, &value, None).await?;
                format!("created {}", key)
            }
            Command::Move { from, to, force } => {
                ws.rename_key(&from, &to, force).await?;
                format!("renamed {} to {}", from, to)
            }
            Command::Copy { from, to, force } => {
                ws.copy_key(&from, &to, force).await?;
                format!("copied {} to {}", from, to)
            }
            Command::Rm(key) => {
                let deleted = ws.delete_key(&key).await?;
                format!("deleted {} key(s)", deleted)
            }
            Command::Batch => {
                if ws.browser().toggle_batch() {
                    "batch mode on".to_string()
                } else {
                    "batch mode off".to_string()
                }
            }
            Command::Mark(path) => {
                if ws.browser().toggle_mark(&path)? {
                    format!("marked {}", path)
                } else {
                    format!("unmarked {}", path)
                }
            }
            Command::RmMarked => {
                let deleted = ws.batch_delete_marked().await?;
                format!("deleted {} key(s)", deleted)
            }
            Command::Show => self.show_editor(),
            Command::Set(value) => {
                ws.editor().set_content(value)?;
                self.show_editor()
            }
            Command::Format(format) => {
                ws.editor().set_format(format)?;
                format!("format: {}", format.display_name())
            }
            Command::Ttl(ttl) => {
                ws.editor().set_ttl(ttl)?;
                format!("ttl: {}", format_ttl(ttl))
            }
            Command::Revert => {
                ws.editor().revert()?;
                self.show_editor()
            }
            Command::Check => ws
                .editor()
                .check()
                .unwrap_or_else(|| "no problems found".to_string()),
            Command::Save => match ws.save().await? {
                SaveOutcome::Saved => "saved".to_string(),
                SaveOutcome::Detached => {
                    "saved (editor has moved to another key)".to_string()
                }
            },
            Command::Close => {
                if ws.close_key().await {
                    "closed".to_string()
                } else {
                    "kept unsaved changes".to_string()
                }
            }
            Command::Delete => {
                let deleted = ws.delete_open_key().await?;
                format!("deleted {} key(s)", deleted)
            }
            Command::History => {
                let history = ws.load_history().await?;
                if history.is_empty() {
                    "(no history)".to_string()
                } else {
                    history
                        .iter()
                        .map(|r| {
                            format!(
                                "rev {} v{}: {}",
                                r.revision,
                                r.version,
                                truncate_preview(&r.value.replace('\n', " "), PREVIEW_MAX_CHARS)
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Command::Preview(rev) => {
                ws.editor().preview_revision(rev)?;
                self.show_editor()
            }
            Command::Rollback(rev) => {
                ws.rollback(rev).await?;
                self.show_editor()
            }
        };
        Ok(out)
    }

    /// Read commands from `input` until EOF or `quit`.
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            output.write_all(b"kvdesk> ").await?;
            output.flush().await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let command = match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    output.write_all(format!("error: {}\n", e).as_bytes()).await?;
                    continue;
                }
            };

            let exec = self.execute(command);
            tokio::pin!(exec);
            let result = loop {
                tokio::select! {
                    result = &mut exec => break result,
                    Ok(pending) = self.confirmations.recv() => {
                        let prompt = format!("{}: {} [y/N] ", pending.request.title, pending.request.message);
                        output.write_all(prompt.as_bytes()).await?;
                        output.flush().await?;
                        let answer = lines
                            .next_line()
                            .await?
                            .map(|l| matches!(l.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
                            .unwrap_or(false);
                        pending.answer(answer);
                    }
                }
            };

            let text = match result {
                Ok(text) => text,
                Err(e) => format!("error: {}", e),
            };
            if !text.is_empty() {
                output.write_all(text.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
        }
        output.flush().await?;
        Ok(())
    }
}
