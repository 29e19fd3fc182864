//! Editorial guards: who sees which tool, and which actions ask first.
//!
//! The CMS editing UI itself is not part of this crate. What is modelled here
//! are the two policies the site layers on top of it:
//!
//! - **Tool visibility**: administrators see every tool; everyone else never
//!   sees admin-only tools. Publishing the site ([`Tool::Deploy`]) is
//!   admin-only.
//! - **Delete confirmation**: deleting a `noticia` or a `banner` removes
//!   published content from the live site, so the action asks for
//!   confirmation before running.
//! - **Publish from a document**: an optional per-document action that fires
//!   the same rebuild as [`Tool::Deploy`] with a shorter confirmation.
//!
//! Confirmation is a trait so the CLI can ask on the terminal, scripts can
//! pass `--yes`, and tests can answer either way.

use crate::schema::{BANNER, NOTICIA};
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;
use thiserror::Error;

/// Message shown before deleting guarded content.
pub const DELETE_CONFIRMATION: &str =
    "¿Estás seguro de eliminar este contenido?\n\nEsta acción no se puede deshacer.";

/// Message shown by the per-document publish action.
pub const SITE_PUBLISH_CONFIRMATION: &str =
    "¿Publicar este contenido en el sitio web?\n\nEsto regenerará el sitio completo.";

#[derive(Error, Debug, PartialEq)]
pub enum StudioError {
    #[error("unknown role \"{0}\" (expected administrator, editor, contributor or viewer)")]
    UnknownRole(String),
}

/// CMS project role of the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Administrator,
    Editor,
    Contributor,
    Viewer,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Editor => "editor",
            Role::Contributor => "contributor",
            Role::Viewer => "viewer",
        }
    }
}

impl FromStr for Role {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "administrator" | "admin" => Ok(Role::Administrator),
            "editor" => Ok(Role::Editor),
            "contributor" => Ok(Role::Contributor),
            "viewer" => Ok(Role::Viewer),
            other => Err(StudioError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-level editorial tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Document editing.
    Structure,
    /// Query playground.
    Vision,
    /// Publish the site.
    Deploy,
}

pub const ALL_TOOLS: [Tool; 3] = [Tool::Structure, Tool::Vision, Tool::Deploy];

impl Tool {
    pub fn admin_only(&self) -> bool {
        matches!(self, Tool::Deploy)
    }
}

/// Tools `role` may see, in the order given.
pub fn visible_tools(role: Role, all_tools: &[Tool]) -> Vec<Tool> {
    all_tools
        .iter()
        .copied()
        .filter(|tool| role == Role::Administrator || !tool.admin_only())
        .collect()
}

/// Whether `role` may use `tool`.
pub fn can_use(role: Role, tool: Tool) -> bool {
    visible_tools(role, &[tool]).contains(&tool)
}

// ============================================================================
// Confirmation
// ============================================================================

/// Asks the user to confirm an action.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Confirms everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

/// Prompts on a writer and reads the answer from a reader. Only an explicit
/// yes (`s`, `si`, `sí`, `y`, `yes`) confirms; EOF or anything else declines.
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptConfirm<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, message: &str) -> bool {
        if write!(self.output, "{message}\n[s/N] ").and_then(|_| self.output.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => is_yes(&answer),
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}

// ============================================================================
// Document actions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Publish,
    Unpublish,
    Duplicate,
    Delete,
    DiscardChanges,
    /// "Publicar en el sitio": rebuild the live site from this document.
    PublishToSite,
}

/// A document action as offered by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentAction {
    pub kind: ActionKind,
    /// Asked before running, if set.
    pub confirmation: Option<&'static str>,
}

impl DocumentAction {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            confirmation: None,
        }
    }

    /// The per-document site publish action, always confirmed.
    pub fn publish_to_site() -> Self {
        Self {
            kind: ActionKind::PublishToSite,
            confirmation: Some(SITE_PUBLISH_CONFIRMATION),
        }
    }

    /// Run `handler` unless a required confirmation is declined. Returns
    /// whether the handler ran.
    pub fn run(&self, confirm: &mut dyn Confirm, handler: impl FnOnce()) -> bool {
        if let Some(message) = self.confirmation {
            if !confirm.confirm(message) {
                tracing::info!(action = ?self.kind, "action cancelled by user");
                return false;
            }
        }
        handler();
        true
    }
}

/// The default action set of the editor.
pub fn default_actions() -> Vec<DocumentAction> {
    [
        ActionKind::Publish,
        ActionKind::Unpublish,
        ActionKind::DiscardChanges,
        ActionKind::Duplicate,
        ActionKind::Delete,
    ]
    .into_iter()
    .map(DocumentAction::new)
    .collect()
}

/// `actions` with the site publish action appended.
pub fn with_site_publish(mut actions: Vec<DocumentAction>) -> Vec<DocumentAction> {
    actions.push(DocumentAction::publish_to_site());
    actions
}

/// Actions for a document of `schema_type`: deleting articles and banners
/// requires confirmation, everything else passes through unchanged.
pub fn document_actions(schema_type: &str, actions: Vec<DocumentAction>) -> Vec<DocumentAction> {
    if schema_type != NOTICIA && schema_type != BANNER {
        return actions;
    }
    actions
        .into_iter()
        .map(|action| match action.kind {
            ActionKind::Delete => DocumentAction {
                confirmation: Some(DELETE_CONFIRMATION),
                ..action
            },
            _ => action,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::COURSE;
    use std::io::Cursor;

    struct Answer(bool, Vec<String>);

    impl Confirm for Answer {
        fn confirm(&mut self, message: &str) -> bool {
            self.1.push(message.to_string());
            self.0
        }
    }

    // =========================================================================
    // Roles and tools
    // =========================================================================

    #[test]
    fn parse_roles() {
        assert_eq!("administrator".parse::<Role>(), Ok(Role::Administrator));
        assert_eq!(" Editor ".parse::<Role>(), Ok(Role::Editor));
        assert_eq!("viewer".parse::<Role>(), Ok(Role::Viewer));
        assert!(matches!("root".parse::<Role>(), Err(StudioError::UnknownRole(_))));
    }

    #[test]
    fn administrators_see_everything() {
        assert_eq!(visible_tools(Role::Administrator, &ALL_TOOLS), ALL_TOOLS.to_vec());
    }

    #[test]
    fn other_roles_never_see_deploy() {
        for role in [Role::Editor, Role::Contributor, Role::Viewer] {
            assert_eq!(
                visible_tools(role, &ALL_TOOLS),
                vec![Tool::Structure, Tool::Vision],
                "{role}"
            );
            assert!(!can_use(role, Tool::Deploy));
        }
        assert!(can_use(Role::Administrator, Tool::Deploy));
    }

    // =========================================================================
    // Confirmation
    // =========================================================================

    #[test]
    fn prompt_accepts_only_explicit_yes() {
        for (input, expected) in [("s\n", true), ("Sí\n", true), ("yes\n", true), ("\n", false), ("no\n", false), ("", false)] {
            let mut out = Vec::new();
            let mut prompt = PromptConfirm::new(Cursor::new(input), &mut out);
            assert_eq!(prompt.confirm("¿Continuar?"), expected, "{input:?}");
        }
    }

    #[test]
    fn prompt_writes_message() {
        let mut out = Vec::new();
        PromptConfirm::new(Cursor::new("s\n"), &mut out).confirm("¿Publicar?");
        assert_eq!(String::from_utf8(out).unwrap(), "¿Publicar?\n[s/N] ");
    }

    // =========================================================================
    // Document actions
    // =========================================================================

    #[test]
    fn delete_is_guarded_for_articles_and_banners() {
        for schema_type in [NOTICIA, BANNER] {
            let actions = document_actions(schema_type, default_actions());
            let guarded: Vec<&ActionKind> = actions
                .iter()
                .filter(|a| a.confirmation.is_some())
                .map(|a| &a.kind)
                .collect();
            assert_eq!(guarded, vec![&ActionKind::Delete]);
        }
    }

    #[test]
    fn other_types_pass_through() {
        assert_eq!(document_actions(COURSE, default_actions()), default_actions());
    }

    #[test]
    fn declined_delete_does_not_run() {
        let actions = document_actions(NOTICIA, default_actions());
        let delete = actions.iter().find(|a| a.kind == ActionKind::Delete).unwrap();
        let mut ran = false;
        let mut no = Answer(false, Vec::new());
        assert!(!delete.run(&mut no, || ran = true));
        assert!(!ran);
        assert_eq!(no.1, vec![DELETE_CONFIRMATION.to_string()]);

        assert!(delete.run(&mut AssumeYes, || ran = true));
        assert!(ran);
    }

    #[test]
    fn site_publish_is_appended_and_confirmed() {
        let actions = with_site_publish(document_actions(COURSE, default_actions()));
        let last = actions.last().unwrap();
        assert_eq!(last.kind, ActionKind::PublishToSite);
        assert_eq!(last.confirmation, Some(SITE_PUBLISH_CONFIRMATION));
        assert_eq!(actions.len(), default_actions().len() + 1);

        let mut no = Answer(false, Vec::new());
        assert!(!last.run(&mut no, || panic!("must not run")));
        assert_eq!(no.1, vec![SITE_PUBLISH_CONFIRMATION.to_string()]);
    }

    #[test]
    fn unguarded_actions_do_not_ask() {
        let publish = DocumentAction::new(ActionKind::Publish);
        let mut no = Answer(false, Vec::new());
        assert!(publish.run(&mut no, || {}));
        assert!(no.1.is_empty());
    }
}
