//! Publish action: fire the hosting platform's rebuild webhook.
//!
//! ```text
//! trigger(role)
//!   ├─ role may not deploy        → Forbidden        (nothing sent)
//!   ├─ a deploy is in flight      → AlreadyRunning
//!   ├─ user declines confirmation → Cancelled
//!   └─ POST hook_url (empty body)
//!        ├─ 2xx                   → Started, success notification,
//!        │                          last deploy time recorded
//!        └─ non-2xx / transport   → Failed, error notification
//! ```
//!
//! [`DeployTrigger::publish_document`] is the same flow started from a
//! document's "Publicar en el sitio" action, with that action's shorter
//! confirmation.
//!
//! A single request, no retries. Errors never escape [`DeployTrigger::trigger`]:
//! every outcome is a [`DeployOutcome`] plus a [`Notification`]. The in-flight
//! flag belongs to the trigger value and is cleared on every path, including
//! a panicking notifier.

use crate::config::SiteConfig;
use crate::studio::{Confirm, DocumentAction, Role, Tool, can_use};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// How long notifications stay on screen.
pub const NOTIFICATION_DURATION: Duration = Duration::from_secs(7);

/// File in the temp directory holding the last successful deploy time.
pub const LAST_DEPLOY_FILE: &str = "last-deploy.json";

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("deploy hook URL is not configured (deploy.hook_url or DEPLOY_HOOK_URL)")]
    MissingHookUrl,
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Everything the trigger needs, passed in explicitly.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub hook_url: String,
    pub site_name: String,
    pub timeout: Duration,
}

impl DeployConfig {
    pub fn from_site(config: &SiteConfig) -> Self {
        Self {
            hook_url: config.deploy.hook_url.clone().unwrap_or_default(),
            site_name: config.site.title.clone(),
            timeout: Duration::from_secs(config.deploy.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Success,
    Error,
}

/// Toast-style message for the person who pressed the button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub status: NotificationStatus,
    pub title: String,
    pub description: String,
    pub duration: Duration,
}

impl Notification {
    fn started() -> Self {
        Self {
            status: NotificationStatus::Success,
            title: "¡Deploy iniciado exitosamente!".to_string(),
            description: "El sitio se está regenerando. Los cambios estarán visibles en 2-5 minutos."
                .to_string(),
            duration: NOTIFICATION_DURATION,
        }
    }

    fn failed() -> Self {
        Self {
            status: NotificationStatus::Error,
            title: "Error al iniciar el despliegue".to_string(),
            description: "No se pudo conectar con el servidor. Por favor, contacta al administrador técnico."
                .to_string(),
            duration: NOTIFICATION_DURATION,
        }
    }
}

/// Receives deploy notifications.
pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Forbidden,
    AlreadyRunning,
    Cancelled,
    Started { at: DateTime<Utc> },
    Failed(String),
}

/// Text of the confirmation asked before publishing.
pub fn confirmation_message(site_name: &str) -> String {
    format!(
        "PUBLICAR CAMBIOS EN {site}\n\n\
         ¿Qué significa esto?\n\
         • Se regenerará el sitio web completo con TODOS los cambios realizados en el CMS\n\
         • Los visitantes del sitio verán el contenido actualizado\n\
         • Este proceso tarda entre 2-5 minutos\n\n\
         Importante:\n\
         • Asegúrate de haber revisado todo el contenido antes de publicar\n\
         • Los cambios serán visibles para todos los usuarios\n\n\
         ¿Deseas continuar con la publicación?",
        site = site_name.to_uppercase()
    )
}

/// Rebuild webhook trigger.
#[derive(Debug)]
pub struct DeployTrigger {
    config: DeployConfig,
    http: Client,
    in_flight: AtomicBool,
    last_deploy: Mutex<Option<DateTime<Utc>>>,
}

/// Clears the in-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DeployTrigger {
    pub fn new(config: DeployConfig) -> Result<Self, DeployError> {
        if config.hook_url.trim().is_empty() {
            return Err(DeployError::MissingHookUrl);
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            http,
            in_flight: AtomicBool::new(false),
            last_deploy: Mutex::new(None),
        })
    }

    /// Seed the last deploy time, e.g. from a previous run.
    pub fn with_last_deploy(self, at: Option<DateTime<Utc>>) -> Self {
        self.set_last_deploy(at);
        self
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn last_deploy(&self) -> Option<DateTime<Utc>> {
        *self.last_deploy.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_last_deploy(&self, at: Option<DateTime<Utc>>) {
        *self.last_deploy.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    /// Run the publish action for a user with `role`.
    pub fn trigger(
        &self,
        role: Role,
        confirm: &mut dyn Confirm,
        notifier: &mut dyn Notifier,
    ) -> DeployOutcome {
        let message = confirmation_message(&self.config.site_name);
        self.run(role, &message, confirm, notifier)
    }

    /// Run the per-document publish action for `document_id`.
    pub fn publish_document(
        &self,
        document_id: &str,
        role: Role,
        confirm: &mut dyn Confirm,
        notifier: &mut dyn Notifier,
    ) -> DeployOutcome {
        let action = DocumentAction::publish_to_site();
        let message = action.confirmation.unwrap_or_default();
        tracing::info!(document = %document_id, "publish requested from document");
        self.run(role, message, confirm, notifier)
    }

    fn run(
        &self,
        role: Role,
        message: &str,
        confirm: &mut dyn Confirm,
        notifier: &mut dyn Notifier,
    ) -> DeployOutcome {
        if !can_use(role, Tool::Deploy) {
            tracing::warn!(%role, "deploy refused: role may not publish");
            return DeployOutcome::Forbidden;
        }
        if self.is_in_flight() {
            tracing::info!("deploy already in progress");
            return DeployOutcome::AlreadyRunning;
        }
        if !confirm.confirm(message) {
            tracing::info!("deploy cancelled by user");
            return DeployOutcome::Cancelled;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return DeployOutcome::AlreadyRunning;
        }
        let _guard = InFlight(&self.in_flight);

        match self.post() {
            Ok(()) => {
                let at = Utc::now();
                self.set_last_deploy(Some(at));
                tracing::info!(site = %self.config.site_name, "deploy hook accepted");
                notifier.notify(Notification::started());
                DeployOutcome::Started { at }
            }
            Err(reason) => {
                tracing::error!(site = %self.config.site_name, %reason, "deploy hook failed");
                notifier.notify(Notification::failed());
                DeployOutcome::Failed(reason)
            }
        }
    }

    fn post(&self) -> Result<(), String> {
        let response = self
            .http
            .post(&self.config.hook_url)
            .send()
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("Error {}", status.as_u16()))
        }
    }
}

// ============================================================================
// Persistence of the last deploy time
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct LastDeploy {
    at: DateTime<Utc>,
}

/// Read the last deploy time from `dir`. Missing or unreadable state is `None`.
pub fn load_last_deploy(dir: &Path) -> Option<DateTime<Utc>> {
    let content = fs::read_to_string(dir.join(LAST_DEPLOY_FILE)).ok()?;
    serde_json::from_str::<LastDeploy>(&content).ok().map(|d| d.at)
}

pub fn save_last_deploy(dir: &Path, at: DateTime<Utc>) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(&LastDeploy { at }).map_err(std::io::Error::other)?;
    fs::write(dir.join(LAST_DEPLOY_FILE), json)
}
