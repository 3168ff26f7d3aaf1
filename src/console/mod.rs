//! Presentation state shared by the terminal console and the admin tool.

pub mod domain;

pub use domain::{DomainController, EditTarget, LoadOutcome, LoadRequest, PageMove};

use crate::config::ConsoleConfig;
use crate::core::{Character, Planet, Result};
use crate::overlay::{FileKeyValueStore, KeyValueStore, OverlayStore};
use crate::session::{CredentialDirectory, Session};
use std::sync::Arc;
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Characters,
    Planets,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Characters => "Characters",
            View::Planets => "Planets",
        }
    }

    pub fn toggled(&self) -> View {
        match self {
            View::Characters => View::Planets,
            View::Planets => View::Characters,
        }
    }
}

/// Everything a console front end needs: the session and one listing
/// controller per record kind, all backed by the same durable storage.
pub struct Console {
    config: ConsoleConfig,
    pub session: Session,
    pub characters: DomainController<Character>,
    pub planets: DomainController<Planet>,
    view: View,
}

impl Console {
    /// Opens file-backed storage under the configured data directory.
    pub fn open(config: ConsoleConfig) -> Result<Self> {
        config.validate()?;
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open(&config.data_dir)?);
        Self::with_storage(config, storage, CredentialDirectory::builtin()?)
    }

    pub fn with_storage(
        config: ConsoleConfig,
        storage: Arc<dyn KeyValueStore>,
        directory: CredentialDirectory,
    ) -> Result<Self> {
        let session = Session::restore(storage.clone(), directory)?;
        let characters = DomainController::new(OverlayStore::open(storage.clone())?, config.page_size);
        let planets = DomainController::new(OverlayStore::open(storage)?, config.page_size);

        event!(
            Level::INFO,
            data_dir = %config.data_dir.display(),
            local_characters = characters.overlay().len(),
            local_planets = planets.overlay().len(),
            "console opened"
        );

        Ok(Self {
            config,
            session,
            characters,
            planets,
            view: View::Characters,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn toggle_view(&mut self) -> View {
        self.view = self.view.toggled();
        self.view
    }
}
