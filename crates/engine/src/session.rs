//! Top-level controller tying the template store, the working settings and the
//! rotation engine together.

use std::sync::Arc;

use shared::{
    defaults::starter_config,
    domain::{AppData, CurrentSettings, Template, TemplateDraft, TemplateId},
    error::{validate_name, TemplateError},
};
use storage::{Notifier, TemplateStore};
use tracing::info;

use crate::{DisplaySurface, EngineError, EngineState, RotationEngine, SharedSettings};

pub const UNTITLED_TEMPLATE_NAME: &str = "Untitled template";

pub struct Session {
    store: TemplateStore,
    data: AppData,
    settings: SharedSettings,
    engine: RotationEngine,
    surface: Arc<dyn DisplaySurface>,
}

impl Session {
    pub fn open(store: TemplateStore, surface: Arc<dyn DisplaySurface>) -> Self {
        let engine = RotationEngine::new(Arc::clone(&surface));
        Self::with_engine(store, surface, engine)
    }

    /// Like [`Session::open`] but with a caller-built engine, e.g. a seeded one.
    pub fn with_engine(
        store: TemplateStore,
        surface: Arc<dyn DisplaySurface>,
        engine: RotationEngine,
    ) -> Self {
        let data = store.load();
        let settings = SharedSettings::new(
            data.active_template()
                .map(CurrentSettings::from_template)
                .unwrap_or_default(),
        );
        engine.initialize(Arc::new(settings.clone()));
        surface.populate(&settings.snapshot());
        Self {
            store,
            data,
            settings,
            engine,
            surface,
        }
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn templates(&self) -> &[Template] {
        &self.data.templates
    }

    pub fn active_template(&self) -> Option<&Template> {
        self.data.active_template()
    }

    /// Handle to the working copy; writes through it are seen by the next tick.
    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn current_settings(&self) -> CurrentSettings {
        self.settings.snapshot()
    }

    pub fn engine(&self) -> &RotationEngine {
        &self.engine
    }

    /// Makes `id` active and shows it with fresh history, stopped.
    pub fn load_template(&mut self, id: &TemplateId) -> Result<(), TemplateError> {
        let template = self.find(id)?;
        self.settings
            .replace(CurrentSettings::from_template(template));
        self.data.active_template_id = Some(id.clone());
        self.store.save(&self.data);
        self.restart();
        info!("session: loaded template id={id}");
        Ok(())
    }

    /// Makes `id` active and hands back an editable copy of it. Switching to
    /// another template stops the rotation and clears its history.
    pub fn begin_edit(&mut self, id: &TemplateId) -> Result<TemplateDraft, TemplateError> {
        let switching = self.data.active_template_id.as_ref() != Some(id);
        let template = self.find(id)?;
        let draft = TemplateDraft::from_template(template);
        self.settings
            .replace(CurrentSettings::from_template(template));
        self.data.active_template_id = Some(id.clone());
        if switching {
            self.restart();
        }
        Ok(draft)
    }

    /// Commits `draft` into the active template.
    pub fn save_settings(&mut self, draft: TemplateDraft) -> Result<(), TemplateError> {
        self.engine.stop();
        let Some(id) = self.data.active_template_id.clone() else {
            return Err(self.reject(TemplateError::NotFound(TemplateId::new(""))));
        };
        let Some(template) = self.data.template_mut(&id) else {
            return Err(self.reject(TemplateError::NotFound(id)));
        };
        if template.is_default {
            return Err(self.reject(TemplateError::DefaultImmutable(id)));
        }

        let name = draft.name.trim();
        template.name = if name.is_empty() {
            UNTITLED_TEMPLATE_NAME.to_string()
        } else {
            name.to_string()
        };
        template.is_shared_pool = draft.is_shared_pool;
        template.config = draft.config;
        let settings = CurrentSettings::from_template(template);

        self.settings.replace(settings.clone());
        self.store.save(&self.data);
        self.surface.populate(&settings);
        self.notify("Settings saved", false);
        info!("session: saved template id={id}");
        Ok(())
    }

    pub fn create_template(&mut self, name: &str) -> Result<TemplateId, TemplateError> {
        let name = validate_name(name).map_err(|err| self.reject(err))?;
        let template = Template {
            id: TemplateId::generate_custom(),
            name,
            is_default: false,
            is_shared_pool: true,
            config: starter_config(),
        };
        let id = template.id.clone();
        self.data.templates.push(template);
        self.store.save(&self.data);
        info!("session: created template id={id}");
        Ok(id)
    }

    pub fn duplicate_template(
        &mut self,
        source: &TemplateId,
        name: &str,
    ) -> Result<TemplateId, TemplateError> {
        let name = validate_name(name).map_err(|err| self.reject(err))?;
        let mut copy = self.find(source)?.clone();
        copy.id = TemplateId::generate_custom();
        copy.name = name;
        copy.is_default = false;

        let id = copy.id.clone();
        self.data.templates.push(copy);
        self.store.save(&self.data);
        info!("session: duplicated template {source} into id={id}");
        Ok(id)
    }

    pub fn delete_template(&mut self, id: &TemplateId) -> Result<(), TemplateError> {
        let template = self.find(id)?;
        if template.is_default {
            return Err(self.reject(TemplateError::DefaultImmutable(id.clone())));
        }
        let name = template.name.clone();

        self.data.templates.retain(|template| &template.id != id);
        if self.data.active_template_id.as_ref() == Some(id) {
            self.data.active_template_id = self
                .store
                .defaults()
                .first()
                .map(|template| template.id.clone());
            let fallback = self
                .data
                .active_template()
                .map(CurrentSettings::from_template)
                .unwrap_or_default();
            self.settings.replace(fallback);
            self.restart();
        }
        self.store.save(&self.data);
        self.notify(&format!("Template \"{name}\" deleted"), false);
        info!("session: deleted template id={id}");
        Ok(())
    }

    pub fn start(&self) -> Result<(), EngineError> {
        self.engine.start()
    }

    pub fn stop(&self) {
        self.engine.stop();
    }

    pub fn toggle_pause(&self) -> Result<EngineState, EngineError> {
        self.engine.toggle_pause()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Stops the rotation, clears history and puts every slot back to idle.
    pub fn restart(&self) {
        let settings = &self.settings;
        let surface = &self.surface;
        self.engine.reset(|| surface.populate(&settings.snapshot()));
    }

    fn find(&self, id: &TemplateId) -> Result<&Template, TemplateError> {
        match self.data.template(id) {
            Some(template) => Ok(template),
            None => Err(self.reject(TemplateError::NotFound(id.clone()))),
        }
    }

    fn reject(&self, err: TemplateError) -> TemplateError {
        self.notify(&err.user_message(), true);
        err
    }

    fn notify(&self, message: &str, is_error: bool) {
        self.store.notifier().notify(message, is_error);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
