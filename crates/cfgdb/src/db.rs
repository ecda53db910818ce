//! The database handle.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use cfgdb_changes::ChangeStatus;
use cfgdb_schema::SchemaRegistry;
use cfgdb_types::ObjectRef;
use tracing::{info, warn};
use uuid::Uuid;

use crate::check::{CommitCheck, Validator};
use crate::commit::CommitSummary;
use crate::config::DbConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::session::Session;
use crate::spec::DbSpec;
use crate::view::{ObjectMut, ObjectView};

/// Handle over one database: a data file, the files it includes and the
/// schema they use.
///
/// A handle is either loaded or unloaded. Mutations are visible through the
/// handle immediately and reach the disk only on [`commit`](Self::commit).
/// One handle is meant for one thread; opening several handles on the same
/// files within a process is not supported.
pub struct Configuration {
    spec: DbSpec,
    config: DbConfig,
    session: Option<Session>,
    validator: Validator,
}

impl Configuration {
    /// Open a database with settings taken from the environment.
    ///
    /// `spec` is `"jsonfile"` for an unloaded handle, ready for
    /// [`create_db`](Self::create_db) or [`load`](Self::load), or
    /// `"jsonfile:<data-file>"` to load a database right away.
    pub fn open(spec: &str) -> ConfigResult<Self> {
        Self::open_with(spec, DbConfig::from_env())
    }

    pub fn open_with(spec: &str, config: DbConfig) -> ConfigResult<Self> {
        let spec: DbSpec = spec.parse()?;
        let session = match spec.data() {
            Some(data) => Some(Session::load(data, &config)?),
            None => None,
        };
        Ok(Self {
            spec,
            config,
            session,
            validator: Validator::with_default_checks(),
        })
    }

    /// The spec this handle stands for, updated by `load` and `create_db`.
    pub fn get_impl_spec(&self) -> String {
        self.spec.to_string()
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Id of the current session, if loaded.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(Session::id)
    }

    /// Append a check run before every commit and by [`check`](Self::check).
    pub fn add_check(&mut self, check: Box<dyn CommitCheck>) {
        self.validator.add_check(check);
    }

    fn session(&self) -> ConfigResult<&Session> {
        self.session.as_ref().ok_or(ConfigError::NotLoaded)
    }

    fn session_mut(&mut self) -> ConfigResult<&mut Session> {
        self.session.as_mut().ok_or(ConfigError::NotLoaded)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Load the database at `path`. On failure the current session, if
    /// any, is kept.
    pub fn load(&mut self, path: &str) -> ConfigResult<()> {
        let session = Session::load(path, &self.config)?;
        self.replace_session(session);
        self.spec = self.spec.with_data(path);
        Ok(())
    }

    /// Drop the loaded state, including uncommitted changes.
    pub fn unload(&mut self) {
        if let Some(session) = self.session.take() {
            if session.has_changes() {
                warn!(session = %session.id(), "unloading with uncommitted changes");
            }
            info!(session = %session.id(), "database unloaded");
        }
    }

    /// Start a new database at `path` including `schemas`. Fails if `path`
    /// exists. Nothing is written before the first commit.
    pub fn create_db<P: AsRef<Path>>(&mut self, path: P, schemas: &[&str]) -> ConfigResult<()> {
        self.create(path.as_ref(), schemas, false)
    }

    /// Like [`create_db`](Self::create_db), replacing an existing file on
    /// commit.
    pub fn recreate_db<P: AsRef<Path>>(&mut self, path: P, schemas: &[&str]) -> ConfigResult<()> {
        self.create(path.as_ref(), schemas, true)
    }

    fn create(&mut self, path: &Path, schemas: &[&str], overwrite: bool) -> ConfigResult<()> {
        let schemas: Vec<String> = schemas.iter().map(|s| s.to_string()).collect();
        let session = Session::create(path, &schemas, overwrite, &self.config)?;
        self.replace_session(session);
        self.spec = self.spec.with_data(&path.display().to_string());
        Ok(())
    }

    fn replace_session(&mut self, session: Session) {
        if let Some(old) = self.session.replace(session) {
            if old.has_changes() {
                warn!(session = %old.id(), "replacing session with uncommitted changes");
            }
        }
    }

    /// Check the pending changes and write every changed data file
    /// atomically, recording `comment` in each. On failure nothing is
    /// written and the changes stay pending.
    pub fn commit(&mut self, comment: &str) -> ConfigResult<CommitSummary> {
        let session = self.session.as_mut().ok_or(ConfigError::NotLoaded)?;
        session.commit(comment, &self.config, &self.validator)
    }

    /// Run every check over the whole database without writing anything.
    /// Returns the number of objects checked.
    pub fn check(&self) -> ConfigResult<usize> {
        self.session()?.check(&self.validator)
    }

    /// Pending changes.
    pub fn status(&self) -> ConfigResult<ChangeStatus> {
        Ok(self.session()?.status())
    }

    // -----------------------------------------------------------------------
    // Includes
    // -----------------------------------------------------------------------

    /// Add an include to the default data file: the one last touched by an
    /// include operation, or the file the database was opened with.
    pub fn add_include(&mut self, include: &str) -> ConfigResult<()> {
        self.session_mut()?.add_include(None, include)?;
        Ok(())
    }

    pub fn add_include_to<P: AsRef<Path>>(&mut self, file: P, include: &str) -> ConfigResult<()> {
        let file = self.loaded_path(file.as_ref())?;
        self.session_mut()?.add_include(Some(&file), include)?;
        Ok(())
    }

    pub fn remove_include(&mut self, include: &str) -> ConfigResult<()> {
        self.session_mut()?.remove_include(None, include)?;
        Ok(())
    }

    pub fn remove_include_from<P: AsRef<Path>>(&mut self, file: P, include: &str) -> ConfigResult<()> {
        let file = self.loaded_path(file.as_ref())?;
        self.session_mut()?.remove_include(Some(&file), include)?;
        Ok(())
    }

    /// Includes of `file`, or of the default data file, in declaration
    /// order and including uncommitted edits.
    pub fn get_includes(&self, file: Option<&Path>) -> ConfigResult<Vec<String>> {
        let file = file.map(|f| self.loaded_path(f)).transpose()?;
        Ok(self.session()?.graph().get_includes(file.as_deref())?.to_vec())
    }

    /// Loaded data files, in load order.
    pub fn files(&self) -> ConfigResult<Vec<PathBuf>> {
        Ok(self.session()?.graph().files().map(Path::to_path_buf).collect())
    }

    /// Loaded files are keyed by canonical path; accept any spelling of one.
    fn loaded_path(&self, file: &Path) -> ConfigResult<PathBuf> {
        let graph = self.session()?.graph();
        if graph.contains(file) {
            return Ok(file.to_path_buf());
        }
        // A new data file exists only in memory until its first commit.
        let canonical = std::fs::canonicalize(file).ok().or_else(|| {
            let dir = std::fs::canonicalize(file.parent()?).ok()?;
            Some(dir.join(file.file_name()?))
        });
        Ok(canonical
            .filter(|f| graph.contains(f))
            .unwrap_or_else(|| file.to_path_buf()))
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Create an object in the default data file.
    pub fn create_obj(&mut self, class: &str, id: &str) -> ConfigResult<ObjectMut<'_>> {
        let session = self.session_mut()?;
        let oref = session.create_obj(None, class, id)?;
        Ok(ObjectMut::new(session, oref))
    }

    /// Create an object in a specific loaded data file.
    pub fn create_obj_at<P: AsRef<Path>>(
        &mut self,
        file: P,
        class: &str,
        id: &str,
    ) -> ConfigResult<ObjectMut<'_>> {
        let file = self.loaded_path(file.as_ref())?;
        let session = self.session_mut()?;
        let oref = session.create_obj(Some(&file), class, id)?;
        Ok(ObjectMut::new(session, oref))
    }

    /// Create an object in the data file holding `near`.
    pub fn create_obj_near(
        &mut self,
        near: &ObjectRef,
        class: &str,
        id: &str,
    ) -> ConfigResult<ObjectMut<'_>> {
        let session = self.session_mut()?;
        let file = session.file_of(near)?;
        let oref = session.create_obj(Some(&file), class, id)?;
        Ok(ObjectMut::new(session, oref))
    }

    pub fn get_obj(&self, class: &str, id: &str) -> ConfigResult<ObjectView<'_>> {
        let object = self.session()?.store().get(&ObjectRef::new(class, id))?;
        Ok(ObjectView::new(object))
    }

    /// Mutable handle on an existing object.
    pub fn get_obj_mut(&mut self, class: &str, id: &str) -> ConfigResult<ObjectMut<'_>> {
        let session = self.session_mut()?;
        let oref = ObjectRef::new(class, id);
        session.store().get(&oref)?;
        Ok(ObjectMut::new(session, oref))
    }

    /// Every object of exactly `class`, ordered by id.
    pub fn get_objs(&self, class: &str) -> ConfigResult<Vec<ObjectView<'_>>> {
        let session = self.session()?;
        session.registry().resolve(class)?;
        Ok(session
            .store()
            .objects_of(class)
            .into_iter()
            .map(ObjectView::new)
            .collect())
    }

    /// Number of objects of exactly `class`.
    pub fn count(&self, class: &str) -> ConfigResult<usize> {
        let session = self.session()?;
        session.registry().resolve(class)?;
        Ok(session.store().count(class))
    }

    /// Whether `id@class` is loaded and, for `depth > 0`, every object it
    /// reaches within `depth` relation hops is loaded too. Never fails:
    /// anything missing, including the database itself, yields `false`.
    pub fn test_object(&self, class: &str, id: &str, depth: usize, visited: &mut HashSet<ObjectRef>) -> bool {
        self.session.as_ref().is_some_and(|s| {
            s.store()
                .test_exists(&ObjectRef::new(class, id), depth, visited)
        })
    }

    /// Remove an object. Refused while other objects refer to it.
    pub fn destroy_obj(&mut self, object: &ObjectRef) -> ConfigResult<()> {
        self.session_mut()?.destroy_obj(object)
    }

    /// Give an object a new id, updating every relation that points at it.
    pub fn rename_obj(&mut self, object: &ObjectRef, new_id: &str) -> ConfigResult<ObjectRef> {
        self.session_mut()?.rename_obj(object, new_id)
    }

    /// Move an object to another loaded data file.
    pub fn move_obj<P: AsRef<Path>>(&mut self, object: &ObjectRef, file: P) -> ConfigResult<()> {
        let file = self.loaded_path(file.as_ref())?;
        self.session_mut()?.move_obj(object, &file)
    }

    /// Objects whose relations point at `object`, optionally only through
    /// the relation named `relation`.
    pub fn referenced_by(&self, object: &ObjectRef, relation: Option<&str>) -> ConfigResult<Vec<ObjectRef>> {
        let store = self.session()?.store();
        store.get(object)?;
        let mut referrers: Vec<ObjectRef> = store
            .referrers(object, relation)
            .into_iter()
            .map(|(referrer, _)| referrer)
            .collect();
        referrers.dedup();
        Ok(referrers)
    }

    /// Follow the single-valued relation `relation` from `start` until it is
    /// unset or loops. Iterative, so chains of any length are fine.
    pub fn walk<'a>(
        &'a self,
        start: &ObjectRef,
        relation: &'a str,
    ) -> ConfigResult<impl Iterator<Item = ObjectView<'a>> + 'a> {
        let store = self.session()?.store();
        store.get(start)?;
        Ok(store.walk(start, relation).map(ObjectView::new))
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    /// The loaded classes, for introspection.
    pub fn schema(&self) -> ConfigResult<&SchemaRegistry> {
        Ok(self.session()?.registry())
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("spec", &self.spec.to_string())
            .field("session", &self.session_id())
            .finish()
    }
}
