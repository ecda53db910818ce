//! The loaded state behind a [`Configuration`](crate::Configuration).
//!
//! A session owns the schema registry, the include graph, the object store
//! and the staged change set of one loaded database. Mutations go to the
//! store right away and are recorded in the change set; nothing reaches
//! the disk before [`Session::commit`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use cfgdb_changes::{ChangeSet, ChangeStatus};
use cfgdb_file::{is_verbatim_comment, Baseline, BatchWriter, DataFile, ObjectRecord};
use cfgdb_include::{IncludeError, IncludeGraph, IncludeResolver};
use cfgdb_schema::SchemaRegistry;
use cfgdb_store::{ObjectStore, StoreError, StoredObject};
use cfgdb_types::{validate_object_id, Field, ObjectRef};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::check::{CheckContext, Validator};
use crate::commit::{CommitSummary, WrittenFile};
use crate::config::DbConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::loader::{read_closure, schema_source, PendingLoad, SessionResolver};

pub(crate) struct Session {
    id: Uuid,
    registry: SchemaRegistry,
    graph: IncludeGraph,
    store: ObjectStore,
    changes: ChangeSet,
    /// Expected on-disk state of every data file, checked before overwrite.
    baselines: HashMap<PathBuf, Baseline>,
    /// Files the session was opened or created with. Files not reachable
    /// from them through includes are unloaded.
    roots: Vec<PathBuf>,
    resolver: SessionResolver,
}

impl Session {
    fn empty(config: &DbConfig) -> Self {
        Self {
            id: Uuid::now_v7(),
            registry: SchemaRegistry::new(),
            graph: IncludeGraph::new(),
            store: ObjectStore::new(),
            changes: ChangeSet::new(),
            baselines: HashMap::new(),
            roots: Vec::new(),
            resolver: SessionResolver::new(config.search_path.clone()),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Load the file at `path` and everything it includes.
    pub(crate) fn load(path: &str, config: &DbConfig) -> ConfigResult<Self> {
        let mut session = Self::empty(config);
        let root = session
            .resolver
            .locate(path)
            .map_err(|_| ConfigError::DatabaseNotFound(path.to_string()))?;
        let pending = read_closure(&[root.clone()], &session.resolver, |_| false)?;
        let objects = session.apply(pending)?;
        session.roots.push(root.clone());
        info!(
            session = %session.id,
            file = %root.display(),
            files = session.graph.len(),
            classes = session.registry.len(),
            objects,
            "database loaded"
        );
        Ok(session)
    }

    /// A new, empty data file including `schemas`. The file is written by
    /// the first commit.
    pub(crate) fn create(
        path: &Path,
        schemas: &[String],
        overwrite: bool,
        config: &DbConfig,
    ) -> ConfigResult<Self> {
        if !overwrite && path.exists() {
            return Err(ConfigError::DatabaseExists(path.to_path_buf()));
        }
        let target = absolute_target(path)?;
        let mut session = Self::empty(config);

        session.graph.register(target.clone(), Vec::new());
        let mut roots = Vec::with_capacity(schemas.len());
        for include in schemas {
            session.graph.add_include(Some(&target), include)?;
            roots.push(session.resolver.resolve(&target, include)?);
        }
        let pending = read_closure(&roots, &session.resolver, |p| p == target.as_path())?;
        let objects = session.apply(pending)?;

        session.roots.push(target.clone());
        let baseline = if overwrite {
            Baseline::Any
        } else {
            Baseline::Absent
        };
        session.baselines.insert(target.clone(), baseline);
        session.changes.record_new_file(&target);
        info!(
            session = %session.id,
            file = %target.display(),
            classes = session.registry.len(),
            objects,
            "database created"
        );
        Ok(session)
    }

    /// Merge files read by [`read_closure`] into the session. Nothing
    /// changes unless every schema merges and every object is valid and
    /// new.
    fn apply(&mut self, pending: PendingLoad) -> ConfigResult<usize> {
        let count = pending.object_count();
        let mut registry = self.registry.clone();
        registry.extend(pending.schemas)?;

        let mut seen = HashSet::with_capacity(count);
        let mut objects = Vec::with_capacity(count);
        let mut files = Vec::with_capacity(pending.data.len());
        for data in pending.data {
            for record in data.objects {
                let (oref, fields) = record.into_fields();
                if self.store.contains(&oref) || !seen.insert(oref.clone()) {
                    return Err(StoreError::AlreadyExists(oref).into());
                }
                let fields = canonical_fields(&registry, &oref, fields)?;
                objects.push(StoredObject::new(oref, fields, data.path.clone()));
            }
            files.push((data.path, data.digest, data.includes));
        }

        self.registry = registry;
        for (path, digest, includes) in files {
            self.graph.register(path.clone(), includes);
            self.baselines.insert(path, Baseline::Digest(digest));
        }
        for object in objects {
            self.store.insert(object)?;
        }
        Ok(count)
    }

    fn is_loaded(&self, path: &Path) -> bool {
        self.graph.contains(path) || self.registry.has_source(&schema_source(path))
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub(crate) fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub(crate) fn graph(&self) -> &IncludeGraph {
        &self.graph
    }

    pub(crate) fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub(crate) fn status(&self) -> ChangeStatus {
        self.changes.status()
    }

    // -----------------------------------------------------------------------
    // Includes
    // -----------------------------------------------------------------------

    /// Add an include to a data file and load what it brings in.
    pub(crate) fn add_include(&mut self, file: Option<&Path>, include: &str) -> ConfigResult<PathBuf> {
        let primary = self.graph.primary().map(Path::to_path_buf);
        let target = self.graph.add_include(file, include)?;
        match self.load_include(&target, include) {
            Ok(objects) => {
                self.changes.record_includes_changed(&target);
                info!(session = %self.id, file = %target.display(), include, objects, "include added");
                Ok(target)
            }
            Err(e) => {
                if let Err(undo) = self.graph.remove_include(Some(&target), include) {
                    warn!(error = %undo, include, "could not undo failed include");
                }
                // The failed include must not move the default file.
                if let Some(primary) = primary {
                    if let Err(undo) = self.graph.set_primary(&primary) {
                        warn!(error = %undo, "could not restore default file");
                    }
                }
                Err(e)
            }
        }
    }

    fn load_include(&mut self, target: &Path, include: &str) -> ConfigResult<usize> {
        let resolved = self.resolver.resolve(target, include)?;
        if resolved.as_path() == target {
            return Err(IncludeError::SelfInclude {
                file: target.to_path_buf(),
            }
            .into());
        }
        let pending = read_closure(&[resolved], &self.resolver, |p| self.is_loaded(p))?;
        self.apply(pending)
    }

    /// Remove an include from a data file and unload data files that are no
    /// longer reachable. Classes stay registered.
    pub(crate) fn remove_include(&mut self, file: Option<&Path>, include: &str) -> ConfigResult<PathBuf> {
        let target = self.graph.remove_include(file, include)?;
        self.changes.record_includes_changed(&target);
        let evicted = self.prune();
        info!(session = %self.id, file = %target.display(), include, evicted, "include removed");
        Ok(target)
    }

    fn prune(&mut self) -> usize {
        let reachable: HashSet<PathBuf> = self
            .graph
            .closure(&self.roots, &self.resolver)
            .into_iter()
            .collect();
        let orphans: Vec<PathBuf> = self
            .graph
            .files()
            .filter(|f| !reachable.contains(*f))
            .map(Path::to_path_buf)
            .collect();

        let mut evicted = 0;
        for file in orphans {
            if let Some(flags) = self.changes.forget_file(&file) {
                warn!(file = %file.display(), ?flags, "discarding uncommitted changes of unloaded file");
            }
            evicted += self.store.evict_file(&file).len();
            self.graph.unregister(&file);
            self.baselines.remove(&file);
            debug!(file = %file.display(), "file unloaded");
        }
        evicted
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Create an object with initial field values in `file`, or in the
    /// default file.
    pub(crate) fn create_obj(&mut self, file: Option<&Path>, class: &str, id: &str) -> ConfigResult<ObjectRef> {
        let target = self.graph.target(file)?;
        validate_object_id(id)?;
        self.registry.instantiable(class)?;
        let oref = ObjectRef::new(class, id);
        if self.store.contains(&oref) {
            return Err(StoreError::AlreadyExists(oref).into());
        }
        let fields = self.registry.initial_fields(class)?;
        self.store
            .insert(StoredObject::new(oref.clone(), fields, target.clone()))?;
        self.changes.record_created(&oref, &target);
        debug!(object = %oref, file = %target.display(), "object created");
        Ok(oref)
    }

    pub(crate) fn file_of(&self, oref: &ObjectRef) -> ConfigResult<PathBuf> {
        Ok(self.store.get(oref)?.file().to_path_buf())
    }

    /// Assign a field after checking the value against the schema.
    pub(crate) fn set_field(&mut self, oref: &ObjectRef, name: &str, field: Field) -> ConfigResult<()> {
        let file = self.file_of(oref)?;
        let field = self.registry.coerce_field(oref.class(), name, &field)?;
        self.store.set_field(oref, name, field)?;
        self.changes.record_modified(oref, &file);
        debug!(object = %oref, field = name, "field set");
        Ok(())
    }

    pub(crate) fn destroy_obj(&mut self, oref: &ObjectRef) -> ConfigResult<()> {
        let file = self.file_of(oref)?;
        self.store.remove(oref)?;
        self.changes.record_destroyed(oref, &file);
        debug!(object = %oref, "object destroyed");
        Ok(())
    }

    /// Give an object a new id; relations pointing at it follow.
    pub(crate) fn rename_obj(&mut self, oref: &ObjectRef, new_id: &str) -> ConfigResult<ObjectRef> {
        validate_object_id(new_id)?;
        let file = self.file_of(oref)?;
        let touched = self.store.rename(oref, new_id)?;
        let renamed = ObjectRef::new(oref.class(), new_id);
        self.changes.record_renamed(oref, &renamed, &file);
        for referrer in &touched {
            let referrer_file = self.file_of(referrer)?;
            self.changes.record_modified(referrer, &referrer_file);
        }
        debug!(from = %oref, to = %renamed, referrers = touched.len(), "object renamed");
        Ok(renamed)
    }

    /// Move an object to another loaded data file.
    pub(crate) fn move_obj(&mut self, oref: &ObjectRef, file: &Path) -> ConfigResult<()> {
        let target = self.graph.target(Some(file))?;
        let old = self.store.set_file(oref, target.clone())?;
        if old != target {
            self.changes.record_moved(oref, &old, &target);
            debug!(object = %oref, from = %old.display(), to = %target.display(), "object moved");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Check and commit
    // -----------------------------------------------------------------------

    /// Run the checks over every loaded object.
    pub(crate) fn check(&self, validator: &Validator) -> ConfigResult<usize> {
        let context = CheckContext {
            registry: &self.registry,
            store: &self.store,
            objects: self.store.iter().map(StoredObject::oref).collect(),
        };
        Ok(validator.run(&context)?)
    }

    /// Check the changed objects, then write every dirty data file at once.
    /// On failure nothing is written and the pending changes stay.
    pub(crate) fn commit(
        &mut self,
        comment: &str,
        config: &DbConfig,
        validator: &Validator,
    ) -> ConfigResult<CommitSummary> {
        if !is_verbatim_comment(comment) {
            return Err(ConfigError::InvalidComment {
                comment: comment.to_string(),
                reason: "JSON would escape some of its characters",
            });
        }
        let changes = self.changes.status();
        let committed_at = Utc::now();
        let mut summary = CommitSummary {
            session: self.id,
            comment: comment.to_string(),
            author: config.author.clone(),
            committed_at,
            changes,
            files: Vec::new(),
            objects_checked: 0,
        };
        if self.changes.is_empty() {
            info!(session = %self.id, "nothing to commit");
            return Ok(summary);
        }

        summary.objects_checked = {
            let context = CheckContext {
                registry: &self.registry,
                store: &self.store,
                objects: self.changes.live_changes().collect(),
            };
            validator.run(&context)?
        };

        let mut writer = BatchWriter::new(config.sync_on_commit, config.detect_external_changes);
        for (path, flags) in self.changes.dirty_files() {
            let includes = self.graph.get_includes(Some(path)).map_err(|e| {
                ConfigError::Internal(format!("dirty file {} is not loaded: {e}", path.display()))
            })?;
            let mut data = DataFile::new(includes.to_vec());
            data.annotate(comment, &config.author, committed_at);
            data.objects = self
                .store
                .objects_in(path)
                .into_iter()
                .map(|o| ObjectRecord::from_fields(o.oref(), o.fields()))
                .collect();
            let baseline = self.baselines.get(path).copied().unwrap_or(Baseline::Any);
            debug!(file = %path.display(), ?flags, objects = data.objects.len(), "file staged");
            writer.add(path, data.to_bytes()?, baseline);
        }

        for published in writer.commit()? {
            self.baselines
                .insert(published.path.clone(), Baseline::Digest(published.digest));
            summary.files.push(WrittenFile {
                digest: published.digest.to_hex(),
                path: published.path,
            });
        }
        self.changes.clear();
        info!(
            session = %self.id,
            files = summary.files.len(),
            objects = summary.changes.total_entries(),
            comment,
            "changes committed"
        );
        Ok(summary)
    }
}

/// Check and complete the fields of an object read from a data file.
fn canonical_fields(
    registry: &SchemaRegistry,
    oref: &ObjectRef,
    stored: BTreeMap<String, Field>,
) -> ConfigResult<BTreeMap<String, Field>> {
    validate_object_id(oref.id())?;
    registry.instantiable(oref.class())?;
    let mut fields = registry.initial_fields(oref.class())?;
    for (name, field) in stored {
        let field = registry.coerce_field(oref.class(), &name, &field)?;
        fields.insert(name, field);
    }
    Ok(fields)
}

/// Absolute path of a file that may not exist yet. Its directory must.
fn absolute_target(path: &Path) -> ConfigResult<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        ConfigError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
        )
    })?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let dir = std::fs::canonicalize(dir).map_err(|e| ConfigError::io(dir, e))?;
    Ok(dir.join(name))
}
