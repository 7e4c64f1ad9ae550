//! Central blackboard runtime
//!
//! [`BlackboardRuntime`] owns every template, compiled level, and live
//! instance behind generational ids. Compilation, freeing, spawning, and
//! synchronized fan-out are all `&mut self` methods, which keeps the
//! engine single-threaded by construction: there is no internal locking
//! because there is nothing to lock.

use std::collections::HashMap;

use log::{debug, warn};

use slate_core::{NullObjectModel, ObjectHandle, ObjectModel, SlotMap};

use crate::agent::AgentBoard;
use crate::compiled::{CompiledData, KeyEntry};
use crate::error::CompileError;
use crate::instance::{BlackboardInstance, InstanceId};
use crate::key::KeyKind;
use crate::sync::SyncListener;
use crate::template::{Template, TemplateId};
use crate::value::BlackboardValue;

/// Owner of the template registry, compiled levels, and live instances.
pub struct BlackboardRuntime {
    pub(crate) templates: SlotMap<Template>,
    pub(crate) compiled: HashMap<TemplateId, CompiledData>,
    pub(crate) instances: SlotMap<BlackboardInstance>,
    pub(crate) objects: Box<dyn ObjectModel>,
    pub(crate) next_revision: u32,
}

impl BlackboardRuntime {
    /// An empty runtime with no object-model delegation.
    pub fn new() -> Self {
        Self {
            templates: SlotMap::new(),
            compiled: HashMap::new(),
            instances: SlotMap::new(),
            objects: Box::new(NullObjectModel),
            next_revision: 0,
        }
    }

    /// Delegate object-handle retain/release to `model`.
    pub fn with_object_model(mut self, model: impl ObjectModel + 'static) -> Self {
        self.objects = Box::new(model);
        self
    }

    /// Replace the object-model delegate.
    pub fn set_object_model(&mut self, model: Box<dyn ObjectModel>) {
        self.objects = model;
    }

    /// Register an authored template.
    pub fn register_template(&mut self, template: Template) -> TemplateId {
        debug!("registering blackboard template '{}'", template.name);
        self.templates.insert(template)
    }

    /// Remove a template, freeing its compiled level first. Stale ids are
    /// ignored.
    pub fn remove_template(&mut self, id: TemplateId) {
        if !self.templates.contains(id) {
            return;
        }
        self.free(id);
        let bound = self
            .instances
            .iter()
            .filter(|(_, instance)| instance.template() == id)
            .count();
        if bound > 0 {
            warn!("removing a template with {bound} live instance(s) still bound");
        }
        if let Some(template) = self.templates.remove(id) {
            debug!("removed blackboard template '{}'", template.name);
        }
    }

    /// Look up a registered template.
    #[inline]
    pub fn template(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(id)
    }

    /// Mutable access to a registered template.
    ///
    /// Compilation snapshots a template; edits made here affect only the
    /// next compile after a [`free`](Self::free).
    #[inline]
    pub fn template_mut(&mut self, id: TemplateId) -> Option<&mut Template> {
        self.templates.get_mut(id)
    }

    /// Find a template id by declared name.
    pub fn find_template(&self, name: &str) -> Option<TemplateId> {
        self.templates
            .iter()
            .find(|(_, template)| template.name == name)
            .map(|(id, _)| id)
    }

    /// Resolve every authored `parent_name` that is not yet linked.
    /// Returns the number of links made; unresolvable names are warned
    /// about and left unlinked.
    pub fn link_authored_parents(&mut self) -> usize {
        let pending: Vec<(TemplateId, String)> = self
            .templates
            .iter()
            .filter(|(_, template)| template.parent.is_none())
            .filter_map(|(id, template)| {
                template.parent_name.clone().map(|name| (id, name))
            })
            .collect();

        let mut linked = 0;
        for (id, parent_name) in pending {
            match self.find_template(&parent_name) {
                Some(parent) if parent != id => {
                    if let Some(template) = self.templates.get_mut(id) {
                        template.parent = Some(parent);
                        linked += 1;
                    }
                }
                _ => warn!("authored parent '{parent_name}' is not registered"),
            }
        }
        linked
    }

    /// The compiled level for a template, if it has been compiled.
    #[inline]
    pub fn compiled(&self, id: TemplateId) -> Option<&CompiledData> {
        self.compiled.get(&id)
    }

    /// Whether a template currently has a compiled level.
    #[inline]
    pub fn is_compiled(&self, id: TemplateId) -> bool {
        self.compiled.contains_key(&id)
    }

    /// Spawn an instance bound to a compiled level.
    ///
    /// The instance starts as a copy of the canonical buffer stamped with
    /// the level's build revision, retains every non-null object handle
    /// it copied, and registers as a sync listener on its level.
    pub fn spawn(&mut self, template: TemplateId) -> Result<InstanceId, CompileError> {
        if !self.templates.contains(template) {
            return Err(CompileError::UnknownTemplate);
        }
        let data = self
            .compiled
            .get(&template)
            .ok_or_else(|| CompileError::NotCompiled(self.template_name(template)))?;
        let revision = data.revision;
        let buffer = data.buffer.clone();

        retain_objects(self.objects.as_mut(), &data.descriptors, &buffer);

        let id = self
            .instances
            .insert(BlackboardInstance::new(template, revision, buffer));
        if let Some(data) = self.compiled.get_mut(&template) {
            data.add_listener(SyncListener::Instance(id));
        }
        debug!(
            "spawned blackboard instance of '{}' ({} bytes)",
            self.template_name(template),
            self.instances.get(id).map_or(0, |i| i.size()),
        );
        Ok(id)
    }

    /// Despawn an instance: release its object handles, detach its
    /// listener registration, drop its buffer. Stale ids are ignored.
    pub fn despawn(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.remove(id) else {
            debug!("despawn of a stale instance id ignored");
            return;
        };
        let template = instance.template();
        // A level rebuilt since the spawn carries descriptors that do not
        // describe this buffer; releasing through them would misread it.
        match self.compiled.get_mut(&template) {
            Some(data) if data.revision == instance.revision() => {
                data.remove_listener(SyncListener::Instance(id));
                release_objects(self.objects.as_mut(), &data.descriptors, instance.buffer());
            }
            _ => warn!(
                "despawned instance outlived its compiled level; object references not released"
            ),
        }
        debug!("despawned blackboard instance of '{}'", self.template_name(template));
    }

    /// Look up a live instance.
    #[inline]
    pub fn instance(&self, id: InstanceId) -> Option<&BlackboardInstance> {
        self.instances.get(id)
    }

    /// Mutable access to a live instance.
    #[inline]
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut BlackboardInstance> {
        self.instances.get_mut(id)
    }

    /// Per-agent accessor facade over one instance.
    pub fn agent(&mut self, id: InstanceId) -> Option<AgentBoard<'_>> {
        let template = self.instances.get(id)?.template();
        Some(AgentBoard::new(self, id, template))
    }

    /// The level of `template`'s chain that declared the key at `offset`:
    /// the topmost ancestor whose compiled buffer still contains it.
    pub fn owning_level(&self, template: TemplateId, offset: u16) -> Option<TemplateId> {
        let mut current = template;
        let mut data = self.compiled.get(&current)?;
        if offset >= data.size {
            return None;
        }
        while let Some(parent) = data.parent {
            match self.compiled.get(&parent) {
                Some(parent_data) if offset < parent_data.size => {
                    current = parent;
                    data = parent_data;
                }
                _ => break,
            }
        }
        Some(current)
    }

    /// Number of registered templates.
    #[inline]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Number of compiled levels.
    #[inline]
    pub fn compiled_count(&self) -> usize {
        self.compiled.len()
    }

    /// Number of live instances.
    #[inline]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub(crate) fn template_name(&self, id: TemplateId) -> String {
        self.templates
            .get(id)
            .map_or_else(|| "<unregistered>".to_string(), |t| t.name.clone())
    }
}

impl Default for BlackboardRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Retain every non-null object handle stored in `buffer`, one reference
/// per handle copy.
pub(crate) fn retain_objects(
    objects: &mut dyn ObjectModel,
    descriptors: &HashMap<u16, KeyEntry>,
    buffer: &[u8],
) {
    for entry in descriptors.values() {
        if entry.info.kind == KeyKind::Object {
            let handle = ObjectHandle::read_from(buffer, entry.info.offset as usize);
            if !handle.is_null() {
                objects.retain(handle);
            }
        }
    }
}

/// Release every non-null object handle stored in `buffer`.
pub(crate) fn release_objects(
    objects: &mut dyn ObjectModel,
    descriptors: &HashMap<u16, KeyEntry>,
    buffer: &[u8],
) {
    for entry in descriptors.values() {
        if entry.info.kind == KeyKind::Object {
            let handle = ObjectHandle::read_from(buffer, entry.info.offset as usize);
            if !handle.is_null() {
                objects.release(handle);
            }
        }
    }
}
