//! Template compilation
//!
//! Compilation turns one validated template into a [`CompiledData`]: the
//! parent's compiled buffer and maps are copied as an identical prefix,
//! then the level's own keys are packed after it, sorted ascending by
//! size and stable on declaration order. That sort is part of the layout
//! contract; tools bake offsets against it.

use std::collections::HashMap;

use log::{debug, error, info, warn};

use crate::compiled::{CompiledData, KeyEntry};
use crate::error::CompileError;
use crate::key::{KeyDef, KeyInfo};
use crate::runtime::{release_objects, retain_objects, BlackboardRuntime};
use crate::sync::SyncListener;
use crate::template::{Backends, TemplateId};

/// Running layout cursor for one compile: the next free offset and the
/// next key index, both starting where the parent's layout ended.
#[derive(Debug, Clone, Copy)]
struct KeyCompilerContext {
    next_offset: u16,
    next_index: u16,
}

impl KeyCompilerContext {
    fn new(parent_size: u16, parent_key_count: u16) -> Self {
        Self {
            next_offset: parent_size,
            next_index: parent_key_count,
        }
    }

    fn place(&mut self, key: &KeyDef) -> KeyInfo {
        let info = KeyInfo {
            offset: self.next_offset,
            index: self.next_index,
            kind: key.kind(),
            traits: key.traits,
        };
        self.next_offset += key.size();
        self.next_index += 1;
        info
    }
}

impl BlackboardRuntime {
    /// Compile a template into its packed level.
    ///
    /// Requires the parent (if any) to be compiled first; compiling a
    /// template that already has a compiled level is a no-op. Failures
    /// are logged and leave no partial level behind.
    pub fn compile(&mut self, id: TemplateId) -> Result<(), CompileError> {
        let Some(template) = self.templates.get(id) else {
            error!("compile of an unregistered template id");
            return Err(CompileError::UnknownTemplate);
        };
        if self.compiled.contains_key(&id) {
            debug!("template '{}' is already compiled", template.name);
            return Ok(());
        }
        if !template.backends.contains(Backends::COMPILED) {
            error!(
                "template '{}' does not target the compiled backend",
                template.name
            );
            return Err(CompileError::BackendNotTargeted(template.name.clone()));
        }

        // Inherited prefix: parent buffer and maps copied verbatim, so
        // every inherited key keeps its exact parent offset.
        let (parent, parent_size, parent_key_count, mut buffer, mut offsets, mut descriptors) =
            match template.parent {
                Some(parent_id) => {
                    let Some(parent_data) = self.compiled.get(&parent_id) else {
                        let parent_name = self.template_name(parent_id);
                        error!(
                            "template '{}' compiled before its parent '{}'",
                            template.name, parent_name
                        );
                        return Err(CompileError::ParentNotCompiled {
                            template: template.name.clone(),
                            parent: parent_name,
                        });
                    };
                    (
                        Some(parent_id),
                        parent_data.size,
                        parent_data.key_count,
                        parent_data.buffer.clone(),
                        parent_data.offsets.clone(),
                        parent_data.descriptors.clone(),
                    )
                }
                None => (None, 0, 0, Vec::new(), HashMap::new(), HashMap::new()),
            };

        // Own keys, ascending by size; Vec::sort_by_key is stable, so
        // equal-size keys keep declaration order.
        let mut own: Vec<&KeyDef> = template.own_keys().collect();
        own.sort_by_key(|key| key.size());

        let own_size: u16 = own.iter().map(|key| key.size()).sum();
        let key_count = parent_key_count + own.len() as u16;
        let size = parent_size + own_size;
        buffer.resize(size as usize, 0);

        let mut context = KeyCompilerContext::new(parent_size, parent_key_count);
        for key in own {
            let info = context.place(key);
            key.default.write_default(&mut buffer, info.offset);
            offsets.insert(key.name.clone().into_boxed_str(), info.offset);
            descriptors.insert(
                info.offset,
                KeyEntry {
                    name: key.name.clone().into_boxed_str(),
                    info,
                },
            );
        }

        // Defaults and inherited copies both count as live handle copies.
        retain_objects(self.objects.as_mut(), &descriptors, &buffer);

        info!(
            "compiled blackboard level '{}': {} key(s), {} byte(s)",
            template.name, key_count, size
        );
        let revision = self.next_revision;
        self.next_revision += 1;
        self.compiled.insert(
            id,
            CompiledData {
                template: id,
                revision,
                parent,
                parent_size,
                size,
                key_count,
                buffer,
                offsets,
                descriptors,
                listeners: Vec::new(),
            },
        );
        if let Some(parent_id) = parent {
            if let Some(parent_data) = self.compiled.get_mut(&parent_id) {
                parent_data.add_listener(SyncListener::Level(id));
            }
        }
        Ok(())
    }

    /// Free a template's compiled level. Idempotent; freeing a level that
    /// still has listeners attached is allowed but warned about, since
    /// those listeners go stale.
    pub fn free(&mut self, id: TemplateId) {
        let Some(data) = self.compiled.remove(&id) else {
            return;
        };
        let name = self.template_name(id);
        if data.listener_count() > 0 {
            warn!(
                "freeing compiled level '{}' with {} listener(s) still attached",
                name,
                data.listener_count()
            );
        }
        release_objects(self.objects.as_mut(), &data.descriptors, &data.buffer);
        if let Some(parent_id) = data.parent {
            if let Some(parent_data) = self.compiled.get_mut(&parent_id) {
                parent_data.remove_listener(SyncListener::Level(id));
            }
        }
        info!("freed compiled blackboard level '{name}'");
    }
}
