// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Named, typed resources shared between modules.
//!
//! A resource is written by its owner (or by anyone when world-writable) and
//! every write is pushed to its watchers, in registration order. A watcher
//! may register before the resource exists: the resource is then
//! pre-declared, unclaimed, until a module declares it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gale_core::{NameIndex, Var, VarType};
use gale_telemetry::ShellLevel;

use crate::engine::CoreEngine;
use crate::error::CoreError;
use crate::ids::{ModuleId, ResourceId};

#[derive(Debug)]
pub(crate) struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    pub(crate) owner: Option<ModuleId>,
    pub(crate) world_writable: bool,
    pub(crate) watchers: Vec<ModuleId>,
    value: Arc<Mutex<Var>>,
}

impl Resource {
    fn new(id: ResourceId, name: &str, var_type: VarType, owner: Option<ModuleId>) -> Self {
        let mut value = Var::named(name, gale_core::VarValue::Void);
        value.set_type(var_type);
        Self {
            id,
            name: name.to_owned(),
            owner,
            world_writable: false,
            watchers: Vec::new(),
            value: Arc::new(Mutex::new(value)),
        }
    }

    pub(crate) fn lock_value(&self) -> MutexGuard<'_, Var> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn var_type(&self) -> VarType {
        self.lock_value().var_type()
    }
}

/// Table of resources, indexed by name.
#[derive(Debug)]
pub(crate) struct ResourceRegistry {
    resources: Vec<Resource>,
    index: NameIndex,
}

impl ResourceRegistry {
    pub(crate) fn new() -> Self {
        Self {
            resources: Vec::new(),
            index: NameIndex::name_index(),
        }
    }

    pub(crate) fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    pub(crate) fn find(&self, name: &str) -> Option<ResourceId> {
        self.index.lookup(name).map(ResourceId)
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    fn push(&mut self, resource: Resource) -> ResourceId {
        let id = resource.id;
        self.index.insert_name(&resource.name, id.index());
        self.resources.push(resource);
        id
    }

    /// Claims a pre-declared resource or allocates a new one.
    /// Returns the id and whether a new record was created.
    pub(crate) fn create(
        &mut self,
        owner: ModuleId,
        name: &str,
        var_type: VarType,
        world_writable: bool,
    ) -> Result<(ResourceId, bool), Option<ModuleId>> {
        if let Some(id) = self.find(name) {
            let resource = &mut self.resources[id.index()];
            return match resource.owner {
                None => {
                    resource.owner = Some(owner);
                    resource.world_writable = world_writable;
                    resource.lock_value().set_type(var_type);
                    Ok((id, false))
                }
                Some(current) => Err(Some(current)),
            };
        }
        let id = ResourceId(self.resources.len());
        let mut resource = Resource::new(id, name, var_type, Some(owner));
        resource.world_writable = world_writable;
        Ok((self.push(resource), true))
    }

    /// Adds a watcher, pre-declaring the resource if needed.
    /// Returns the id, whether a record was created and whether the module
    /// was already watching.
    pub(crate) fn add_watcher(&mut self, module: ModuleId, name: &str) -> (ResourceId, bool, bool) {
        match self.find(name) {
            Some(id) => {
                let resource = &mut self.resources[id.index()];
                if resource.watchers.contains(&module) {
                    (id, false, true)
                } else {
                    resource.watchers.push(module);
                    (id, false, false)
                }
            }
            None => {
                let id = ResourceId(self.resources.len());
                let mut resource = Resource::new(id, name, VarType::Void, None);
                resource.watchers.push(module);
                (self.push(resource), true, false)
            }
        }
    }
}

impl CoreEngine {
    /// Declares a resource owned by `owner`.
    ///
    /// A resource pre-declared by a watcher is claimed and keeps its id.
    pub fn create_resource(
        &self,
        owner: ModuleId,
        name: &str,
        var_type: VarType,
        world_writable: bool,
    ) -> Result<ResourceId, CoreError> {
        let owner_name = {
            let modules = self.modules();
            match modules.get(owner) {
                Some(m) => m.name.clone(),
                None => return Err(self.fail(CoreError::UnknownModule(owner.index()))),
            }
        };

        let created = self
            .resources_mut()
            .create(owner, name, var_type, world_writable);
        match created {
            Ok((id, is_new)) => {
                if is_new {
                    self.completion().add(name);
                }
                self.shell_print(
                    ShellLevel::Debug,
                    &format!("Resource '{name}' declared by module '{owner_name}'."),
                );
                Ok(id)
            }
            Err(current) => {
                let current = current.map_or_else(String::new, |m| self.modules().name_of(m));
                Err(self.fail(CoreError::ResourceExists {
                    module: owner_name,
                    resource: name.to_owned(),
                    owner: current,
                }))
            }
        }
    }

    /// Registers `module` as a watcher of the resource `name`.
    ///
    /// Watching twice is reported and returns the existing id.
    pub fn add_resource_watcher(
        &self,
        module: ModuleId,
        name: &str,
    ) -> Result<ResourceId, CoreError> {
        let module_name = {
            let modules = self.modules();
            let Some(m) = modules.get(module) else {
                return Err(self.fail(CoreError::UnknownModule(module.index())));
            };
            if m.callbacks.resource.is_none() {
                return Err(self.fail(CoreError::NoResourceCallback(m.name.clone())));
            }
            m.name.clone()
        };

        let (id, created, duplicate) = self.resources_mut().add_watcher(module, name);
        if created {
            self.completion().add(name);
        }
        if duplicate {
            self.shell_print(
                ShellLevel::Error,
                &format!("Module '{module_name}' is already watching '{name}' resource."),
            );
        }
        Ok(id)
    }

    /// Looks up a resource, claimed or not, by name.
    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resources().find(name)
    }

    /// Writes a resource and notifies its watchers synchronously.
    pub fn set_resource_value(
        &self,
        module: ModuleId,
        resource: ResourceId,
        value: &Var,
    ) -> Result<(), CoreError> {
        let module_name = self.modules().name_of(module);

        let (watchers, snapshot) = {
            let resources = self.resources();
            let target = match resources.get(resource) {
                Some(r) if r.owner.is_some() => r,
                _ => {
                    return Err(self.fail(CoreError::UnknownResource {
                        module: module_name,
                        resource: resource.index(),
                    }))
                }
            };
            if target.owner != Some(module) && !target.world_writable {
                return Err(self.fail(CoreError::ResourceReadOnly {
                    module: module_name,
                    resource: target.name.clone(),
                }));
            }
            let mut stored = target.lock_value();
            if stored.var_type() != value.var_type() {
                let expected = stored.var_type();
                drop(stored);
                return Err(self.fail(CoreError::ResourceType {
                    module: module_name,
                    resource: target.name.clone(),
                    expected,
                    found: value.var_type(),
                }));
            }
            stored.assign(value);
            (target.watchers.clone(), stored.clone())
        };

        let callbacks: Vec<_> = {
            let modules = self.modules();
            watchers
                .iter()
                .filter_map(|&w| modules.get(w).and_then(|m| m.callbacks.resource.clone()))
                .collect()
        };
        for callback in callbacks {
            callback(self, resource, &snapshot);
        }
        Ok(())
    }

    /// Sends a copy of the current value of `resource` to `module`'s
    /// resource callback, watcher or not.
    pub fn ask_resource_sending(
        &self,
        module: ModuleId,
        resource: ResourceId,
    ) -> Result<(), CoreError> {
        let copy = {
            let resources = self.resources();
            let Some(target) = resources.get(resource) else {
                return Err(self.fail(CoreError::UnknownResource {
                    module: self.modules().name_of(module),
                    resource: resource.index(),
                }));
            };
            let copy = target.lock_value().clone();
            copy
        };

        let callback = {
            let modules = self.modules();
            let Some(m) = modules.get(module) else {
                return Err(self.fail(CoreError::UnknownModule(module.index())));
            };
            match m.callbacks.resource.clone() {
                Some(cb) => cb,
                None => return Err(self.fail(CoreError::NoResourceCallback(m.name.clone()))),
            }
        };
        callback(self, resource, &copy);
        Ok(())
    }

    /// Returns a copy of the current value of a resource.
    pub fn resource_value(&self, resource: ResourceId) -> Option<Var> {
        self.resources()
            .get(resource)
            .map(|r| r.lock_value().clone())
    }

    /// Declared type of a resource; Void while only pre-declared.
    pub fn resource_type(&self, resource: ResourceId) -> Option<VarType> {
        self.resources().get(resource).map(Resource::var_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watcher_then_claim_converges() {
        let mut registry = ResourceRegistry::new();
        let (id, created, dup) = registry.add_watcher(ModuleId(3), "score");
        assert!(created && !dup);
        assert!(registry.get(id).unwrap().owner.is_none());
        assert_eq!(registry.get(id).unwrap().var_type(), VarType::Void);

        let (claimed, is_new) = registry.create(ModuleId(2), "score", VarType::Int, true).unwrap();
        assert_eq!(claimed, id);
        assert!(!is_new);
        let resource = registry.get(id).unwrap();
        assert_eq!(resource.owner, Some(ModuleId(2)));
        assert!(resource.world_writable);
        assert_eq!(resource.var_type(), VarType::Int);
        assert_eq!(resource.lock_value().name(), "score");

        assert_eq!(
            registry.create(ModuleId(4), "score", VarType::Int, false),
            Err(Some(ModuleId(2)))
        );
        assert_eq!(registry.add_watcher(ModuleId(3), "score"), (id, false, true));
    }

    #[test]
    fn name_lookup_matches_ids() {
        let mut registry = ResourceRegistry::new();
        let names = ["z", "m", "a", "q", "b"];
        for (i, name) in names.iter().enumerate() {
            let (id, _) = registry.create(ModuleId(0), name, VarType::Int, false).unwrap();
            assert_eq!(id, ResourceId(i));
        }
        for (i, name) in names.iter().enumerate() {
            assert_eq!(registry.find(name), Some(ResourceId(i)));
        }
        assert_eq!(registry.find("c"), None);
    }
}
