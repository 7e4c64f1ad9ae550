//! Template validation
//!
//! Structural problems in authored templates are diagnostics, not errors:
//! [`validate`](crate::runtime::BlackboardRuntime::validate) walks every
//! check and accumulates everything it finds into a [`ValidationReport`]
//! instead of stopping at the first problem, so a designer sees the whole
//! list at once. Compilation does not call this; gating compiles on a
//! clean report is the host pipeline's convention.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::runtime::BlackboardRuntime;
use crate::template::TemplateId;

/// One structural problem found in a template chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    /// The validated id is not in the registry.
    #[error("template id is not registered")]
    UnknownTemplate,
    /// The parent chain loops back on itself.
    #[error("hierarchy of '{template}' recurses through '{recursion_point}'")]
    CyclicHierarchy {
        /// The validated template.
        template: String,
        /// First level seen twice while walking up.
        recursion_point: String,
    },
    /// A parent id whose template was removed from the registry.
    #[error("parent of '{template}' is no longer registered")]
    DanglingParent {
        /// The level holding the dangling link.
        template: String,
    },
    /// An authored-but-unfilled key slot.
    #[error("'{template}' has an empty key slot at index {index}")]
    EmptyKeySlot {
        /// The level holding the slot.
        template: String,
        /// Declaration index of the slot.
        index: usize,
    },
    /// Two keys in the chain share a name.
    #[error("key '{key}' in '{declared_in}' collides with '{collides_with}'")]
    DuplicateKeyName {
        /// The colliding name.
        key: String,
        /// Level redeclaring it.
        declared_in: String,
        /// Level that declared it first, walking from the root down.
        collides_with: String,
    },
    /// A child targets backends its parent does not.
    #[error("'{template}' targets backends its parent '{parent}' does not")]
    BackendNotSubset {
        /// The child level.
        template: String,
        /// Its parent.
        parent: String,
    },
    /// An enum key authored with a backing type wider than one byte.
    #[error("enum key '{key}' has a {width}-byte backing type; 1 byte is required")]
    WideEnumBacking {
        /// The offending key.
        key: String,
        /// Authored backing width.
        width: u8,
    },
    /// A required object key whose default is null.
    #[error("required object key '{key}' defaults to null")]
    MissingObjectDefault {
        /// The offending key.
        key: String,
    },
}

/// Result of validating one template: a success flag in the shape of an
/// issue list.
#[derive(Debug, Default)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Whether validation found nothing wrong.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Every accumulated issue, in check order.
    #[inline]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Consume the report, keeping the issues.
    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}

impl BlackboardRuntime {
    /// Validate a template and its chain.
    ///
    /// Checks run in a fixed order: cycles, empty slots, duplicate names,
    /// backend compatibility, then per-key rules. Every failure is
    /// reported together. Duplicate detection stops at a recursion point
    /// so a cyclic chain does not loop the walk.
    pub fn validate(&self, id: TemplateId) -> ValidationReport {
        let mut issues = Vec::new();

        let Some(template) = self.templates.get(id) else {
            return ValidationReport {
                issues: vec![ValidationIssue::UnknownTemplate],
            };
        };

        // Walk the parent chain once, recording each level visited. The
        // walk stops at the first repeated level (cycle) or unresolvable
        // id (dangling parent); later checks reuse the recorded chain.
        let mut chain = vec![id];
        let mut cursor = template;
        loop {
            let Some(parent_id) = cursor.parent else { break };
            match self.templates.get(parent_id) {
                Some(parent) => {
                    if chain.contains(&parent_id) {
                        issues.push(ValidationIssue::CyclicHierarchy {
                            template: template.name.clone(),
                            recursion_point: parent.name.clone(),
                        });
                        break;
                    }
                    chain.push(parent_id);
                    cursor = parent;
                }
                None => {
                    issues.push(ValidationIssue::DanglingParent {
                        template: cursor.name.clone(),
                    });
                    break;
                }
            }
        }

        for (index, slot) in template.keys.iter().enumerate() {
            if slot.is_none() {
                issues.push(ValidationIssue::EmptyKeySlot {
                    template: template.name.clone(),
                    index,
                });
            }
        }

        // Name uniqueness across the chain, attributed root-down so the
        // redeclaring level is the one blamed.
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for level_id in chain.iter().rev() {
            let Some(level) = self.templates.get(*level_id) else {
                continue;
            };
            for key in level.own_keys() {
                match seen.entry(key.name.as_str()) {
                    Entry::Occupied(first) => {
                        issues.push(ValidationIssue::DuplicateKeyName {
                            key: key.name.clone(),
                            declared_in: level.name.clone(),
                            collides_with: first.get().to_string(),
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(level.name.as_str());
                    }
                }
            }
        }

        if let Some(parent_id) = template.parent {
            if let Some(parent) = self.templates.get(parent_id) {
                if !template.backends.is_subset_of(parent.backends) {
                    issues.push(ValidationIssue::BackendNotSubset {
                        template: template.name.clone(),
                        parent: parent.name.clone(),
                    });
                }
            }
        }

        for key in template.own_keys() {
            key.validate(&mut issues);
        }

        debug!(
            "validated blackboard template '{}': {} issue(s)",
            template.name,
            issues.len()
        );
        ValidationReport { issues }
    }
}
