use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::ast::{Class, Declaration, File, Prop};
use crate::error::{At, ReduceError};
use crate::resolver::{ClassResolver, Realize};

/// Reduce a parsed manifest into the flat catalog of realized declarations
/// for its nodes.
///
/// Nodes are walked in source order; each is treated as a parameterless
/// class activation, and any `class { 'X': ... }` declarations reached from
/// it recurse through the same realization bookkeeping. The first error
/// aborts the reduction.
pub fn reduce(file: &File) -> Result<Vec<Declaration>, ReduceError> {
    let mut reducer = Reducer::new(file)?;

    for node in &file.nodes {
        debug!("reducing node '{}'", node.name);
        let class = Class::from(node);
        let resolved =
            ClassResolver::new(&class, &[], &node.filename, node.line, &mut reducer).resolve()?;
        reducer.index_declarations(resolved.declarations)?;
    }

    Ok(reducer.into_catalog())
}

/// Global realization state for one reduction: the class index plus the
/// realized sets that enforce one-realization-per-class and
/// one-realization-per-(type, name).
struct Reducer<'a> {
    classes_by_name: HashMap<&'a str, &'a Class>,

    /// Where each realized class was realized from. A second realization
    /// attempt, including a cyclic one, is rejected against this map.
    realized_classes: HashMap<String, At>,

    /// All realized declarations, indexed by type, then by resolved name.
    /// Insertion order is realization order, which makes the flattened
    /// catalog deterministic.
    realized_declarations: IndexMap<String, IndexMap<String, Declaration>>,
}

impl<'a> Reducer<'a> {
    fn new(file: &'a File) -> Result<Reducer<'a>, ReduceError> {
        let mut classes_by_name: HashMap<&str, &Class> = HashMap::new();
        for class in &file.classes {
            if let Some(existing) = classes_by_name.get(class.name.as_str()) {
                return Err(ReduceError::ClassRedefined {
                    name: class.name.clone(),
                    at: At::new(&class.filename, class.line),
                    previously_at: At::new(&existing.filename, existing.line),
                });
            }
            classes_by_name.insert(&class.name, class);
        }

        Ok(Reducer {
            classes_by_name,
            realized_classes: HashMap::new(),
            realized_declarations: IndexMap::new(),
        })
    }

    /// Merge one activation's output into the global index, rejecting any
    /// `(type, name)` pair that has already been realized.
    fn index_declarations(&mut self, declarations: Vec<Declaration>) -> Result<(), ReduceError> {
        for decl in declarations {
            // The class resolver only emits declarations whose scalar has
            // reduced to a string.
            let name = match decl.name() {
                Some(name) => name.to_string(),
                None => continue,
            };

            let by_name = self.realized_declarations.entry(decl.kind.clone()).or_default();
            if let Some(previous) = by_name.get(&name) {
                return Err(ReduceError::DeclarationRealizedTwice {
                    kind: decl.kind.clone(),
                    name,
                    at: At::new(&decl.filename, decl.line),
                    previously_at: At::new(&previous.filename, previous.line),
                });
            }

            trace!("realized {}['{}']", decl.kind, name);
            by_name.insert(name, decl);
        }
        Ok(())
    }

    fn into_catalog(self) -> Vec<Declaration> {
        self.realized_declarations
            .into_values()
            .flat_map(IndexMap::into_values)
            .collect()
    }
}

impl Realize for Reducer<'_> {
    fn realize_class(&mut self, name: &str, args: Vec<Prop>, at: At) -> Result<(), ReduceError> {
        let class = match self.classes_by_name.get(name) {
            Some(class) => *class,
            None => {
                return Err(ReduceError::UndefinedClassReference {
                    name: name.to_string(),
                    at,
                })
            }
        };

        if let Some(previously_at) = self.realized_classes.get(name) {
            return Err(ReduceError::ClassRealizedTwice {
                name: name.to_string(),
                at,
                previously_at: previously_at.clone(),
            });
        }

        debug!("realizing class {} at {}", name, at);
        // Record before resolving, so a class reaching itself through any
        // chain of nested realizations trips the check above.
        self.realized_classes.insert(name.to_string(), at.clone());

        let resolved = ClassResolver::new(class, &args, &at.file, at.line, self).resolve()?;
        self.index_declarations(resolved.declarations)
    }
}
