use log::trace;

use crate::ast::{Class, Declaration, Prop, Value, VariableDef, VariableName, CLASS_KIND};
use crate::error::{At, ReduceError};
use crate::scope::LocalState;

/// The seam between one class activation and the global realization state.
///
/// The class resolver reports nested `class { 'X': ... }` declarations
/// through this trait instead of holding a pointer back to the top-level
/// resolver, which keeps a single activation testable on its own.
pub trait Realize {
    /// Realize class `name` with the given (already resolved) args. `at` is
    /// the location of the realizing declaration.
    fn realize_class(&mut self, name: &str, args: Vec<Prop>, at: At) -> Result<(), ReduceError>;
}

/// Resolves one class-or-node activation down to concrete values.
pub struct ClassResolver<'a, R: Realize> {
    class: &'a Class,
    args: &'a [Prop],
    realized_in: String,
    realized_line: usize,
    realizer: &'a mut R,
}

impl<'a, R: Realize> ClassResolver<'a, R> {
    /// `args` are the caller-supplied arguments (empty for nodes);
    /// `realized_in`/`realized_line` locate the declaration that realized
    /// this class, for provenance in diagnostics.
    pub fn new(
        class: &'a Class,
        args: &'a [Prop],
        realized_in: &str,
        realized_line: usize,
        realizer: &'a mut R,
    ) -> ClassResolver<'a, R> {
        ClassResolver {
            class,
            args,
            realized_in: realized_in.to_string(),
            realized_line,
            realizer,
        }
    }

    /// Produce the resolved class: every binding reduced, every declaration
    /// name a concrete string, every prop value concrete. Nested class
    /// realizations are handed to the realizer and consumed; they emit no
    /// declaration of their own.
    pub fn resolve(mut self) -> Result<Class, ReduceError> {
        let mut scope = LocalState::new(
            &self.class.filename,
            &self.realized_in,
            self.realized_line,
        );
        scope.install_params(self.args, &self.class.params)?;
        scope.install_var_defs(&self.class.var_defs)?;

        // Resolve every binding up front, in source order. Resolution is
        // also lazy on demand below; the eager pass pins diagnostic order
        // to the manifest.
        let mut var_defs = Vec::with_capacity(self.class.var_defs.len());
        for def in &self.class.var_defs {
            let value =
                scope.resolve_variable(&VariableName::new(&def.name, def.line), def.line)?;
            var_defs.push(VariableDef {
                name: def.name.clone(),
                value,
                line: def.line,
            });
        }

        let mut declarations = Vec::new();
        for decl in &self.class.declarations {
            let scalar = scope.resolve_value(&decl.scalar, decl.line)?;
            let name = match &scalar {
                Value::String(name) => name.clone(),
                _ => {
                    return Err(ReduceError::NonStringDeclarationName {
                        kind: decl.kind.clone(),
                        at: At::new(&self.class.filename, decl.line),
                    })
                }
            };
            let props = scope.resolve_props(&decl.props)?;

            if decl.kind == CLASS_KIND {
                self.realizer
                    .realize_class(&name, props, At::new(&self.class.filename, decl.line))?;
            } else {
                trace!(
                    "emitting {}['{}'] from class {}",
                    decl.kind,
                    name,
                    self.class.name
                );
                declarations.push(Declaration {
                    kind: decl.kind.clone(),
                    scalar,
                    props,
                    line: decl.line,
                    filename: self.class.filename.clone(),
                });
            }
        }

        Ok(Class {
            name: self.class.name.clone(),
            params: self.class.params.clone(),
            var_defs,
            declarations,
            filename: self.class.filename.clone(),
            line: self.class.line,
        })
    }
}
