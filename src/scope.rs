use std::collections::{HashMap, HashSet};

use crate::ast::{
    Expression, InterpolatedString, Param, Prop, Reference, Segment, Value, VariableDef,
    VariableName,
};
use crate::error::{At, ReduceError};
use crate::expression;

/// The reserved argument name that bypasses parameter matching. Dependency
/// semantics belong to the downstream applier.
const DEPENDS: &str = "depends";

/// One link of the resolution chain, kept for cycle diagnostics. For
/// `$foo = $bar` followed by `$bar = $foo`, the chain at detection time is
/// `[$foo, $bar]` and the reported cycle is `[$foo, $bar, $foo]`.
#[derive(Debug, Clone)]
struct ChainLink {
    name: String,
    line: usize,
}

/// Per-activation variable scope for one class or node.
///
/// Holds the unresolved definitions installed from params and body, and the
/// bindings resolved so far. A definition migrates from the unresolved map
/// to the resolved map the first time it is fully reduced, so repeated uses
/// within the activation don't re-resolve.
pub struct LocalState {
    /// Top level variable definitions not yet resolved, by name (with sigil).
    var_defs_by_name: HashMap<String, VariableDef>,

    /// Bindings with their final values.
    resolved_vars: HashMap<String, Value>,

    /// Where the class is defined, and where/at which line it was realized.
    /// Used for error locations.
    defined_in: String,
    realized_in: String,
    realized_line: usize,
}

impl LocalState {
    pub fn new(defined_in: &str, realized_in: &str, realized_line: usize) -> LocalState {
        LocalState {
            var_defs_by_name: HashMap::new(),
            resolved_vars: HashMap::new(),
            defined_in: defined_in.to_string(),
            realized_in: realized_in.to_string(),
            realized_line,
        }
    }

    fn has_binding(&self, name: &str) -> bool {
        self.var_defs_by_name.contains_key(name) || self.resolved_vars.contains_key(name)
    }

    /// Bind each class parameter to the caller's matching argument, or fall
    /// back to its default. Args are matched by param name minus the sigil;
    /// `depends` never participates. Leftover caller args are rejected in
    /// caller order.
    pub fn install_params(&mut self, args: &[Prop], params: &[Param]) -> Result<(), ReduceError> {
        let mut args_by_name: HashMap<&str, &Prop> = HashMap::new();
        for arg in args {
            if arg.name != DEPENDS {
                args_by_name.insert(arg.name.as_str(), arg);
            }
        }

        for param in params {
            if self.has_binding(&param.name) {
                return Err(ReduceError::MultipleDefinition {
                    line: param.line,
                    name: param.name.clone(),
                });
            }

            let bare_name = param.name.strip_prefix('$').unwrap_or(&param.name);
            let value = match args_by_name.remove(bare_name) {
                Some(arg) => Some(arg.value.clone()),
                None => param.default.clone(),
            };

            let value = match value {
                Some(value) => value,
                None => {
                    return Err(ReduceError::MissingRequiredArgument {
                        param: bare_name.to_string(),
                        at: At::new(&self.realized_in, self.realized_line),
                    })
                }
            };

            self.var_defs_by_name.insert(
                param.name.clone(),
                VariableDef {
                    name: param.name.clone(),
                    value,
                    line: param.line,
                },
            );
        }

        for arg in args {
            if args_by_name.contains_key(arg.name.as_str()) {
                return Err(ReduceError::UnsupportedArgument {
                    name: arg.name.clone(),
                    at: At::new(&self.realized_in, arg.line),
                });
            }
        }

        Ok(())
    }

    /// Insert the body's variable definitions. A name already bound (by a
    /// param or an earlier def) is a `MultipleDefinition` at the new def.
    pub fn install_var_defs(&mut self, defs: &[VariableDef]) -> Result<(), ReduceError> {
        for def in defs {
            if self.has_binding(&def.name) {
                return Err(ReduceError::MultipleDefinition {
                    line: def.line,
                    name: def.name.clone(),
                });
            }
            self.var_defs_by_name.insert(def.name.clone(), def.clone());
        }
        Ok(())
    }

    /// Resolve a variable use to its concrete value.
    pub fn resolve_variable(
        &mut self,
        var: &VariableName,
        line: usize,
    ) -> Result<Value, ReduceError> {
        self.resolve_variable_rec(var, line, Vec::new(), HashSet::new())
    }

    /// Resolve any value, reducing transitive variables, arrays, references,
    /// interpolations and expressions.
    pub fn resolve_value(&mut self, value: &Value, line: usize) -> Result<Value, ReduceError> {
        self.resolve_value_rec(value, line, Vec::new(), HashSet::new())
    }

    /// Resolve every prop value, preserving order, names and lines.
    pub fn resolve_props(&mut self, props: &[Prop]) -> Result<Vec<Prop>, ReduceError> {
        let mut resolved = Vec::with_capacity(props.len());
        for prop in props {
            resolved.push(Prop {
                name: prop.name.clone(),
                value: self.resolve_value(&prop.value, prop.line)?,
                line: prop.line,
            });
        }
        Ok(resolved)
    }

    /// The recursive worker behind `resolve_variable`.
    ///
    /// `chain` is the ordered list of definitions followed so far, carried
    /// by value down the recursion; it only ever surfaces inside a cyclic
    /// error. `seen` detects the cycle itself and is copied at every branch
    /// point (array elements, interpolation segments) so diamond-shaped
    /// references are not misreported.
    fn resolve_variable_rec(
        &mut self,
        looking_for: &VariableName,
        line: usize,
        mut chain: Vec<ChainLink>,
        mut seen: HashSet<String>,
    ) -> Result<Value, ReduceError> {
        if let Some(value) = self.resolved_vars.get(&looking_for.name) {
            return Ok(value.clone());
        }

        let def = match self.var_defs_by_name.get(&looking_for.name) {
            Some(def) => def.clone(),
            None => {
                return Err(ReduceError::UnresolvableVariable {
                    line,
                    name: looking_for.name.clone(),
                })
            }
        };

        if seen.contains(&looking_for.name) {
            let mut cycle: Vec<String> = chain.iter().map(|link| link.name.clone()).collect();
            cycle.push(looking_for.name.clone());
            let (err_line, err_name) = match chain.first() {
                Some(first) => (first.line, first.name.clone()),
                None => (line, looking_for.name.clone()),
            };
            return Err(ReduceError::CyclicVariable {
                line: err_line,
                name: err_name,
                cycle,
            });
        }

        // Mark before dispatching on the value, so a self-cycle through an
        // array or interpolation terminates too.
        seen.insert(looking_for.name.clone());
        chain.push(ChainLink {
            name: def.name.clone(),
            line: def.line,
        });

        let resolved = match &def.value {
            Value::Variable(next) => self.resolve_variable_rec(next, def.line, chain, seen)?,
            other => self.resolve_value_rec(other, def.line, chain, seen)?,
        };

        self.var_defs_by_name.remove(&looking_for.name);
        self.resolved_vars
            .insert(looking_for.name.clone(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_value_rec(
        &mut self,
        value: &Value,
        line: usize,
        chain: Vec<ChainLink>,
        seen: HashSet<String>,
    ) -> Result<Value, ReduceError> {
        match value {
            Value::Variable(var) => self.resolve_variable_rec(var, line, chain, seen),
            Value::Array(values) => Ok(Value::Array(
                self.resolve_array_rec(values, line, &chain, &seen)?,
            )),
            Value::Reference(reference) => self.resolve_reference_rec(reference, chain, seen),
            Value::Interpolated(interpolated) => {
                self.resolve_interpolated_rec(interpolated, &chain, &seen)
            }
            Value::Expression(expression) => {
                self.resolve_expression_rec(expression, &chain, &seen)
            }
            other => Ok(other.clone()),
        }
    }

    /// Resolve each element with its own copy of the seen-set along the
    /// shared chain.
    fn resolve_array_rec(
        &mut self,
        values: &[Value],
        line: usize,
        chain: &[ChainLink],
        seen: &HashSet<String>,
    ) -> Result<Vec<Value>, ReduceError> {
        let mut resolved = Vec::with_capacity(values.len());
        for value in values {
            resolved.push(self.resolve_value_rec(value, line, chain.to_vec(), seen.clone())?);
        }
        Ok(resolved)
    }

    /// Concatenate segments in order; each variable segment must come out a
    /// string. The result is a quoted string.
    fn resolve_interpolated_rec(
        &mut self,
        interpolated: &InterpolatedString,
        chain: &[ChainLink],
        seen: &HashSet<String>,
    ) -> Result<Value, ReduceError> {
        let mut out = String::new();
        for segment in &interpolated.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Variable(var) => {
                    let value = self.resolve_variable_rec(
                        var,
                        interpolated.line,
                        chain.to_vec(),
                        seen.clone(),
                    )?;
                    match value {
                        Value::String(s) => out.push_str(&s),
                        _ => {
                            return Err(ReduceError::NonStringInterpolation {
                                line: interpolated.line,
                                name: var.name.clone(),
                            })
                        }
                    }
                }
            }
        }
        Ok(Value::String(out))
    }

    /// A reference key must end up a quoted string.
    fn resolve_reference_rec(
        &mut self,
        reference: &Reference,
        chain: Vec<ChainLink>,
        seen: HashSet<String>,
    ) -> Result<Value, ReduceError> {
        match reference.scalar.as_ref() {
            Value::String(_) => Ok(Value::Reference(reference.clone())),
            Value::Variable(var) => {
                let resolved = self.resolve_variable_rec(var, reference.line, chain, seen)?;
                match resolved {
                    Value::String(_) => Ok(Value::Reference(Reference {
                        type_name: reference.type_name.clone(),
                        scalar: Box::new(resolved),
                        line: reference.line,
                    })),
                    _ => Err(ReduceError::NonStringReferenceKey {
                        at: At::new(&self.defined_in, reference.line),
                        var_name: Some(var.name.clone()),
                    }),
                }
            }
            _ => Err(ReduceError::NonStringReferenceKey {
                at: At::new(&self.defined_in, reference.line),
                var_name: None,
            }),
        }
    }

    /// Resolve both operands along the current chain, each with its own copy
    /// of the seen-set, then dispatch to the evaluator.
    fn resolve_expression_rec(
        &mut self,
        expr: &Expression,
        chain: &[ChainLink],
        seen: &HashSet<String>,
    ) -> Result<Value, ReduceError> {
        let left = self.resolve_value_rec(&expr.left, expr.line, chain.to_vec(), seen.clone())?;
        let right = self.resolve_value_rec(&expr.right, expr.line, chain.to_vec(), seen.clone())?;
        expression::evaluate(
            &expr.op,
            &left,
            &right,
            At::new(&self.defined_in, expr.line),
        )
    }
}
