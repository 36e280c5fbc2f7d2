use std::fmt;

use thiserror::Error;

/// A source location, rendered as `file:line` in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct At {
    pub file: String,
    pub line: usize,
}

impl At {
    pub fn new(file: &str, line: usize) -> At {
        At {
            file: file.to_string(),
            line,
        }
    }
}

impl fmt::Display for At {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Everything that can go wrong while reducing a manifest.
///
/// Diagnostics are values, never unwinds. The rendered messages are part of
/// the crate's contract and covered by tests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReduceError {
    /// A variable was used but no binding with that name exists in the
    /// activation.
    #[error("Can't resolve variable '{name}' at line {line}")]
    UnresolvableVariable { line: usize, name: String },

    /// A variable's transitive definition loops back on itself. `cycle`
    /// holds the definition chain with the first offender repeated at the
    /// end, e.g. `[$foo, $bar, $foo]`.
    #[error("Cyclic definition of variable '{name}' at line {line} ({})", join_cycle(.cycle))]
    CyclicVariable {
        line: usize,
        name: String,
        cycle: Vec<String>,
    },

    /// The same binding name was declared twice within one activation,
    /// across params and body combined.
    #[error("Variable '{name}' defined multiple times at line {line}")]
    MultipleDefinition { line: usize, name: String },

    #[error("Can't redefine class '{name}' at {at} which is already defined at {previously_at}")]
    ClassRedefined {
        name: String,
        at: At,
        previously_at: At,
    },

    #[error("Reference to undefined class '{name}' at {at}")]
    UndefinedClassReference { name: String, at: At },

    /// Covers both double realization and cyclic realization: a class
    /// realizing itself, directly or transitively, trips the same check.
    #[error("Class {name} realized twice at {at}. Previously realized at {previously_at}")]
    ClassRealizedTwice {
        name: String,
        at: At,
        previously_at: At,
    },

    #[error("Declaration {kind}['{name}'] realized twice at {at}. Previously realized at {previously_at}")]
    DeclarationRealizedTwice {
        kind: String,
        name: String,
        at: At,
        previously_at: At,
    },

    #[error("Can't realize declaration of type {kind} with non-string name at {at}")]
    NonStringDeclarationName { kind: String, at: At },

    /// A reference scalar did not reduce to a string. `var_name` is set when
    /// the scalar was a variable, so the message can point at it.
    #[error("Reference keys must be strings at {at}{}", ref_key_detail(.var_name))]
    NonStringReferenceKey { at: At, var_name: Option<String> },

    #[error("Required argument '{param}' not supplied at {at}")]
    MissingRequiredArgument { param: String, at: At },

    #[error("Unsupported argument '{name}' sent to class at {at}")]
    UnsupportedArgument { name: String, at: At },

    #[error("Bad types ({left_type}, {right_type}) supplied for operation '{op}' at {at}")]
    BadOperandTypes {
        op: String,
        left_type: &'static str,
        right_type: &'static str,
        at: At,
    },

    #[error("Encountered unknown operation '{op}' in expression at {at}")]
    UnknownOperation { op: String, at: At },

    /// An interpolation segment resolved to something other than a string.
    #[error("Can't interpolate non-string value of '{name}' at line {line}")]
    NonStringInterpolation { line: usize, name: String },
}

fn join_cycle(cycle: &[String]) -> String {
    cycle.join(" -> ")
}

fn ref_key_detail(var_name: &Option<String>) -> String {
    match var_name {
        Some(name) => format!(" - the value of {} is not.", name),
        None => String::new(),
    }
}
