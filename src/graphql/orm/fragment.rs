//! Filter fragment combinators
//!
//! A [`Fragment`] pairs a filter [`Clause`] with the [`Variable`]s it
//! references. Fragments are only built through the constructors in this
//! module, each of which takes the variable it uses, so a clause can never
//! reference a variable that is not declared alongside it, and a variable is
//! never carried without a clause that uses it.

use serde_json::Value as JsonValue;

// ============================================================================
// Variable types
// ============================================================================

/// GraphQL scalars used by filter variables
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScalarType {
    String,
    Id,
    Int,
    Float,
    Boolean,
    DateTime,
}

impl ScalarType {
    /// GraphQL type name
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::Id => "ID",
            ScalarType::Int => "Int",
            ScalarType::Float => "Float",
            ScalarType::Boolean => "Boolean",
            ScalarType::DateTime => "DateTime",
        }
    }
}

/// Declared type of an operation variable
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VarType {
    /// A single scalar, e.g. `String`
    Scalar(ScalarType),
    /// A list of scalars, e.g. `[Boolean]`
    List(ScalarType),
    /// A named input object, e.g. `TrailerTypeInput`
    Input(String),
}

impl VarType {
    /// Render the type as it appears in a variable definition
    pub fn render(&self, required: bool) -> String {
        let base = match self {
            VarType::Scalar(scalar) => scalar.name().to_string(),
            VarType::List(scalar) => format!("[{}]", scalar.name()),
            VarType::Input(name) => name.clone(),
        };
        if required { format!("{}!", base) } else { base }
    }
}

/// Conversion applied by the binder to a variable's raw value
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transform {
    /// Bind the raw value unchanged
    None,
    /// First millisecond of the selected day
    StartOfDay,
    /// Last millisecond of the selected day
    EndOfDay,
    /// `"true"`/`"false"` string to a boolean
    Bool,
    /// [`Transform::Bool`] applied to every list item
    BoolList,
    /// Integer-looking strings to numbers, anything else stays a string
    Id,
    /// Same as [`Transform::Id`] applied to every list item
    IdList,
    /// Integer string to a number
    Integer,
    /// Numeric string to a float
    Float,
    /// One sort value or a list, always bound as a list
    SortList,
}

/// A declared operation variable together with the value it will be bound to
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: VarType,
    pub required: bool,
    pub value: JsonValue,
    pub transform: Transform,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: VarType, value: JsonValue) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            value,
            transform: Transform::None,
        }
    }

    /// Optional `String` variable
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            name,
            VarType::Scalar(ScalarType::String),
            JsonValue::String(value.into()),
        )
    }

    /// Optional `ID` variable; integer-looking values are bound as numbers
    pub fn id(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            name,
            VarType::Scalar(ScalarType::Id),
            JsonValue::String(value.into()),
        )
        .with_transform(Transform::Id)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Render the `$name: Type` definition
    pub fn declaration(&self) -> String {
        format!("${}: {}", self.name, self.ty.render(self.required))
    }
}

// ============================================================================
// Clauses
// ============================================================================

/// Comparison operators understood by the backend filter language
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operator {
    Eq,
    Eqi,
    Ne,
    Containsi,
    In,
    Gte,
    Lte,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Eqi => "eqi",
            Operator::Ne => "ne",
            Operator::Containsi => "containsi",
            Operator::In => "in",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
        }
    }
}

/// Right-hand side of a comparison
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Var(String),
    Null,
}

/// Filter clause tree
#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    /// `a: { b: { op: operand } }` for path `[a, b]`
    Compare {
        path: Vec<String>,
        op: Operator,
        operand: Operand,
    },
    /// Every clause applies at the same level
    All(Vec<Clause>),
    /// `or: [{ .. }, { .. }]`
    Any(Vec<Clause>),
    /// Clause applied below a relation path
    Nested { path: Vec<String>, clause: Box<Clause> },
}

impl Clause {
    /// Collect the variable names this clause references
    pub fn referenced(&self, out: &mut Vec<String>) {
        match self {
            Clause::Compare {
                operand: Operand::Var(name),
                ..
            } => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Clause::Compare { .. } => {}
            Clause::All(clauses) | Clause::Any(clauses) => {
                for clause in clauses {
                    clause.referenced(out);
                }
            }
            Clause::Nested { clause, .. } => clause.referenced(out),
        }
    }

    /// Convert to the input-object tree used for rendering
    fn into_entries(self, entries: &mut Vec<(String, Node)>) {
        match self {
            Clause::Compare { path, op, operand } => {
                let leaf = match operand {
                    Operand::Var(name) => Node::Var(name),
                    Operand::Null => Node::Null,
                };
                insert_at_path(entries, path, vec![(op.as_str().to_string(), leaf)]);
            }
            Clause::All(clauses) => {
                for clause in clauses {
                    clause.into_entries(entries);
                }
            }
            Clause::Any(branches) => {
                let list = branches
                    .into_iter()
                    .map(|branch| {
                        let mut inner = Vec::new();
                        branch.into_entries(&mut inner);
                        Node::Object(inner)
                    })
                    .collect();
                insert_entry(entries, "or".to_string(), Node::List(list));
            }
            Clause::Nested { path, clause } => {
                let mut inner = Vec::new();
                clause.into_entries(&mut inner);
                insert_at_path(entries, path, inner);
            }
        }
    }
}

/// Wrap `inner` in one object per path segment and insert the result.
/// An empty path merges `inner` into the current level.
fn insert_at_path(
    entries: &mut Vec<(String, Node)>,
    path: Vec<String>,
    inner: Vec<(String, Node)>,
) {
    let mut keys = path.into_iter().rev();
    let Some(mut key) = keys.next() else {
        for (k, v) in inner {
            insert_entry(entries, k, v);
        }
        return;
    };
    let mut node = Node::Object(inner);
    for parent in keys {
        node = Node::Object(vec![(key, node)]);
        key = parent;
    }
    insert_entry(entries, key, node);
}

/// Rendered input-object tree
#[derive(Clone, Debug, PartialEq)]
enum Node {
    Object(Vec<(String, Node)>),
    List(Vec<Node>),
    Var(String),
    Null,
}

/// Insert a key into an input object, merging objects addressed twice.
///
/// Input objects cannot repeat a key, so a collision between non-object
/// values (two `or` groups, two operators on one field) is moved under `and`.
fn insert_entry(entries: &mut Vec<(String, Node)>, key: String, node: Node) {
    let Some(index) = entries.iter().position(|(k, _)| *k == key) else {
        entries.push((key, node));
        return;
    };

    match node {
        Node::Object(incoming) if matches!(entries[index].1, Node::Object(_)) => {
            if let Node::Object(existing) = &mut entries[index].1 {
                for (k, v) in incoming {
                    insert_entry(existing, k, v);
                }
            }
        }
        Node::List(incoming) if key == "and" && matches!(entries[index].1, Node::List(_)) => {
            if let Node::List(existing) = &mut entries[index].1 {
                existing.extend(incoming);
            }
        }
        incoming => {
            let (key, existing) = entries.remove(index);
            let branches = vec![
                Node::Object(vec![(key.clone(), existing)]),
                Node::Object(vec![(key, incoming)]),
            ];
            insert_entry(entries, "and".to_string(), Node::List(branches));
        }
    }
}

impl Node {
    fn render(&self, out: &mut String) {
        match self {
            Node::Object(entries) => {
                out.push_str("{ ");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    value.render(out);
                }
                out.push_str(" }");
            }
            Node::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render(out);
                }
                out.push(']');
            }
            Node::Var(name) => {
                out.push('$');
                out.push_str(name);
            }
            Node::Null => out.push_str("null"),
        }
    }
}

/// Render clauses as the body of one input object, e.g. `{ a: { eq: $a } }`
pub fn render_object(clauses: Vec<Clause>) -> String {
    let mut entries = Vec::new();
    Clause::All(clauses).into_entries(&mut entries);
    let mut out = String::new();
    Node::Object(entries).render(&mut out);
    out
}

// ============================================================================
// Fragments
// ============================================================================

/// A filter clause together with the variables it references
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    clause: Clause,
    variables: Vec<Variable>,
}

fn owned_path(path: &[&str]) -> Vec<String> {
    path.iter().map(|segment| segment.to_string()).collect()
}

impl Fragment {
    fn compare(path: &[&str], op: Operator, variable: Variable) -> Self {
        Self {
            clause: Clause::Compare {
                path: owned_path(path),
                op,
                operand: Operand::Var(variable.name.clone()),
            },
            variables: vec![variable],
        }
    }

    /// `path: { containsi: $var }`
    pub fn contains(path: &[&str], variable: Variable) -> Self {
        Self::compare(path, Operator::Containsi, variable)
    }

    /// `path: { eq: $var }`
    pub fn equals(path: &[&str], variable: Variable) -> Self {
        Self::compare(path, Operator::Eq, variable)
    }

    /// `path: { eqi: $var }`
    pub fn equals_ignore_case(path: &[&str], variable: Variable) -> Self {
        Self::compare(path, Operator::Eqi, variable)
    }

    /// `path: { ne: $var }`
    pub fn not_equals(path: &[&str], variable: Variable) -> Self {
        Self::compare(path, Operator::Ne, variable)
    }

    /// `path: { in: $var }`
    pub fn one_of(path: &[&str], variable: Variable) -> Self {
        Self::compare(path, Operator::In, variable)
    }

    /// `path: { ne: null }`, no variable involved
    pub fn not_null(path: &[&str]) -> Self {
        Self {
            clause: Clause::Compare {
                path: owned_path(path),
                op: Operator::Ne,
                operand: Operand::Null,
            },
            variables: Vec::new(),
        }
    }

    /// `path: { gte: $lower, lte: $upper }` with each bound independent.
    ///
    /// Returns `None` when neither bound is present.
    pub fn range(path: &[&str], lower: Option<Variable>, upper: Option<Variable>) -> Option<Self> {
        let mut parts = Vec::new();
        if let Some(lower) = lower {
            parts.push(Self::compare(path, Operator::Gte, lower));
        }
        if let Some(upper) = upper {
            parts.push(Self::compare(path, Operator::Lte, upper));
        }
        Self::all(parts)
    }

    /// Every fragment applies. `None` when empty.
    pub fn all(fragments: Vec<Fragment>) -> Option<Self> {
        match fragments.len() {
            0 => None,
            1 => fragments.into_iter().next(),
            _ => {
                let (clauses, variables) = split(fragments);
                Some(Self {
                    clause: Clause::All(clauses),
                    variables,
                })
            }
        }
    }

    /// At least one fragment applies. A single fragment is returned as is,
    /// so no `or` wrapper is emitted for one condition. `None` when empty.
    pub fn any(fragments: Vec<Fragment>) -> Option<Self> {
        match fragments.len() {
            0 => None,
            1 => fragments.into_iter().next(),
            _ => {
                let (clauses, variables) = split(fragments);
                Some(Self {
                    clause: Clause::Any(clauses),
                    variables,
                })
            }
        }
    }

    /// Apply the fragment below a relation path
    pub fn nested(path: &[&str], fragment: Fragment) -> Self {
        Self {
            clause: Clause::Nested {
                path: owned_path(path),
                clause: Box::new(fragment.clause),
            },
            variables: fragment.variables,
        }
    }

    pub fn clause(&self) -> &Clause {
        &self.clause
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn into_parts(self) -> (Clause, Vec<Variable>) {
        (self.clause, self.variables)
    }
}

/// Split fragments into clauses and a de-duplicated variable list.
///
/// Branches sharing a variable (every keyword branch uses `$keywords`)
/// declare it once.
fn split(fragments: Vec<Fragment>) -> (Vec<Clause>, Vec<Variable>) {
    let mut clauses = Vec::with_capacity(fragments.len());
    let mut variables: Vec<Variable> = Vec::new();
    for fragment in fragments {
        clauses.push(fragment.clause);
        for variable in fragment.variables {
            match variables.iter().find(|v| v.name == variable.name) {
                Some(existing) => debug_assert_eq!(
                    existing.ty, variable.ty,
                    "variable ${} shared with different types",
                    variable.name
                ),
                None => variables.push(variable),
            }
        }
    }
    (clauses, variables)
}
