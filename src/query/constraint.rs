use std::collections::{BTreeMap, BTreeSet};
use crate::mapping::FieldMapper;
use crate::query::encoders;
use crate::query::field_query::{Constraint, ValueMode};
use crate::schema::index_field::IndexField;
use crate::schema::index_value::IndexValue;

/// The parts an index constraint is made of. Field level types are set
/// from an [`IndexField`], the others carry the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintType {
    Lang,
    DataType,
    Field,
    Eq,
    Wildcard,
    Regex,
    Ge,
    Le,
    Gt,
    Lt,
}

impl ConstraintType {
    /// Types that must be encoded together with this one. Missing
    /// dependents are encoded with an open value.
    pub fn dependencies(&self) -> &'static [ConstraintType] {
        match self {
            ConstraintType::Ge => &[ConstraintType::Le],
            ConstraintType::Le => &[ConstraintType::Ge],
            ConstraintType::Gt => &[ConstraintType::Lt],
            ConstraintType::Lt => &[ConstraintType::Gt],
            _ => &[],
        }
    }

    pub fn is_field_level(&self) -> bool {
        matches!(self, ConstraintType::Lang | ConstraintType::DataType | ConstraintType::Field)
    }
}

/// Where an encoded fragment goes within `prefix field suffix : value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PositionType {
    Prefix,
    Field,
    Suffix,
    Assignment,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConstraintPosition {
    pub kind: PositionType,
    pub pos: u8,
}

impl ConstraintPosition {
    pub fn new(kind: PositionType) -> Self {
        ConstraintPosition { kind, pos: 0 }
    }

    pub fn at(kind: PositionType, pos: u8) -> Self {
        ConstraintPosition { kind, pos }
    }
}

/// Encoded fragments per position. Each position holds alternatives that
/// are ORed; each alternative is a list of parts that are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedConstraintParts {
    parts: BTreeMap<ConstraintPosition, Vec<Vec<String>>>,
}

impl EncodedConstraintParts {
    pub fn new() -> Self {
        EncodedConstraintParts::default()
    }

    /// Adds an alternative; duplicates are ignored
    pub fn add_encoded(&mut self, position: ConstraintPosition, and_parts: Vec<String>) {
        if and_parts.is_empty() {
            return;
        }
        let alternatives = self.parts.entry(position).or_default();
        if !alternatives.contains(&and_parts) {
            alternatives.push(and_parts);
        }
    }

    pub fn add(&mut self, position: ConstraintPosition, part: impl Into<String>) {
        self.add_encoded(position, vec![part.into()]);
    }

    pub fn get(&self, position: &ConstraintPosition) -> Option<&Vec<Vec<String>>> {
        self.parts.get(position)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Expands all positions into `(alt1) OR (alt2)` with every alternative
    /// rendered as `(part1) AND (part2)`. Each operand is grouped, the
    /// expression as a whole is not; callers combining it with other
    /// constraints wrap it.
    ///
    /// Candidates are grown position by position. Each candidate is cloned
    /// once per extra alternative; the last alternative reuses it.
    pub fn render(&self) -> String {
        let mut candidates: Vec<Vec<String>> = vec![vec![String::new()]];
        for alternatives in self.parts.values() {
            let Some((last, rest)) = alternatives.split_last() else {
                continue;
            };
            let mut next = Vec::with_capacity(candidates.len() * alternatives.len());
            for candidate in candidates {
                for alternative in rest {
                    next.push(append_and_parts(candidate.clone(), alternative));
                }
                next.push(append_and_parts(candidate, last));
            }
            candidates = next;
        }

        let mut rendered: Vec<String> = candidates
            .into_iter()
            .map(|parts| match parts.len() {
                1 => parts.into_iter().next().unwrap_or_default(),
                _ => format!("({})", parts.join(") AND (")),
            })
            .collect();
        match rendered.len() {
            1 => rendered.pop().unwrap_or_default(),
            _ => format!("({})", rendered.join(") OR (")),
        }
    }
}

fn append_and_parts(mut parts: Vec<String>, suffixes: &[String]) -> Vec<String> {
    match suffixes {
        [] => parts,
        [single] => {
            for part in parts.iter_mut() {
                part.push_str(single);
            }
            parts
        }
        _ => {
            let mut expanded = Vec::with_capacity(parts.len() * suffixes.len());
            for part in &parts {
                for suffix in suffixes {
                    expanded.push(format!("{}{}", part, suffix));
                }
            }
            expanded
        }
    }
}

/// Values of a value-level constraint type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintValue {
    pub values: Vec<IndexValue>,   // empty means open (range bounds)
    pub mode: ValueMode,
    pub boost: Option<f64>,
    pub phrase_query: bool,
}

impl ConstraintValue {
    pub fn new(mode: ValueMode, boost: Option<f64>) -> Self {
        ConstraintValue {
            values: Vec::new(),
            mode,
            // a boost of 1 is the neutral element and not encoded
            boost: boost.filter(|b| *b != 1.0),
            phrase_query: false,
        }
    }
}

/// Working state of one field constraint while compiling a query.
///
/// Problems do not fail compilation: they mark the constraint invalid and
/// the compiler leaves it out of the executed query.
#[derive(Debug, Clone)]
pub struct IndexConstraint {
    field: String,
    constraint: Constraint,
    executed: Option<Constraint>,
    index_field: Option<IndexField>,
    field_types: BTreeSet<ConstraintType>,
    values: BTreeMap<ConstraintType, ConstraintValue>,
    invalid: Vec<String>,
}

impl IndexConstraint {
    pub fn new(field: impl Into<String>, constraint: Constraint) -> Self {
        IndexConstraint {
            field: field.into(),
            constraint,
            executed: None,
            index_field: None,
            field_types: BTreeSet::new(),
            values: BTreeMap::new(),
            invalid: Vec::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn path(&self) -> Vec<String> {
        vec![self.field.clone()]
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// FIELD always; DATATYPE and LANG unless the field is a special one
    pub fn set_index_field_constraints(&mut self, index_field: IndexField) {
        self.field_types.insert(ConstraintType::Field);
        if !index_field.is_special_field() {
            self.field_types.insert(ConstraintType::DataType);
            self.field_types.insert(ConstraintType::Lang);
        }
        self.index_field = Some(index_field);
    }

    pub fn index_field(&self) -> Option<&IndexField> {
        self.index_field.as_ref()
    }

    pub fn set_field_constraint(&mut self, constraint_type: ConstraintType, value: ConstraintValue) {
        self.values.insert(constraint_type, value);
    }

    pub fn field_constraint(&self, constraint_type: ConstraintType) -> Option<&ConstraintValue> {
        self.values.get(&constraint_type)
    }

    pub fn set_invalid(&mut self, message: impl Into<String>) {
        self.invalid.push(message.into());
    }

    pub fn is_invalid(&self) -> bool {
        !self.invalid.is_empty()
    }

    pub fn invalid_messages(&self) -> &[String] {
        &self.invalid
    }

    /// Records the constraint as it will be executed
    pub fn set_executed_constraint(&mut self, constraint: Constraint) {
        self.executed = Some(constraint);
    }

    /// The executed form, the requested constraint if nothing was rewritten
    pub fn into_executed_constraint(self) -> (String, Constraint) {
        (self.field, self.executed.unwrap_or(self.constraint))
    }

    /// Renders the constraint in the store's query syntax
    pub fn encode(&self, mapper: &FieldMapper) -> String {
        let mut parts = EncodedConstraintParts::new();
        if let Some(index_field) = &self.index_field {
            for constraint_type in &self.field_types {
                encoders::encode_field_level(*constraint_type, index_field, mapper, &mut parts);
            }
        }
        let mut types: BTreeSet<ConstraintType> = self.values.keys().copied().collect();
        for constraint_type in self.values.keys() {
            types.extend(constraint_type.dependencies().iter().copied());
        }
        let open = ConstraintValue::default();
        for constraint_type in types {
            let value = self.values.get(&constraint_type).unwrap_or(&open);
            encoders::encode_value_level(constraint_type, value, &mut parts);
        }
        parts.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pos(kind: PositionType) -> ConstraintPosition {
        ConstraintPosition::new(kind)
    }

    #[test]
    fn single_alternative_renders_plain() {
        let mut parts = EncodedConstraintParts::new();
        parts.add(pos(PositionType::Value), "x");
        parts.add(pos(PositionType::Field), "f");
        parts.add(pos(PositionType::Assignment), ":");
        assert_eq!(parts.render(), "f:x");
    }

    #[test]
    fn alternatives_expand_to_cross_product() {
        let mut parts = EncodedConstraintParts::new();
        parts.add(pos(PositionType::Prefix), "@en");
        parts.add(pos(PositionType::Prefix), "@de");
        parts.add(pos(PositionType::Field), "/l/");
        parts.add(pos(PositionType::Assignment), ":");
        parts.add_encoded(pos(PositionType::Value), vec!["a".into(), "b".into()]);
        parts.add(pos(PositionType::Value), "c");
        assert_eq!(
            parts.render(),
            "((@en/l/:a) AND (@en/l/:b)) OR (@en/l/:c) OR ((@de/l/:a) AND (@de/l/:b)) OR (@de/l/:c)"
        );
    }

    #[test]
    fn duplicate_alternatives_are_ignored() {
        let mut parts = EncodedConstraintParts::new();
        parts.add(pos(PositionType::Value), "x");
        parts.add(pos(PositionType::Value), "x");
        assert_eq!(parts.get(&pos(PositionType::Value)).map(Vec::len), Some(1));
    }

    #[test]
    fn range_types_depend_on_each_other() {
        assert_eq!(ConstraintType::Ge.dependencies(), &[ConstraintType::Le]);
        assert_eq!(ConstraintType::Lt.dependencies(), &[ConstraintType::Gt]);
        assert!(ConstraintType::Eq.dependencies().is_empty());
    }
}
