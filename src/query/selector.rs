//! Selector AST and parser
//!
//! Accepted query shape:
//!
//! ```text
//! {"selector": {field: value | {"$op": operand, ...}, ...},
//!  "sort": [{field: "asc" | "desc"} | field, ...],
//!  "limit": n}
//! ```
//!
//! Nested plain objects in the selector are flattened into dotted paths.
//! `{"$and": [selector, ...]}` conjoins its sub-selectors at the current path.
//! `use_index` is accepted and ignored; every query is a full scan.

use serde_json::{Map, Value};

use super::errors::{QueryError, QueryResult};

/// Filter operation types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Equality: field = value
    Eq(Value),
    /// Inequality: field != value
    Ne(Value),
    /// Greater than: field > value
    Gt(Value),
    /// Greater than or equal: field >= value
    Gte(Value),
    /// Less than: field < value
    Lt(Value),
    /// Less than or equal: field <= value
    Lte(Value),
    /// Membership: field equals one of the values
    In(Vec<Value>),
    /// Presence (true) or absence (false) of the field
    Exists(bool),
}

impl FilterOp {
    fn parse(op: &str, operand: &Value) -> QueryResult<Self> {
        Ok(match op {
            "$eq" => FilterOp::Eq(operand.clone()),
            "$ne" => FilterOp::Ne(operand.clone()),
            "$gt" => FilterOp::Gt(operand.clone()),
            "$gte" => FilterOp::Gte(operand.clone()),
            "$lt" => FilterOp::Lt(operand.clone()),
            "$lte" => FilterOp::Lte(operand.clone()),
            "$in" => match operand {
                Value::Array(values) => FilterOp::In(values.clone()),
                _ => return Err(QueryError::InvalidQuery("$in expects an array".to_string())),
            },
            "$exists" => match operand {
                Value::Bool(flag) => FilterOp::Exists(*flag),
                _ => return Err(QueryError::InvalidQuery("$exists expects a boolean".to_string())),
            },
            other => return Err(QueryError::UnsupportedOperator(other.to_string())),
        })
    }
}

/// A single predicate (dotted field path + operation)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: FilterOp,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq(value.into()))
    }

    /// Field path split on dots
    pub fn path(&self) -> impl Iterator<Item = &str> {
        self.field.split('.')
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Parsed selector query. Predicates combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pub predicates: Vec<Predicate>,
    pub sort: Vec<SortSpec>,
    pub limit: Option<usize>,
}

impl Selector {
    /// Selector that matches every JSON value
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filter_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_predicate(Predicate::eq(field, value))
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parses a JSON query string.
    pub fn parse(query: &str) -> QueryResult<Self> {
        let value: Value = serde_json::from_str(query)
            .map_err(|e| QueryError::InvalidQuery(format!("not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    /// Parses an already decoded query document.
    pub fn from_value(query: &Value) -> QueryResult<Self> {
        let root = query
            .as_object()
            .ok_or_else(|| QueryError::InvalidQuery("query must be a JSON object".to_string()))?;

        let mut selector = Selector::default();
        for (key, value) in root {
            match key.as_str() {
                "selector" => {
                    let fields = value.as_object().ok_or_else(|| {
                        QueryError::InvalidQuery("selector must be a JSON object".to_string())
                    })?;
                    parse_fields("", fields, &mut selector.predicates)?;
                }
                "sort" => selector.sort = parse_sort(value)?,
                "limit" => {
                    let limit = value.as_u64().ok_or_else(|| {
                        QueryError::InvalidQuery("limit must be a non-negative integer".to_string())
                    })?;
                    selector.limit = Some(limit as usize);
                }
                "use_index" => {}
                other => {
                    return Err(QueryError::InvalidQuery(format!("unknown query field: {}", other)))
                }
            }
        }

        if !root.contains_key("selector") {
            return Err(QueryError::InvalidQuery("missing selector".to_string()));
        }

        Ok(selector)
    }
}

fn join_path(prefix: &str, field: &str) -> QueryResult<String> {
    if field.is_empty() || field.split('.').any(str::is_empty) {
        return Err(QueryError::InvalidQuery(format!("invalid field path: {:?}", field)));
    }
    Ok(if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    })
}

fn parse_fields(prefix: &str, fields: &Map<String, Value>, out: &mut Vec<Predicate>) -> QueryResult<()> {
    for (field, condition) in fields {
        if field == "$and" {
            parse_conjunction(prefix, condition, out)?;
            continue;
        }
        if field.starts_with('$') {
            return Err(QueryError::UnsupportedOperator(field.clone()));
        }
        let path = join_path(prefix, field)?;

        match condition {
            Value::Object(inner) if inner.keys().any(|k| k.starts_with('$')) => {
                if !inner.keys().all(|k| k.starts_with('$')) {
                    return Err(QueryError::InvalidQuery(format!(
                        "field {} mixes operators and nested fields",
                        path
                    )));
                }
                parse_operators(&path, inner, out)?;
            }
            Value::Object(inner) if !inner.is_empty() => parse_fields(&path, inner, out)?,
            other => out.push(Predicate::new(path, FilterOp::Eq(other.clone()))),
        }
    }
    Ok(())
}

fn parse_operators(path: &str, operators: &Map<String, Value>, out: &mut Vec<Predicate>) -> QueryResult<()> {
    for (op, operand) in operators {
        if op == "$and" {
            parse_conjunction(path, operand, out)?;
        } else {
            out.push(Predicate::new(path, FilterOp::parse(op, operand)?));
        }
    }
    Ok(())
}

/// Clauses under a field path may be operator objects (`{"$gte": 1}`) or
/// nested field selectors.
fn parse_conjunction(prefix: &str, condition: &Value, out: &mut Vec<Predicate>) -> QueryResult<()> {
    let clauses = match condition {
        Value::Array(clauses) if !clauses.is_empty() => clauses,
        _ => return Err(QueryError::InvalidQuery("$and expects a non-empty array".to_string())),
    };
    for clause in clauses {
        let fields = clause
            .as_object()
            .ok_or_else(|| QueryError::InvalidQuery("$and clauses must be JSON objects".to_string()))?;
        let operators_only = !fields.is_empty() && fields.keys().all(|k| k.starts_with('$'));
        if !prefix.is_empty() && operators_only {
            parse_operators(prefix, fields, out)?;
        } else {
            parse_fields(prefix, fields, out)?;
        }
    }
    Ok(())
}

fn parse_sort(value: &Value) -> QueryResult<Vec<SortSpec>> {
    let entries = value
        .as_array()
        .ok_or_else(|| QueryError::InvalidQuery("sort must be an array".to_string()))?;

    let mut specs = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::String(field) => specs.push(SortSpec::asc(join_path("", field)?)),
            Value::Object(map) if map.len() == 1 => {
                for (field, direction) in map {
                    let field = join_path("", field)?;
                    specs.push(match direction.as_str() {
                        Some("asc") => SortSpec::asc(field),
                        Some("desc") => SortSpec::desc(field),
                        _ => {
                            return Err(QueryError::InvalidQuery(format!(
                                "sort direction for {} must be \"asc\" or \"desc\"",
                                field
                            )))
                        }
                    });
                }
            }
            _ => {
                return Err(QueryError::InvalidQuery(
                    "sort entries must be a field name or {field: direction}".to_string(),
                ))
            }
        }
    }
    Ok(specs)
}
