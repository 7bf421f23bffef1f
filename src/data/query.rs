//! Table query expressions of the form `{column} op value && ...`

use serde::Serialize;

use crate::data::filter::Attribute;
use crate::data::{NodeTable, Product};
use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Ge,
    Le,
    Lt,
    Gt,
    Ne,
    Eq,
    Contains,
    DateStartsWith,
}

/// Operator spellings in match priority order
const OPERATORS: [(Operator, &[&str]); 8] = [
    (Operator::Ge, &["ge ", ">="]),
    (Operator::Le, &["le ", "<="]),
    (Operator::Lt, &["lt ", "<"]),
    (Operator::Gt, &["gt ", ">"]),
    (Operator::Ne, &["ne ", "!="]),
    (Operator::Eq, &["eq ", "="]),
    (Operator::Contains, &["contains "]),
    (Operator::DateStartsWith, &["datestartswith "]),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clause {
    pub column: String,
    pub operator: Operator,
    pub operand: Operand,
}

impl Clause {
    /// Parse one `{column} op value` clause; `None` when no operator matches
    pub fn parse(part: &str) -> Option<Clause> {
        for (operator, spellings) in OPERATORS {
            for spelling in spellings {
                let Some((name_part, value_part)) = part.split_once(spelling) else {
                    continue;
                };
                let column = match (name_part.find('{'), name_part.rfind('}')) {
                    (Some(open), Some(close)) if open < close => &name_part[open + 1..close],
                    _ => name_part.trim(),
                };
                return Some(Clause {
                    column: column.to_string(),
                    operator,
                    operand: parse_operand(value_part.trim()),
                });
            }
        }
        None
    }

    fn matches(&self, product: &Product) -> bool {
        if self.column == "genre" {
            return compare_text(&product.genre, self.operator, &self.operand);
        }
        let value = match self.column.as_str() {
            "id" => product.id as f64,
            other => match Attribute::from_name(other).and_then(|a| a.numeric_value(product)) {
                Some(v) => v,
                None => return false,
            },
        };
        match (&self.operand, self.operator) {
            (Operand::Number(n), Operator::Ge) => value >= *n,
            (Operand::Number(n), Operator::Le) => value <= *n,
            (Operand::Number(n), Operator::Lt) => value < *n,
            (Operand::Number(n), Operator::Gt) => value > *n,
            (Operand::Number(n), Operator::Ne) => value != *n,
            (Operand::Number(n), Operator::Eq) => value == *n,
            (operand, operator) => compare_text(&value.to_string(), operator, operand),
        }
    }
}

fn parse_operand(text: &str) -> Operand {
    let mut chars = text.chars();
    if let (Some(first), Some(last)) = (chars.next(), text.chars().last()) {
        if text.len() >= 2 && first == last && matches!(first, '\'' | '"' | '`') {
            let inner = &text[1..text.len() - 1];
            return Operand::Text(inner.replace(&format!("\\{}", first), &first.to_string()));
        }
    }
    match text.parse::<f64>() {
        Ok(n) => Operand::Number(n),
        Err(_) => Operand::Text(text.to_string()),
    }
}

fn compare_text(value: &str, operator: Operator, operand: &Operand) -> bool {
    let operand = match operand {
        Operand::Text(s) => s.clone(),
        Operand::Number(n) => n.to_string(),
    };
    match operator {
        Operator::Eq => value == operand,
        Operator::Ne => value != operand,
        Operator::Ge => value >= operand.as_str(),
        Operator::Le => value <= operand.as_str(),
        Operator::Lt => value < operand.as_str(),
        Operator::Gt => value > operand.as_str(),
        Operator::Contains => value.contains(&operand),
        Operator::DateStartsWith => value.starts_with(&operand),
    }
}

/// A conjunction of clauses over the node table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableQuery {
    pub clauses: Vec<Clause>,
}

impl TableQuery {
    /// Parse `&&`-joined clauses. Clauses without a known operator are skipped;
    /// clauses naming an unknown column are rejected.
    pub fn parse(expression: &str) -> Result<Self> {
        let mut clauses = Vec::new();
        for part in expression.split(" && ") {
            let Some(clause) = Clause::parse(part) else {
                continue;
            };
            if clause.column != "id" && Attribute::from_name(&clause.column).is_none() {
                return Err(AnalysisError::InvalidFilter {
                    attribute: clause.column,
                    reason: "unknown column in table query".to_string(),
                });
            }
            clauses.push(clause);
        }
        Ok(Self { clauses })
    }

    pub fn apply(&self, table: &NodeTable) -> NodeTable {
        NodeTable::new(
            table
                .rows
                .iter()
                .filter(|p| self.clauses.iter().all(|c| c.matches(p)))
                .cloned()
                .collect(),
        )
    }
}
