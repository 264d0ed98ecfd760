//! Cost schedule model – the hierarchical cost breakdown the renderer reads.
//!
//! The engine only reads schedules through the [`CostSource`] trait. The
//! in-memory [`CostSchedule`] implements it; a [`CostDocument`] holds every
//! schedule of one JSON project file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

// ---------------------------------------------------------------------------
// Best-effort resolution
// ---------------------------------------------------------------------------

/// Outcome of a lookup that is allowed to fail softly.
///
/// A `Degraded` value still carries the fallback that ends up in the
/// document, plus the reason so callers can log or count it.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    Value(T),
    Degraded { fallback: T, reason: String },
}

impl<T> Resolved<T> {
    pub fn degraded(fallback: T, reason: impl Into<String>) -> Self {
        Resolved::Degraded {
            fallback,
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Resolved::Degraded { .. })
    }

    /// The value to print, whether resolved or substituted.
    pub fn into_inner(self) -> T {
        match self {
            Resolved::Value(v) => v,
            Resolved::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Resolved::Value(_) => None,
            Resolved::Degraded { reason, .. } => Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Document type
// ---------------------------------------------------------------------------

/// The kinds of schedule that have a table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    PricedBoQ,
    UnpricedBoQ,
    RateSchedule,
}

impl DocumentType {
    /// Map an IFC `IfcCostScheduleTypeEnum` spelling onto a document type.
    pub fn from_predefined_type(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PRICEDBILLOFQUANTITIES" => Ok(DocumentType::PricedBoQ),
            "UNPRICEDBILLOFQUANTITIES" => Ok(DocumentType::UnpricedBoQ),
            "SCHEDULEOFRATES" => Ok(DocumentType::RateSchedule),
            other => Err(ExportError::UnsupportedDocumentType(other.to_string())),
        }
    }

    pub fn is_bill_of_quantities(self) -> bool {
        matches!(self, DocumentType::PricedBoQ | DocumentType::UnpricedBoQ)
    }
}

impl FromStr for DocumentType {
    type Err = ExportError;

    /// Accepts the short CLI names as well as the IFC spellings.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priced" | "pricedboq" => Ok(DocumentType::PricedBoQ),
            "unpriced" | "unpricedboq" => Ok(DocumentType::UnpricedBoQ),
            "rates" | "rateschedule" => Ok(DocumentType::RateSchedule),
            _ => Self::from_predefined_type(s),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentType::PricedBoQ => "Priced bill of quantities",
            DocumentType::UnpricedBoQ => "Unpriced bill of quantities",
            DocumentType::RateSchedule => "Schedule of rates",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Physical dimension of a quantity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityKind {
    Area,
    Volume,
    Length,
    Count,
    Weight,
    Time,
}

impl QuantityKind {
    pub fn default_unit(self) -> &'static str {
        match self {
            QuantityKind::Area => "m2",
            QuantityKind::Volume => "m3",
            QuantityKind::Length => "m",
            QuantityKind::Count => "nr",
            QuantityKind::Weight => "kg",
            QuantityKind::Time => "h",
        }
    }
}

/// One measured quantity attached to a cost item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    #[serde(default)]
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<QuantityKind>,
    /// Dimension formula such as `"2 * 3.5 * 0.3 * 1"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl Quantity {
    /// Split the formula into its four multiplicative factors (n°, a, b, c/w).
    ///
    /// Anything that is not exactly four numeric factors degrades to `None`.
    pub fn factors(&self) -> Resolved<Option<[String; 4]>> {
        let Some(formula) = self.formula.as_deref() else {
            return Resolved::Value(None);
        };
        let parts: Vec<&str> = formula.split(['*', 'x', 'X']).map(str::trim).collect();
        if parts.len() != 4 {
            return Resolved::degraded(
                None,
                format!("formula {formula:?} has {} factors, expected 4", parts.len()),
            );
        }
        if let Some(bad) = parts.iter().find(|p| p.parse::<f64>().is_err()) {
            return Resolved::degraded(None, format!("non-numeric factor {bad:?} in {formula:?}"));
        }
        Resolved::Value(Some([
            parts[0].to_string(),
            parts[1].to_string(),
            parts[2].to_string(),
            parts[3].to_string(),
        ]))
    }
}

/// A cost value applied to an item. The first value's `applied_value` is
/// the unit rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_value: Option<f64>,
}

/// One node of the cost hierarchy: a category (at the root) or an item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rate identification code, e.g. a price-list reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quantities: Vec<Quantity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cost_values: Vec<CostValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CostNode>,
}

impl CostNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Unit rate from the first cost value, if any.
    pub fn unit_rate(&self) -> Resolved<Option<f64>> {
        match self.cost_values.first() {
            None => Resolved::Value(None),
            Some(CostValue {
                applied_value: Some(v),
                ..
            }) => Resolved::Value(Some(*v)),
            Some(_) => Resolved::degraded(None, format!("cost value of {:?} has no amount", self.name)),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider contract
// ---------------------------------------------------------------------------

/// Descriptive fields printed in the page furniture and on the cover.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleMetadata {
    pub project_name: String,
    pub schedule_name: String,
    /// IFC spelling, e.g. `PRICEDBILLOFQUANTITIES`.
    pub predefined_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Read-only access to a cost hierarchy.
pub trait CostSource {
    fn metadata(&self) -> &ScheduleMetadata;

    fn root_nodes(&self) -> &[CostNode];

    fn children<'a>(&'a self, node: &'a CostNode) -> &'a [CostNode] {
        &node.children
    }

    /// Total quantity of a node across its quantity entries.
    fn total_quantity(&self, node: &CostNode) -> f64 {
        node.quantities.iter().map(|q| q.value).sum()
    }

    /// Display unit of one quantity entry.
    fn quantity_unit(&self, quantity: &Quantity) -> Resolved<String> {
        if let Some(unit) = quantity.unit.as_deref().filter(|u| !u.is_empty()) {
            return Resolved::Value(unit.to_string());
        }
        match quantity.kind {
            Some(kind) => Resolved::Value(kind.default_unit().to_string()),
            None => Resolved::degraded(
                String::new(),
                format!("quantity {:?} has neither unit nor kind", quantity.name),
            ),
        }
    }
}

/// An in-memory cost schedule, usually loaded from JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostSchedule {
    #[serde(flatten)]
    pub metadata: ScheduleMetadata,
    #[serde(default)]
    pub roots: Vec<CostNode>,
}

impl CostSchedule {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn document_type(&self) -> Result<DocumentType> {
        DocumentType::from_predefined_type(&self.metadata.predefined_type)
    }
}

impl CostSource for CostSchedule {
    fn metadata(&self) -> &ScheduleMetadata {
        &self.metadata
    }

    fn root_nodes(&self) -> &[CostNode] {
        &self.roots
    }
}

// ---------------------------------------------------------------------------
// Documents with several schedules
// ---------------------------------------------------------------------------

/// Which schedule of a [`CostDocument`] to export: a 1-based position or a
/// schedule name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleChoice {
    Index(usize),
    Name(String),
}

impl FromStr for ScheduleChoice {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ExportError::ScheduleNotFound("empty schedule name".into()));
        }
        Ok(match s.parse() {
            Ok(index) => ScheduleChoice::Index(index),
            Err(_) => ScheduleChoice::Name(s.to_string()),
        })
    }
}

impl fmt::Display for ScheduleChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleChoice::Index(index) => write!(f, "#{index}"),
            ScheduleChoice::Name(name) => write!(f, "{name:?}"),
        }
    }
}

/// Every cost schedule of one project file.
///
/// JSON is either `{ "schedules": [ … ] }` or a single schedule object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostDocument {
    pub schedules: Vec<CostSchedule>,
}

impl CostDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("schedules").is_some() {
            Ok(serde_json::from_value(value)?)
        } else {
            Ok(Self {
                schedules: vec![serde_json::from_value(value)?],
            })
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Schedule names in document order, for listing choices.
    pub fn schedule_names(&self) -> impl Iterator<Item = &str> {
        self.schedules.iter().map(|s| s.metadata.schedule_name.as_str())
    }

    /// The chosen schedule, or the first one when there is no choice.
    pub fn select(&self, choice: Option<&ScheduleChoice>) -> Result<&CostSchedule> {
        let found = match choice {
            None => self.schedules.first(),
            Some(ScheduleChoice::Index(index)) => index.checked_sub(1).and_then(|i| self.schedules.get(i)),
            Some(ScheduleChoice::Name(name)) => self.schedules.iter().find(|s| s.metadata.schedule_name == *name),
        };
        match found {
            Some(schedule) => {
                if choice.is_none() && self.schedules.len() > 1 {
                    log::info!(
                        "{} schedules in document; exporting the first, {:?}",
                        self.schedules.len(),
                        schedule.metadata.schedule_name
                    );
                }
                Ok(schedule)
            }
            None => Err(ExportError::ScheduleNotFound(match choice {
                Some(choice) => format!(
                    "{choice} (document has {} schedule(s): {})",
                    self.schedules.len(),
                    self.schedule_names().collect::<Vec<_>>().join(", ")
                ),
                None => "document has no cost schedules".to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantity(formula: Option<&str>) -> Quantity {
        Quantity {
            name: "slab".into(),
            value: 4.2,
            unit: None,
            kind: Some(QuantityKind::Volume),
            formula: formula.map(str::to_string),
        }
    }

    #[test]
    fn predefined_types() {
        assert_eq!(
            DocumentType::from_predefined_type("PRICEDBILLOFQUANTITIES").unwrap(),
            DocumentType::PricedBoQ
        );
        assert_eq!(
            DocumentType::from_predefined_type("scheduleofrates").unwrap(),
            DocumentType::RateSchedule
        );
        assert!(matches!(
            DocumentType::from_predefined_type("TENDER"),
            Err(ExportError::UnsupportedDocumentType(t)) if t == "TENDER"
        ));
        assert_eq!("unpriced".parse::<DocumentType>().unwrap(), DocumentType::UnpricedBoQ);
    }

    #[test]
    fn four_factor_formula() {
        let q = quantity(Some("2 * 3.5 * 0.30 * 1"));
        assert_eq!(
            q.factors(),
            Resolved::Value(Some(["2".into(), "3.5".into(), "0.30".into(), "1".into()]))
        );
    }

    #[test]
    fn malformed_formula_degrades() {
        assert!(quantity(Some("2 * 3.5")).factors().is_degraded());
        assert!(quantity(Some("2 * a * 1 * 1")).factors().is_degraded());
        assert_eq!(quantity(Some("2*3")).factors().into_inner(), None);
        assert_eq!(quantity(None).factors(), Resolved::Value(None));
    }

    #[test]
    fn unit_resolution() {
        let schedule = CostSchedule::default();
        let mut q = quantity(None);
        assert_eq!(schedule.quantity_unit(&q), Resolved::Value("m3".to_string()));
        q.unit = Some("m3 (cls)".into());
        assert_eq!(schedule.quantity_unit(&q).into_inner(), "m3 (cls)");
        q.unit = None;
        q.kind = None;
        let unit = schedule.quantity_unit(&q);
        assert!(unit.is_degraded());
        assert_eq!(unit.into_inner(), "");
    }

    #[test]
    fn schedule_json() {
        let json = r#"{
            "project_name": "School",
            "schedule_name": "BoQ",
            "predefined_type": "PRICEDBILLOFQUANTITIES",
            "roots": [{ "name": "Structures", "children": [
                { "name": "Concrete", "quantities": [{ "name": "slab", "value": 5.0, "kind": "volume" }],
                  "cost_values": [{ "applied_value": 120.0 }] }
            ]}]
        }"#;
        let schedule = CostSchedule::from_json(json).unwrap();
        assert_eq!(schedule.metadata.project_name, "School");
        assert_eq!(schedule.document_type().unwrap(), DocumentType::PricedBoQ);
        let item = &schedule.roots[0].children[0];
        assert_eq!(schedule.total_quantity(item), 5.0);
        assert_eq!(item.unit_rate(), Resolved::Value(Some(120.0)));
    }

    #[test]
    fn cost_value_without_amount_degrades() {
        let mut node = CostNode::new("Plaster");
        assert_eq!(node.unit_rate(), Resolved::Value(None));
        node.cost_values.push(CostValue {
            name: Some("rate".into()),
            applied_value: None,
        });
        assert!(node.unit_rate().is_degraded());
    }

    fn two_schedule_document() -> CostDocument {
        CostDocument::from_json(
            r#"{ "schedules": [
                { "schedule_name": "Estimate", "predefined_type": "PRICEDBILLOFQUANTITIES",
                  "roots": [{ "name": "Site" }] },
                { "schedule_name": "Rates", "predefined_type": "SCHEDULEOFRATES",
                  "roots": [{ "name": "Labour" }] }
            ] }"#,
        )
        .unwrap()
    }

    #[test]
    fn select_schedule_by_position_or_name() {
        let doc = two_schedule_document();
        assert_eq!(doc.schedule_names().collect::<Vec<_>>(), ["Estimate", "Rates"]);

        let second = doc.select(Some(&ScheduleChoice::Index(2))).unwrap();
        assert_eq!(second.document_type().unwrap(), DocumentType::RateSchedule);
        assert_eq!(second.roots[0].name, "Labour");

        let by_name = doc.select(Some(&"Rates".parse().unwrap())).unwrap();
        assert_eq!(by_name, second);
        assert_eq!(doc.select(None).unwrap().metadata.schedule_name, "Estimate");
    }

    #[test]
    fn missing_schedule_is_an_error() {
        let doc = two_schedule_document();
        for choice in [ScheduleChoice::Index(0), ScheduleChoice::Index(3), ScheduleChoice::Name("Tender".into())] {
            let err = doc.select(Some(&choice)).unwrap_err();
            assert!(matches!(err, ExportError::ScheduleNotFound(ref m) if m.contains("Estimate, Rates")));
        }
        assert!(CostDocument::default().select(None).is_err());
    }

    #[test]
    fn single_schedule_json_is_a_one_schedule_document() {
        let doc = CostDocument::from_json(r#"{ "schedule_name": "Only", "roots": [] }"#).unwrap();
        assert_eq!(doc.schedules.len(), 1);
        assert_eq!(doc.select(Some(&ScheduleChoice::Index(1))).unwrap().metadata.schedule_name, "Only");
    }

    #[test]
    fn schedule_choice_parsing() {
        assert_eq!("2".parse::<ScheduleChoice>().unwrap(), ScheduleChoice::Index(2));
        assert_eq!(" Rates ".parse::<ScheduleChoice>().unwrap(), ScheduleChoice::Name("Rates".into()));
        assert!("".parse::<ScheduleChoice>().is_err());
        let json: ScheduleChoice = serde_json::from_str("\"Rates\"").unwrap();
        assert_eq!(json, ScheduleChoice::Name("Rates".into()));
    }
}
