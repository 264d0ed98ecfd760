//! Sample cost schedules for testing and demonstration.
//!
//! Each sample exercises a different document type.

use crate::schedule::{CostDocument, CostNode, CostSchedule, CostValue, Quantity, QuantityKind, ScheduleMetadata};

/// Priced bill of quantities: two categories, formulas, mixed units.
///
/// Category totals are 870.00 and 2490.00; grand total 3360.00.
pub fn priced_boq_json() -> &'static str {
    r##"{
    "project_name": "Riverside Depot",
    "schedule_name": "Tender Estimate",
    "predefined_type": "PRICEDBILLOFQUANTITIES",
    "description": "Bill of quantities for the new maintenance depot, phase one.",
    "client": "Riverside Council",
    "location": "Quay Road",
    "roots": [
        {
            "name": "Substructure",
            "children": [
                {
                    "name": "Excavation to reduced levels",
                    "description": "Excavate trenches for strip foundations, remove spoil off site.",
                    "quantities": [
                        { "name": "strip trench", "value": 24.0, "kind": "volume", "formula": "2 * 10 * 1.2 * 1" }
                    ],
                    "cost_values": [ { "applied_value": 12.5 } ]
                },
                {
                    "name": "Concrete foundations",
                    "identification": "C25/30",
                    "quantities": [
                        { "name": "strip footing", "value": 6.0, "unit": "m3", "formula": "2 x 10 x 0.6 x 0.5" }
                    ],
                    "cost_values": [ { "name": "supply and place", "applied_value": 95.0 } ]
                }
            ]
        },
        {
            "name": "Finishes",
            "children": [
                {
                    "name": "Porcelain floor tiles",
                    "description": "600 x 600 mm porcelain tiles on adhesive bed, grouted.",
                    "quantities": [
                        { "name": "ground floor", "value": 40.0, "kind": "area" },
                        { "name": "first floor", "value": 35.0, "kind": "area" }
                    ],
                    "cost_values": [ { "applied_value": 30.0 } ]
                },
                {
                    "name": "Timber skirting",
                    "quantities": [
                        { "name": "all rooms", "value": 30.0, "kind": "length", "formula": "1 * 30 * 1 * 1" }
                    ],
                    "cost_values": [ { "applied_value": 8.0 } ]
                }
            ]
        }
    ]
}"##
}

/// Schedule of rates: rates only, no quantities.
pub fn rate_schedule_json() -> &'static str {
    r##"{
    "project_name": "Riverside Depot",
    "schedule_name": "Rates 2026",
    "predefined_type": "SCHEDULEOFRATES",
    "roots": [
        {
            "name": "Groundworks",
            "children": [
                {
                    "name": "Excavate by machine",
                    "identification": "GW-01",
                    "cost_values": [ { "applied_value": 12.5 } ]
                },
                {
                    "name": "Hardcore fill, compacted",
                    "identification": "GW-02",
                    "cost_values": [ { "applied_value": 28.75 } ]
                }
            ]
        },
        {
            "name": "Labour",
            "children": [
                {
                    "name": "General operative",
                    "description": "Day rate including travel.",
                    "cost_values": [ { "applied_value": 32.0 } ]
                }
            ]
        }
    ]
}"##
}

/// Project file holding both samples: the bill first, the rates second.
pub fn project_json() -> String {
    format!(
        "{{ \"schedules\": [{}, {}] }}",
        priced_boq_json(),
        rate_schedule_json()
    )
}

pub fn project() -> CostDocument {
    CostDocument::from_json(&project_json()).unwrap_or_default()
}

pub fn priced_boq() -> CostSchedule {
    CostSchedule::from_json(priced_boq_json()).unwrap_or_default()
}

pub fn rate_schedule() -> CostSchedule {
    CostSchedule::from_json(rate_schedule_json()).unwrap_or_default()
}

/// A priced bill long enough to span several pages: `categories` roots with
/// `items` items each, every item priced at 10.00 over 2 m² with a long
/// description.
pub fn large_boq(categories: usize, items: usize) -> CostSchedule {
    let roots = (1..=categories)
        .map(|c| CostNode {
            children: (1..=items)
                .map(|i| CostNode {
                    description: Some(format!(
                        "Item {i} of category {c}: supply, fix and finish in accordance with the \
                         specification, including all fixings, making good and clearing away."
                    )),
                    quantities: vec![Quantity {
                        name: "area".into(),
                        value: 2.0,
                        unit: None,
                        kind: Some(QuantityKind::Area),
                        formula: Some("1 * 2 * 1 * 1".into()),
                    }],
                    cost_values: vec![CostValue {
                        name: None,
                        applied_value: Some(10.0),
                    }],
                    ..CostNode::new(format!("Work item {c}.{i}"))
                })
                .collect(),
            ..CostNode::new(format!("Category {c}"))
        })
        .collect();

    CostSchedule {
        metadata: ScheduleMetadata {
            project_name: "Large Project".into(),
            schedule_name: "Full Bill".into(),
            predefined_type: "PRICEDBILLOFQUANTITIES".into(),
            ..ScheduleMetadata::default()
        },
        roots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{CostSource, DocumentType};

    #[test]
    fn samples_parse() {
        let priced = CostSchedule::from_json(priced_boq_json()).unwrap();
        assert_eq!(priced.document_type().unwrap(), DocumentType::PricedBoQ);
        assert_eq!(priced.root_nodes().len(), 2);

        let rates = CostSchedule::from_json(rate_schedule_json()).unwrap();
        assert_eq!(rates.document_type().unwrap(), DocumentType::RateSchedule);
        assert_eq!(rates.roots[1].children[0].unit_rate().into_inner(), Some(32.0));
    }

    #[test]
    fn project_holds_both_samples() {
        let doc = CostDocument::from_json(&project_json()).unwrap();
        assert_eq!(doc.schedule_names().collect::<Vec<_>>(), ["Tender Estimate", "Rates 2026"]);
        assert_eq!(doc.schedules[1], rate_schedule());
    }

    #[test]
    fn large_boq_shape() {
        let s = large_boq(3, 4);
        assert_eq!(s.roots.len(), 3);
        assert!(s.roots.iter().all(|r| r.children.len() == 4));
        assert_eq!(s.total_quantity(&s.roots[0].children[0]), 2.0);
    }
}
