//! By-entity and by-field views of a finished aggregate.

use crate::models::{
    ConfigTypeAggregate, EntityFieldUsage, EntitySummary, EntityValues, FieldSummary, FieldUsage,
};

/// Build the by-entity view.
///
/// Only (field, entity) pairs with at least one value produce a row. Rows
/// come out ordered by field path because the aggregate is path-ordered.
pub fn build_entity_summary(aggregate: &ConfigTypeAggregate) -> EntitySummary {
    let mut summary = EntitySummary::new();

    for (path, field) in &aggregate.fields {
        for (entity, values) in &field.per_entity {
            if values.is_empty() {
                continue;
            }
            summary
                .entry(entity.clone())
                .or_default()
                .push(EntityFieldUsage {
                    path: path.clone(),
                    kind: field.kind,
                    values: values.iter().cloned().collect(),
                });
        }
    }

    for rows in summary.values_mut() {
        rows.sort_by(|a, b| a.path.cmp(&b.path));
    }

    summary
}

/// Build the by-field view.
///
/// Every entity registered on a field gets a row, including entities whose
/// only observations were nulls inside arrays.
pub fn build_field_summary(aggregate: &ConfigTypeAggregate) -> FieldSummary {
    aggregate
        .fields
        .iter()
        .map(|(path, field)| {
            let entities = field
                .per_entity
                .iter()
                .map(|(entity, values)| EntityValues {
                    entity: entity.clone(),
                    values: values.iter().cloned().collect(),
                })
                .collect();

            let usage = FieldUsage {
                kind: field.kind,
                entities,
                all_values: field.all_values.iter().cloned().collect(),
            };
            (path.clone(), usage)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extract;
    use crate::models::FieldKind;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_aggregate() -> ConfigTypeAggregate {
        let mut aggregate = ConfigTypeAggregate::new();
        aggregate.merge("zeta", &extract(&json!({"b": 2, "a": "z", "tags": [null]}), "mod-info"));
        aggregate.merge("alpha", &extract(&json!({"a": "x", "c": [3, 1]}), "mod-info"));
        aggregate
    }

    #[test]
    fn test_entity_summary_rows_sorted_by_path() {
        let summary = build_entity_summary(&sample_aggregate());

        let zeta: Vec<&str> = summary["zeta"].iter().map(|r| r.path.as_str()).collect();
        assert_eq!(zeta, vec!["a", "b"]);

        let alpha = &summary["alpha"];
        assert_eq!(alpha[0].path, "a");
        assert_eq!(alpha[1].path, "c");
        assert_eq!(alpha[1].kind, FieldKind::Array);
        assert_eq!(alpha[1].values, strings(&["1", "3"]));
    }

    #[test]
    fn test_entity_summary_skips_empty_value_sets() {
        let summary = build_entity_summary(&sample_aggregate());
        assert!(summary["zeta"].iter().all(|r| r.path != "tags"));
    }

    #[test]
    fn test_field_summary_orders_entities_and_values() {
        let summary = build_field_summary(&sample_aggregate());

        let a = &summary["a"];
        assert_eq!(a.kind, FieldKind::Primitive);
        let entities: Vec<&str> = a.entities.iter().map(|e| e.entity.as_str()).collect();
        assert_eq!(entities, vec!["alpha", "zeta"]);
        assert_eq!(a.all_values, strings(&["x", "z"]));

        let keys: Vec<&str> = summary.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c", "tags"]);
    }

    #[test]
    fn test_field_summary_keeps_entities_without_values() {
        let summary = build_field_summary(&sample_aggregate());

        let tags = &summary["tags"];
        assert_eq!(tags.entities.len(), 1);
        assert!(tags.entities[0].values.is_empty());
        assert!(tags.all_values.is_empty());
    }

    #[test]
    fn test_empty_aggregate_yields_empty_summaries() {
        let aggregate = ConfigTypeAggregate::new();
        assert!(build_entity_summary(&aggregate).is_empty());
        assert!(build_field_summary(&aggregate).is_empty());
    }
}
