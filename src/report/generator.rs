//! Report generation.
//!
//! This module renders the field usage report from per-config-type
//! summaries, as Markdown or JSON. Config types without summaries get a
//! short note instead of failing the report.

use crate::config::ReportConfig;
use crate::models::{
    ConfigTypeSection, EntitySummary, FieldSummary, Report, ReportMetadata, RunStats,
    SectionContent,
};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Config Field Report\n\n");

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Table of contents
    output.push_str(&generate_table_of_contents(report));

    // Overview across config types
    output.push_str(&generate_overview_section(&report.config_types));

    // One section per config type
    for section in &report.config_types {
        output.push_str(&generate_config_type_section(section, options));
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Entities Directory:** `{}`\n", metadata.entities_dir));
    section.push_str(&format!(
        "- **Config Types:** {} available",
        metadata.config_types_available
    ));
    if metadata.config_types_unavailable > 0 {
        section.push_str(&format!(
            ", {} unavailable",
            metadata.config_types_unavailable
        ));
    }
    section.push('\n');
    section.push_str(&format!("- **Duration:** {:.1}s\n", metadata.duration_seconds));

    if !metadata.entity_versions.is_empty() {
        section.push_str("\n### Entity Versions\n\n");
        section.push_str("| Entity | Branch | Commit |\n");
        section.push_str("|:---|:---|:---|\n");
        for version in &metadata.entity_versions {
            section.push_str(&format!(
                "| {} | {} | `{}` |\n",
                version.id,
                version.branch.as_deref().unwrap_or("-"),
                version.commit.as_deref().unwrap_or("-"),
            ));
        }
    }
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Overview](#overview)\n");

    for section in &report.config_types {
        toc.push_str(&format!("- [{}](#{})\n", section.name, anchor(&section.name)));
    }

    toc.push('\n');

    toc
}

/// Generate the overview table.
fn generate_overview_section(sections: &[ConfigTypeSection]) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str("| Config Type | Entities | Documents | Skipped | Fields |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");

    for config_type in sections {
        match &config_type.content {
            SectionContent::Available {
                stats,
                entities,
                fields,
            } => {
                let (documents, skipped) = match stats {
                    Some(RunStats {
                        documents_merged,
                        documents_skipped,
                        ..
                    }) => (documents_merged.to_string(), documents_skipped.to_string()),
                    None => ("-".to_string(), "-".to_string()),
                };
                section.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    config_type.name,
                    entities.len(),
                    documents,
                    skipped,
                    fields.len()
                ));
            }
            SectionContent::Unavailable { .. } => {
                section.push_str(&format!(
                    "| {} | - | - | - | *unavailable* |\n",
                    config_type.name
                ));
            }
        }
    }
    section.push('\n');

    section
}

/// Generate the section for one config type.
fn generate_config_type_section(section: &ConfigTypeSection, options: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str(&format!("## {} {{#{}}}\n\n", section.name, anchor(&section.name)));

    match &section.content {
        SectionContent::Unavailable { reason } => {
            output.push_str(&format!("> Summaries unavailable: {}\n\n", reason));
        }
        SectionContent::Available {
            entities, fields, ..
        } => {
            output.push_str(&generate_fields_table(fields, options.max_values_shown));
            if options.include_entity_view {
                output.push_str(&generate_entity_listing(entities, options.max_values_shown));
            }
        }
    }

    output
}

/// Generate the by-field table.
fn generate_fields_table(fields: &FieldSummary, max_values: usize) -> String {
    let mut table = String::new();

    table.push_str("### Fields\n\n");

    if fields.is_empty() {
        table.push_str("No fields were found.\n\n");
        return table;
    }

    table.push_str("| Field | Kind | Entities | Distinct Values | Values |\n");
    table.push_str("|:---|:---:|:---:|:---:|:---|\n");

    for (path, usage) in fields {
        table.push_str(&format!(
            "| `{}` | {} | {} | {} | {} |\n",
            escape_cell(path),
            usage.kind,
            usage.entities.len(),
            usage.all_values.len(),
            format_values(&usage.all_values, max_values)
        ));
    }
    table.push('\n');

    table
}

/// Generate the by-entity listing.
fn generate_entity_listing(entities: &EntitySummary, max_values: usize) -> String {
    let mut listing = String::new();

    listing.push_str("### By Entity\n\n");

    if entities.is_empty() {
        listing.push_str("No entity uses any field.\n\n");
        return listing;
    }

    for (entity, rows) in entities {
        listing.push_str(&format!(
            "<details>\n<summary>{} ({} fields)</summary>\n\n",
            entity,
            rows.len()
        ));
        for row in rows {
            listing.push_str(&format!(
                "- `{}` ({}): {}\n",
                escape_cell(&row.path),
                row.kind,
                format_values(&row.values, max_values)
            ));
        }
        listing.push_str("\n</details>\n\n");
    }

    listing
}

/// Format a value list for a table cell, truncating long lists.
fn format_values(values: &[String], max_values: usize) -> String {
    if values.is_empty() {
        return "*none*".to_string();
    }

    let shown: Vec<String> = values
        .iter()
        .take(max_values)
        .map(|v| format!("`{}`", escape_cell(v)))
        .collect();

    let mut cell = shown.join(", ");
    if values.len() > max_values {
        cell.push_str(&format!(" (+{} more)", values.len() - max_values));
    }
    cell
}

/// Keep values from breaking table rows.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('`', "'").replace('\n', " ")
}

fn anchor(name: &str) -> String {
    name.replace(['/', '.', ' ', '{', '}'], "-").to_lowercase()
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by fieldscope v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfigTypeSummaries, EntityFieldUsage, EntityValues, EntityVersion, FieldKind, FieldUsage};
    use chrono::Utc;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_report() -> Report {
        let metadata = ReportMetadata {
            generated_at: Utc::now(),
            entities_dir: "mods".to_string(),
            entity_versions: vec![EntityVersion {
                id: "alpha".to_string(),
                branch: Some("main".to_string()),
                commit: Some("1a2b3c4d".to_string()),
            }],
            config_types_available: 1,
            config_types_unavailable: 1,
            duration_seconds: 1.5,
        };

        let mut fields = FieldSummary::new();
        fields.insert(
            "settings.{settingName}".to_string(),
            FieldUsage {
                kind: FieldKind::Primitive,
                entities: vec![EntityValues {
                    entity: "alpha".to_string(),
                    values: strings(&["5", "7"]),
                }],
                all_values: strings(&["5", "7"]),
            },
        );

        let mut entities = EntitySummary::new();
        entities.insert(
            "alpha".to_string(),
            vec![EntityFieldUsage {
                path: "settings.{settingName}".to_string(),
                kind: FieldKind::Primitive,
                values: strings(&["5", "7"]),
            }],
        );

        Report {
            metadata,
            config_types: vec![
                ConfigTypeSection::from_summaries(ConfigTypeSummaries {
                    config_type: "default-config".to_string(),
                    stats: RunStats {
                        entities: 1,
                        documents_merged: 1,
                        documents_skipped: 0,
                        fields: 1,
                    },
                    entities,
                    fields,
                }),
                ConfigTypeSection::unavailable("presets", "No persisted summaries found"),
            ],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Config Field Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Overview"));
        assert!(markdown.contains("## default-config"));
        assert!(markdown.contains("`settings.{settingName}`"));
        assert!(markdown.contains("<summary>alpha (1 fields)</summary>"));
        assert!(markdown.contains("1a2b3c4d"));
    }

    #[test]
    fn test_unavailable_config_type_renders_note() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("## presets"));
        assert!(markdown.contains("| presets | - | - | - | *unavailable* |"));
        assert!(markdown.contains("Summaries unavailable: No persisted summaries found"));
    }

    #[test]
    fn test_entity_view_can_be_disabled() {
        let report = create_test_report();
        let options = ReportConfig {
            include_entity_view: false,
            ..ReportConfig::default()
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(!markdown.contains("### By Entity"));
        assert!(markdown.contains("### Fields"));
    }

    #[test]
    fn test_format_values_truncates() {
        let values = strings(&["a", "b", "c", "d"]);
        assert_eq!(format_values(&values, 2), "`a`, `b` (+2 more)");
        assert_eq!(format_values(&values, 10), "`a`, `b`, `c`, `d`");
        assert_eq!(format_values(&[], 10), "*none*");
    }

    #[test]
    fn test_format_values_escapes_table_breakers() {
        let values = strings(&["a|b", "line\nbreak"]);
        assert_eq!(format_values(&values, 10), "`a\\|b`, `line break`");
    }

    #[test]
    fn test_field_paths_are_escaped_in_tables() {
        let mut report = create_test_report();
        if let SectionContent::Available { fields, entities, .. } =
            &mut report.config_types[0].content
        {
            if let Some(usage) = fields.remove("settings.{settingName}") {
                fields.insert("a|b".to_string(), usage);
            }
            for row in entities.values_mut().flatten() {
                row.path = "a|b".to_string();
            }
        }

        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("| `a\\|b` | primitive | 1 | 2 |"));
        assert!(markdown.contains("- `a\\|b` (primitive):"));
        assert!(!markdown.contains("`a|b`"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"generated_at\""));
        assert!(json.contains("\"status\": \"available\""));
        assert!(json.contains("\"status\": \"unavailable\""));
        assert!(json.contains("\"all_values\""));
    }
}
