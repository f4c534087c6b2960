//! Turns data rows into company records and merges rows that describe the
//! same company.
//!
//! Registry sheets often spread one company over several rows (a second row
//! carrying only the payroll system, for instance). Rows are grouped by the
//! source's [`KeyPolicy`]: the CNPJ digits first, then the normalized
//! group + trade name. Within a group the first non-empty value of each
//! field wins.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::dates::DateFormat;
use crate::db::{CompanyRecord, KeyPolicy};
use crate::error::PipelineError;
use crate::sheet::{CellValue, RawSheet};
use crate::utils::cnpj_digits;

use super::column_mapper::HeaderMap;
use super::validation::{check_cnpj, ValidationIssue};

/// A record read from one sheet row (1-based)
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRow {
    pub row: usize,
    pub record: CompanyRecord,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Merged records in order of first appearance
    pub records: Vec<CompanyRecord>,
    pub issues: Vec<ValidationIssue>,
    /// Rows folded into an earlier record
    pub merged_rows: usize,
}

/// Per-source rules applied while extracting
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions<'a> {
    pub date_formats: &'a BTreeMap<String, DateFormat>,
    pub policy: KeyPolicy,
}

/// Read every mapped field from the rows below `header_row`.
///
/// Blank rows, and rows with content only in unmapped columns, are skipped.
pub fn extract_rows(sheet: &RawSheet, header_row: usize, map: &HeaderMap) -> Vec<ExtractedRow> {
    let mut rows = Vec::new();

    for idx in (header_row + 1)..sheet.len() {
        if sheet.is_blank_row(idx) {
            continue;
        }
        let record: CompanyRecord = map
            .iter()
            .map(|(field, col)| (field.to_string(), sheet.cell(idx, col).clone()))
            .collect();
        if record.is_empty() {
            debug!("Row {} has no mapped values, skipping", idx + 1);
            continue;
        }
        rows.push(ExtractedRow {
            row: idx + 1,
            record,
        });
    }

    debug!("Extracted {} rows from '{}'", rows.len(), sheet.name);
    rows
}

/// Clean CNPJs and parse date fields with their configured formats.
///
/// A date that does not match keeps its raw text and yields an issue.
pub fn normalize_rows(
    rows: &mut [ExtractedRow],
    date_formats: &BTreeMap<String, DateFormat>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for row in rows.iter_mut() {
        if let Some(cell) = row.record.get("cnpj").cloned() {
            let digits = match &cell {
                // numeric cells lose leading zeros
                CellValue::Number(_) => format!("{:0>14}", cnpj_digits(&cell.as_text())),
                other => cnpj_digits(&other.as_text()),
            };
            issues.extend(check_cnpj(row.row, &digits));
            row.record.set("cnpj", CellValue::text(&digits));
        }

        for (field, format) in date_formats {
            let Some(cell) = row.record.get(field) else {
                continue;
            };
            match format.parse_cell(field, cell) {
                Ok(parsed) => row.record.set(field, parsed),
                Err(err) => {
                    warn!("Row {}: {}", row.row, err);
                    issues.extend(ValidationIssue::from_error(row.row, &err));
                }
            }
        }
    }

    issues
}

struct Accumulator {
    record: CompanyRecord,
    first_row: usize,
    primary: Option<String>,
    alive: bool,
}

/// Group rows by key and combine each group into one record.
///
/// Rows with neither key are reported and dropped; merged records lacking
/// the policy's required field are reported and dropped as well.
pub fn merge_records(rows: Vec<ExtractedRow>, policy: &KeyPolicy) -> MergeOutcome {
    let mut accs: Vec<Accumulator> = Vec::new();
    let mut by_primary: HashMap<String, usize> = HashMap::new();
    let mut by_fallback: HashMap<String, usize> = HashMap::new();
    let mut outcome = MergeOutcome::default();

    for ExtractedRow { row, record } in rows {
        let primary = policy.primary_key(&record);
        let fallback = policy.fallback_key(&record);

        if primary.is_none() && fallback.is_none() {
            let field = policy.primary.unwrap_or(policy.required);
            let err = PipelineError::MissingRequiredField {
                row,
                field: field.to_string(),
            };
            warn!("{}", err);
            outcome.issues.extend(ValidationIssue::from_error(row, &err));
            continue;
        }

        let hit_primary = primary.as_ref().and_then(|k| by_primary.get(k).copied());
        let hit_fallback = fallback
            .as_ref()
            .and_then(|k| by_fallback.get(k).copied())
            .filter(|&j| match (&accs[j].primary, &primary) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            });

        let target = match (hit_primary, hit_fallback) {
            (Some(i), Some(j)) if i != j && accs[j].primary.is_none() => {
                // a keyless-by-CNPJ record turns out to be the same company
                let (keep, gone) = (i.min(j), i.max(j));
                let absorbed = accs[gone].record.clone();
                accs[keep].record.fill_from(&absorbed);
                accs[keep].first_row = accs[keep].first_row.min(accs[gone].first_row);
                if accs[keep].primary.is_none() {
                    accs[keep].primary = accs[gone].primary.take();
                }
                accs[gone].alive = false;
                for idx in by_primary.values_mut().chain(by_fallback.values_mut()) {
                    if *idx == gone {
                        *idx = keep;
                    }
                }
                outcome.merged_rows += 1;
                Some(keep)
            }
            (Some(i), _) => Some(i),
            (None, Some(j)) => Some(j),
            (None, None) => None,
        };

        let idx = match target {
            Some(i) => {
                accs[i].record.fill_from(&record);
                if accs[i].primary.is_none() {
                    accs[i].primary = primary.clone();
                }
                outcome.merged_rows += 1;
                i
            }
            None => {
                accs.push(Accumulator {
                    record,
                    first_row: row,
                    primary: primary.clone(),
                    alive: true,
                });
                accs.len() - 1
            }
        };

        if let Some(k) = primary {
            by_primary.entry(k).or_insert(idx);
        }
        if let Some(k) = fallback {
            by_fallback.entry(k).or_insert(idx);
        }
    }

    for acc in accs.into_iter().filter(|a| a.alive) {
        if acc.record.get(policy.required).is_none() {
            let err = PipelineError::MissingRequiredField {
                row: acc.first_row,
                field: policy.required.to_string(),
            };
            warn!("{}", err);
            outcome.issues.extend(ValidationIssue::from_error(acc.first_row, &err));
            continue;
        }
        outcome.records.push(acc.record);
    }

    outcome
}

/// Extract, normalize and merge in one pass.
pub fn extract_records(
    sheet: &RawSheet,
    header_row: usize,
    map: &HeaderMap,
    options: ExtractOptions<'_>,
) -> MergeOutcome {
    let mut rows = extract_rows(sheet, header_row, map);
    let row_count = rows.len();
    let mut issues = normalize_rows(&mut rows, options.date_formats);

    let mut outcome = merge_records(rows, &options.policy);
    issues.append(&mut outcome.issues);
    issues.sort_by_key(|i| i.row);
    outcome.issues = issues;

    info!(
        "'{}': {} rows -> {} records ({} merged, {} issues)",
        sheet.name,
        row_count,
        outcome.records.len(),
        outcome.merged_rows,
        outcome.issues.len()
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::validation::IssueKind;
    use chrono::NaiveDate;

    fn rec(pairs: &[(&str, &str)]) -> CompanyRecord {
        pairs
            .iter()
            .map(|(f, v)| (f.to_string(), CellValue::text(v)))
            .collect()
    }

    fn rows(records: Vec<CompanyRecord>) -> Vec<ExtractedRow> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| ExtractedRow { row: i + 2, record })
            .collect()
    }

    #[test]
    fn test_extract_rows_skips_blank_and_unmapped() {
        let sheet = RawSheet::new(
            "Clientes",
            vec![
                vec![CellValue::text("CNPJ"), CellValue::text("Nome Fantasia")],
                vec![CellValue::text("111"), CellValue::text("Alfa")],
                vec![],
                vec![CellValue::Empty, CellValue::Empty, CellValue::text("nota solta")],
                vec![CellValue::text("222")],
            ],
        );
        let map = HeaderMap::from([("cnpj", 0), ("nome_fantasia", 1)]);
        let extracted = extract_rows(&sheet, 0, &map);

        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].row, 2);
        assert_eq!(extracted[1].row, 5);
        assert_eq!(extracted[1].record.text("cnpj").as_deref(), Some("222"));
        assert!(extracted[1].record.get("nome_fantasia").is_none());
    }

    #[test]
    fn test_rows_sharing_cnpj_merge_first_non_empty_wins() {
        let outcome = merge_records(
            rows(vec![
                rec(&[("cnpj", "111"), ("nome_fantasia", "Alfa"), ("sistema_contabil", "Dominio")]),
                rec(&[("cnpj", "222"), ("nome_fantasia", "Beta")]),
                rec(&[("cnpj", "111"), ("sistema_contabil", "Outro"), ("sistema_folha", "Folha+")]),
            ]),
            &KeyPolicy::BY_CNPJ,
        );

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.merged_rows, 1);
        let alfa = &outcome.records[0];
        assert_eq!(alfa.text("sistema_contabil").as_deref(), Some("Dominio"));
        assert_eq!(alfa.text("sistema_folha").as_deref(), Some("Folha+"));
        assert_eq!(outcome.records[1].text("nome_fantasia").as_deref(), Some("Beta"));
    }

    #[test]
    fn test_merge_is_order_insensitive_for_disjoint_fields() {
        let a = rec(&[("cnpj", "111"), ("sistema_contabil", "A")]);
        let b = rec(&[("cnpj", "111"), ("sistema_folha", "B")]);

        let ab = merge_records(rows(vec![a.clone(), b.clone()]), &KeyPolicy::BY_CNPJ);
        let ba = merge_records(rows(vec![b, a]), &KeyPolicy::BY_CNPJ);
        assert_eq!(ab.records, ba.records);
        assert_eq!(ab.records.len(), 1);
    }

    #[test]
    fn test_fallback_key_joins_rows_without_cnpj() {
        let outcome = merge_records(
            rows(vec![
                rec(&[("grupo", "Alfa"), ("nome_fantasia", "Loja"), ("cnpj", "111")]),
                rec(&[("grupo", "ALFA"), ("nome_fantasia", "loja"), ("sla", "24h")]),
            ]),
            &KeyPolicy::BY_CNPJ,
        );
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].text("sla").as_deref(), Some("24h"));
    }

    #[test]
    fn test_late_cnpj_row_absorbs_name_only_record() {
        let outcome = merge_records(
            rows(vec![
                rec(&[("cnpj", "111"), ("ie", "9")]),
                rec(&[("grupo", "Alfa"), ("nome_fantasia", "Loja"), ("sla", "24h")]),
                rec(&[("cnpj", "111"), ("grupo", "Alfa"), ("nome_fantasia", "Loja")]),
            ]),
            &KeyPolicy::BY_CNPJ,
        );
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.text("ie").as_deref(), Some("9"));
        assert_eq!(record.text("sla").as_deref(), Some("24h"));
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_rows_without_key_are_reported_and_dropped() {
        let outcome = merge_records(
            rows(vec![
                rec(&[("sistema_folha", "Folha+")]),
                rec(&[("grupo", "Alfa"), ("nome_fantasia", "Sem CNPJ")]),
                rec(&[("cnpj", "111")]),
            ]),
            &KeyPolicy::BY_CNPJ,
        );

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.issues.len(), 2);
        assert!(outcome
            .issues
            .iter()
            .all(|i| i.kind == IssueKind::MissingRequiredField && i.field == "cnpj"));
        assert_eq!(outcome.issues[0].row, 2);
        assert_eq!(outcome.issues[1].row, 3);
    }

    #[test]
    fn test_normalize_rows_cleans_cnpj_and_dates() {
        let mut extracted = vec![
            ExtractedRow {
                row: 6,
                record: rec(&[("cnpj", "12.345.678/0001-90"), ("inicio_contrato", "10/01/2025")]),
            },
            ExtractedRow {
                row: 7,
                record: CompanyRecord::new()
                    .with("cnpj", CellValue::Number(1234567000190.0))
                    .with("inicio_contrato", CellValue::text("2025-01-10")),
            },
        ];
        let mut formats = BTreeMap::new();
        formats.insert("inicio_contrato".to_string(), DateFormat::parse("DD/MM/YYYY").unwrap());

        let issues = normalize_rows(&mut extracted, &formats);

        assert_eq!(extracted[0].record.text("cnpj").as_deref(), Some("12345678000190"));
        assert_eq!(
            extracted[0].record.get("inicio_contrato"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()))
        );
        assert_eq!(extracted[1].record.text("cnpj").as_deref(), Some("01234567000190"));
        assert_eq!(
            extracted[1].record.get("inicio_contrato"),
            Some(&CellValue::text("2025-01-10"))
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DateFormatMismatch);
        assert_eq!(issues[0].row, 7);
    }
}
