// Dashboard statistics over the Shipvoid forecast.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{DateCount, NormalizedRecord, ShipvoidStats};

/// Compute dashboard stats. A record is at risk when its status is not one of
/// `billed_statuses` (compared upper-case); a record without status is at risk.
pub fn shipvoid_stats(records: &[NormalizedRecord], billed_statuses: &[String]) -> ShipvoidStats {
    let billed: Vec<String> = billed_statuses.iter().map(|s| s.trim().to_uppercase()).collect();

    let mut stats = ShipvoidStats {
        total: records.len(),
        ..ShipvoidStats::default()
    };
    let mut by_date: BTreeMap<NaiveDate, usize> = BTreeMap::new();

    for record in records {
        if let Some(origin) = &record.origin {
            *stats.by_origin.entry(origin.clone()).or_default() += 1;
        }

        match record.date {
            Some(d) => {
                *by_date.entry(d).or_default() += 1;
                stats.oldest_date = Some(stats.oldest_date.map_or(d, |o| o.min(d)));
            }
            None => stats.undated += 1,
        }

        let is_billed = record.status.as_ref().is_some_and(|s| billed.contains(s));
        if !is_billed {
            stats.at_risk_count += 1;
            if let Some(cost) = &record.cost {
                stats.potential_cost = &stats.potential_cost + cost;
            }
        }
    }

    stats.by_label_date = by_date
        .into_iter()
        .map(|(date, containers)| DateCount { date, containers })
        .collect();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::model::RecordKey;
    use shipvoid_io::{RawRecord, SourceKind};
    use std::sync::Arc;

    fn rec(origin: &str, date: Option<&str>, status: Option<&str>, cost: &str) -> NormalizedRecord {
        NormalizedRecord {
            source: SourceKind::Shipvoid,
            key: RecordKey::Invalid,
            facility: "6006".into(),
            date: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            quantity: None,
            status: status.map(str::to_string),
            cost: Decimal::parse(cost),
            origin: Some(origin.into()),
            latest_event: None,
            row: 2,
            raw: Arc::new(RawRecord {
                source: SourceKind::Shipvoid,
                sheet: None,
                origin: None,
                row: 2,
                fields: Default::default(),
            }),
        }
    }

    #[test]
    fn at_risk_excludes_billed_statuses() {
        let records = vec![
            rec("In House", Some("2024-01-06"), Some("OPEN"), "10.25"),
            rec("In House", Some("2024-01-05"), Some("VF"), "99"),
            rec("CrossDock", Some("2024-01-06"), Some("BILLED OR INACTIVE"), "50"),
            rec("CrossDock", None, None, "1.75"),
        ];
        let stats = shipvoid_stats(&records, &["VF".into(), "Billed or Inactive".into()]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.at_risk_count, 2);
        assert_eq!(stats.potential_cost.to_string(), "12");
        assert_eq!(stats.by_origin["In House"], 2);
        assert_eq!(stats.by_origin["CrossDock"], 2);
        assert_eq!(stats.oldest_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(stats.undated, 1);
        let pivot: Vec<(String, usize)> = stats
            .by_label_date
            .iter()
            .map(|d| (d.date.to_string(), d.containers))
            .collect();
        assert_eq!(
            pivot,
            vec![("2024-01-05".to_string(), 1), ("2024-01-06".to_string(), 2)]
        );
    }

    #[test]
    fn spreadsheet_float_costs_are_summed() {
        let mut a = rec("In House", Some("2024-01-05"), Some("OPEN"), "0");
        a.cost = Decimal::from_f64(0.1 + 0.2);
        let mut b = rec("In House", Some("2024-01-05"), Some("OPEN"), "0");
        b.cost = Decimal::from_f64(1.23456);
        let stats = shipvoid_stats(&[a, b], &[]);
        assert_eq!(stats.at_risk_count, 2);
        assert_eq!(stats.potential_cost.to_string(), "1.53456");
    }

    #[test]
    fn empty_stats() {
        let stats = shipvoid_stats(&[], &[]);
        assert_eq!(stats, ShipvoidStats::default());
    }
}
