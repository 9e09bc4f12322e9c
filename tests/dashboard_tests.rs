/// Scenario tests for the dashboard engines
/// Covers the KPI cards, the analytics charts and the leads table end to end
use smartconvert_api::core::analytics::{self, KpiCounts};
use smartconvert_api::core::models::{CategoryField, LeadRecord, LeadStatus};
use smartconvert_api::core::query::{self, CategoryFilter, QueryParams, SortKey};

fn lead(id: i64, score: f64, job: &str) -> LeadRecord {
    let mut record = LeadRecord::new(id, Some(score));
    record.job = job.to_string();
    record
}

#[cfg(test)]
mod analytics_scenarios {
    use super::*;

    #[test]
    fn test_score_at_seventy_percent_is_medium() {
        let kpi = analytics::kpi_counts(&[lead(1, 0.70, "admin.")]);
        assert_eq!(
            kpi,
            KpiCounts {
                total: 1,
                high: 0,
                medium: 1,
                low: 0
            }
        );
    }

    #[test]
    fn test_empty_collection_has_zero_figures() {
        let summary = analytics::summarize(&[]);

        assert_eq!(
            summary.kpi,
            KpiCounts {
                total: 0,
                high: 0,
                medium: 0,
                low: 0
            }
        );
        assert!(summary.score_distribution.iter().all(|b| b.count == 0));
        assert!(summary.age_groups.iter().all(|b| b.count == 0));
        assert!(summary.is_empty());
    }

    #[test]
    fn test_summary_top_jobs_folds_tail() {
        let records: Vec<LeadRecord> = ["a", "b", "c", "d", "e", "f", "g", "a"]
            .iter()
            .enumerate()
            .map(|(i, job)| lead(i as i64, 0.5, job))
            .collect();

        let summary = analytics::summarize(&records);
        assert_eq!(summary.top_jobs.len(), 6);
        assert_eq!(summary.top_jobs[0].name, "a");
        assert_eq!(summary.top_jobs[0].count, 2);
        assert_eq!(summary.top_jobs[5].name, "Others");
        assert_eq!(summary.top_jobs[5].count, 2);
    }
}

#[cfg(test)]
mod table_scenarios {
    use super::*;

    #[test]
    fn test_twelve_records_page_two() {
        let records: Vec<LeadRecord> = (1..=12).map(|i| lead(i, 0.5, "admin.")).collect();
        let params = QueryParams {
            page: 2,
            page_size: 10,
            ..QueryParams::default()
        };

        let page = query::run_query(&records, &params);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total_count, 12);
    }

    #[test]
    fn test_search_new_matches_status_only() {
        let mut contacted = lead(2, 0.4, "technician");
        contacted.lead_status = LeadStatus::Contacted;
        let records = vec![lead(1, 0.9, "management"), contacted];

        let params = QueryParams {
            search: "new".to_string(),
            ..QueryParams::default()
        };
        let page = query::run_query(&records, &params);

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, 1);
    }

    #[test]
    fn test_filter_options_feed_category_filter() {
        let records = vec![
            lead(1, 0.2, "student"),
            lead(2, 0.8, "retired"),
            lead(3, 0.6, "student"),
        ];

        let options = query::distinct_values(&records, CategoryField::Job);
        assert_eq!(options, vec!["all", "student", "retired"]);

        let params = QueryParams {
            category_filter: Some(CategoryFilter {
                field: CategoryField::Job,
                value: options[1].clone(),
            }),
            sort: SortKey::ScoreDesc,
            ..QueryParams::default()
        };
        let ids: Vec<i64> = query::run_query(&records, &params)
            .items
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
