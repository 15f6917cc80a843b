//! Transformation runner
//!
//! Executes the configured SQL scripts against the warehouse, strictly in
//! list order. Scripts may depend on the effects of earlier ones, so the
//! ordering is a hard requirement; a failing script is logged and the
//! remaining scripts still run.

use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::warehouse::Warehouse;

pub async fn run_transformations(warehouse: &dyn Warehouse, queries_dir: &Path, files: &[String]) {
    for file_name in files {
        let path = queries_dir.join(file_name);

        let sql = match fs::read_to_string(&path) {
            Ok(sql) => sql,
            Err(e) => {
                error!("Failed to read query file {:?}: {}", path, e);
                continue;
            }
        };

        match warehouse.execute(&sql).await {
            Ok(()) => {
                info!("Successfully executed saved query from file: {}", file_name);
            }
            Err(e) => {
                error!("Failed to execute query from file {}: {}", file_name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockWarehouse;
    use std::fs::File;
    use std::io::Write;

    fn write_scripts(dir: &Path, scripts: &[(&str, &str)]) {
        for (name, sql) in scripts {
            let mut file = File::create(dir.join(name)).unwrap();
            write!(file, "{}", sql).unwrap();
        }
    }

    fn file_list(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_scripts_run_in_list_order() {
        let dir = tempfile::tempdir().unwrap();
        write_scripts(
            dir.path(),
            &[
                ("01_merge.sql", "INSERT INTO merged SELECT 1"),
                ("02_aggregate.sql", "INSERT INTO agg SELECT 2"),
                ("03_scale.sql", "INSERT INTO scaled SELECT 3"),
            ],
        );
        let warehouse = MockWarehouse::with_rows(0);

        run_transformations(
            &warehouse,
            dir.path(),
            &file_list(&["01_merge.sql", "02_aggregate.sql", "03_scale.sql"]),
        )
        .await;

        assert_eq!(
            warehouse.executed_sql(),
            vec![
                "INSERT INTO merged SELECT 1",
                "INSERT INTO agg SELECT 2",
                "INSERT INTO scaled SELECT 3",
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_script_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        write_scripts(
            dir.path(),
            &[
                ("01.sql", "SELECT 1"),
                ("02.sql", "BROKEN STATEMENT"),
                ("03.sql", "SELECT 3"),
                ("04.sql", "SELECT 4"),
            ],
        );
        let mut warehouse = MockWarehouse::with_rows(0);
        warehouse.failing_sql = Some("BROKEN".to_string());

        run_transformations(
            &warehouse,
            dir.path(),
            &file_list(&["01.sql", "02.sql", "03.sql", "04.sql"]),
        )
        .await;

        // The failing script was still attempted, in order, and the rest ran
        assert_eq!(
            warehouse.executed_sql(),
            vec!["SELECT 1", "BROKEN STATEMENT", "SELECT 3", "SELECT 4"]
        );
    }

    #[tokio::test]
    async fn test_missing_script_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_scripts(dir.path(), &[("01.sql", "SELECT 1"), ("03.sql", "SELECT 3")]);
        let warehouse = MockWarehouse::with_rows(0);

        run_transformations(
            &warehouse,
            dir.path(),
            &file_list(&["01.sql", "02_missing.sql", "03.sql"]),
        )
        .await;

        assert_eq!(warehouse.executed_sql(), vec!["SELECT 1", "SELECT 3"]);
    }
}
