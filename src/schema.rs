//! Change-feed installation for the sensor table.
//!
//! The sensor table belongs to the hosted store; this service never creates or
//! alters it. The only object it may add is a row trigger that publishes a
//! `NOTIFY` on every insert, update or delete, which is what the change feed
//! in `sources/postgres.rs` listens to. Applied once on startup from `main.rs`
//! when `INSTALL_CHANGE_TRIGGER` is set.

use anyhow::Result;
use sqlx::PgPool;

// ---

fn notify_function_name(table: &str) -> String {
    format!("{table}_notify_change")
}

/// `CREATE FUNCTION` / `CREATE TRIGGER` statements for `table` and `channel`.
///
/// Both names must already be validated as plain identifiers.
fn change_trigger_statements(table: &str, channel: &str) -> [String; 3] {
    // ---
    let function = notify_function_name(table);
    let trigger = format!("{table}_change_feed");

    [
        format!(
            r#"
            CREATE OR REPLACE FUNCTION {function}() RETURNS trigger AS $$
            BEGIN
                PERFORM pg_notify('{channel}', TG_OP);
                RETURN NULL;
            END;
            $$ LANGUAGE plpgsql;
            "#
        ),
        format!("DROP TRIGGER IF EXISTS {trigger} ON {table};"),
        format!(
            r#"
            CREATE TRIGGER {trigger}
                AFTER INSERT OR UPDATE OR DELETE ON {table}
                FOR EACH ROW EXECUTE FUNCTION {function}();
            "#
        ),
    ]
}

/// Install (or refresh) the change-feed trigger on `table` (idempotent).
///
/// Errors are propagated if any SQL execution fails, e.g. when the role lacks
/// the privilege to create triggers on the hosted table.
pub async fn install_change_trigger(pool: &PgPool, table: &str, channel: &str) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    for statement in change_trigger_statements(table, channel) {
        sqlx::query(&statement).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    tracing::info!(
        "Change trigger installed on '{}', notifying channel '{}'",
        table,
        channel
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn trigger_statements_target_table_and_channel() {
        // ---
        let [function, drop, create] =
            change_trigger_statements("sensor_data", "sensor_data_changes");

        assert!(function.contains("FUNCTION sensor_data_notify_change()"));
        assert!(function.contains("pg_notify('sensor_data_changes', TG_OP)"));
        assert_eq!(
            drop,
            "DROP TRIGGER IF EXISTS sensor_data_change_feed ON sensor_data;"
        );
        assert!(create.contains("AFTER INSERT OR UPDATE OR DELETE ON sensor_data"));
        assert!(create.contains("EXECUTE FUNCTION sensor_data_notify_change()"));
    }
}
