//! SQLite schema for the engine's store.
//!
//! Each table keeps the full row as JSON in `data` and copies out the
//! columns that indexes, constraints and lookups need.

use rusqlite::Connection;

/// Creates every table and index if they do not exist yet.
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS employees (
            id TEXT PRIMARY KEY,
            employment_status TEXT NOT NULL,
            appointment_date TEXT NOT NULL,
            separation_date TEXT,
            data TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS payroll_periods (
            id TEXT PRIMARY KEY,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL CHECK(month BETWEEN 1 AND 12),
            period_number INTEGER NOT NULL CHECK(period_number IN (1, 2)),
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            status TEXT NOT NULL,
            data TEXT NOT NULL,
            CHECK(start_date < end_date)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_periods_key
            ON payroll_periods(year, month, period_number);

        CREATE TABLE IF NOT EXISTS attendance_batches (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            period_id TEXT NOT NULL REFERENCES payroll_periods(id),
            is_active INTEGER NOT NULL CHECK(is_active IN (0, 1)),
            data TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_batches_one_active
            ON attendance_batches(period_id) WHERE is_active = 1;

        CREATE TABLE IF NOT EXISTS attendance_records (
            batch_id TEXT NOT NULL REFERENCES attendance_batches(id),
            employee_id TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (batch_id, employee_id)
        );

        CREATE TABLE IF NOT EXISTS payroll_items (
            id TEXT NOT NULL UNIQUE,
            period_id TEXT NOT NULL REFERENCES payroll_periods(id),
            employee_id TEXT NOT NULL,
            status TEXT NOT NULL,
            data TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_items_period_employee
            ON payroll_items(period_id, employee_id);

        CREATE TABLE IF NOT EXISTS pay_overrides (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            employee_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            code TEXT NOT NULL,
            effective_date TEXT NOT NULL,
            is_active INTEGER NOT NULL CHECK(is_active IN (0, 1)),
            data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_overrides_key
            ON pay_overrides(employee_id, kind, code, is_active);

        CREATE TABLE IF NOT EXISTS benefit_cycles (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            data TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS benefit_items (
            id TEXT NOT NULL UNIQUE,
            cycle_id TEXT NOT NULL REFERENCES benefit_cycles(id),
            employee_id TEXT NOT NULL,
            data TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_benefit_items_cycle_employee
            ON benefit_items(cycle_id, employee_id);

        CREATE TABLE IF NOT EXISTS compensation_benefits (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            employee_id TEXT NOT NULL,
            amount TEXT NOT NULL,
            data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_compensation_employee
            ON compensation_benefits(employee_id);

        CREATE TABLE IF NOT EXISTS leave_types (
            code TEXT PRIMARY KEY,
            is_monetizable INTEGER NOT NULL CHECK(is_monetizable IN (0, 1)),
            data TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS leave_balances (
            employee_id TEXT NOT NULL,
            leave_type TEXT NOT NULL,
            year INTEGER NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (employee_id, leave_type, year)
        );
        ",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
    }

    #[test]
    fn test_second_active_batch_violates_index() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO payroll_periods
                 (id, year, month, period_number, start_date, end_date, status, data)
             VALUES ('p1', 2025, 9, 1, '2025-09-01', '2025-09-15', 'draft', '{}')",
            [],
        )
        .unwrap();
        let insert = "INSERT INTO attendance_batches (id, period_id, is_active, data)
                      VALUES (?1, 'p1', ?2, '{}')";
        conn.execute(insert, ("b1", 1)).unwrap();
        conn.execute(insert, ("b2", 0)).unwrap();

        assert!(conn.execute(insert, ("b3", 1)).is_err());
    }

    #[test]
    fn test_reversed_period_dates_violate_check() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO payroll_periods
                 (id, year, month, period_number, start_date, end_date, status, data)
             VALUES ('p1', 2025, 9, 1, '2025-09-15', '2025-09-01', 'draft', '{}')",
            [],
        );
        assert!(result.is_err());
    }
}
