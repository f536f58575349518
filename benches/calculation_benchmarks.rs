//! Performance benchmarks for the Payroll Engine.
//!
//! Covers the pure calculations and a full generation run:
//! - Statutory deductions for one salary
//! - One payroll item with overrides
//! - Generating a period for 100 and 1000 employees
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use criterion::{
    BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use payroll_engine::calculation::calculate_statutory_deductions;
use payroll_engine::config::{ConfigLoader, EngineConfig};
use payroll_engine::models::{
    AttendanceRow, Employee, EmploymentStatus, OverrideKind, PayOverride, PayrollPeriod,
    index_overrides,
};
use payroll_engine::persistence::Database;
use payroll_engine::services::{
    AttendanceStore, EngineContext, PayrollPipeline, PeriodStateMachine, build_payroll_item,
};

fn load_config() -> EngineConfig {
    ConfigLoader::load("./config/ph_2025")
        .expect("Failed to load config")
        .into_config()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn create_employee(index: usize) -> Employee {
    Employee {
        id: format!("emp_{:05}", index),
        name: format!("Bench Employee {}", index),
        monthly_salary: dec("35000"),
        daily_rate: dec("1590.91"),
        highest_monthly_salary: None,
        appointment_date: NaiveDate::from_ymd_opt(2018, 6, 1).unwrap(),
        separation_date: None,
        employment_status: EmploymentStatus::Active,
        step_increment: 2,
        last_step_increment_date: None,
    }
}

/// Builds a store holding `count` employees and an attended period, returning
/// the pipeline and the period id.
async fn prepare_generation(config: &EngineConfig, count: usize) -> (PayrollPipeline, Uuid) {
    let db = Database::open_in_memory().unwrap();
    for i in 0..count {
        db.upsert_employee(create_employee(i)).await.unwrap();
    }
    let ctx = EngineContext::with_tracing(db, config.clone());
    let period = PeriodStateMachine::new(ctx.clone())
        .create_period(2025, 9, 1, None)
        .await
        .unwrap();
    let rows = (0..count)
        .map(|i| AttendanceRow {
            employee_id: format!("emp_{:05}", i),
            working_days: dec("11"),
            leave_days: Decimal::ZERO,
            overtime_hours: Decimal::ZERO,
        })
        .collect();
    AttendanceStore::new(ctx.clone())
        .import_batch(period.id, rows, "bench")
        .await
        .unwrap();
    (PayrollPipeline::new(ctx), period.id)
}

/// Benchmark: statutory deductions for a single salary.
///
/// Target: < 10μs mean
fn bench_statutory_deductions(c: &mut Criterion) {
    let config = load_config();
    let salary = dec("35000");

    c.bench_function("statutory_deductions", |b| {
        b.iter(|| black_box(calculate_statutory_deductions(black_box(salary), &config, 5)))
    });
}

/// Benchmark: one payroll item with an allowance and a deduction override.
///
/// Target: < 50μs mean
fn bench_payroll_item(c: &mut Criterion) {
    let config = load_config();
    let period = PayrollPeriod::half_month(2025, 9, 1, None).unwrap();
    let employee = create_employee(0);
    let overrides = index_overrides(
        vec![
            PayOverride {
                id: Uuid::new_v4(),
                employee_id: employee.id.clone(),
                kind: OverrideKind::Allowance,
                code: "pera".to_string(),
                amount: dec("1500"),
                effective_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end_date: None,
                is_active: true,
                created_at: Utc::now(),
            },
            PayOverride {
                id: Uuid::new_v4(),
                employee_id: employee.id.clone(),
                kind: OverrideKind::Deduction,
                code: "salary_loan".to_string(),
                amount: dec("2500"),
                effective_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end_date: None,
                is_active: true,
                created_at: Utc::now(),
            },
        ],
        period.start_date,
        period.end_date,
    );

    c.bench_function("payroll_item", |b| {
        b.iter(|| {
            let item = build_payroll_item(
                black_box(&period),
                black_box(&employee),
                Some(dec("11")),
                &overrides,
                &config,
            )
            .unwrap();
            black_box(item)
        })
    });
}

/// Benchmark: full generation runs.
///
/// Only the `generate` call is timed; building the store is excluded.
///
/// Target: 1000 employees < 100ms mean
fn bench_generation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = load_config();

    let mut group = c.benchmark_group("generation");
    group.sample_size(20);

    for count in [100usize, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("employees", count), count, |b, &count| {
            let config = config.clone();
            b.to_async(&rt).iter_custom(move |iters| {
                let config = config.clone();
                async move {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let (pipeline, period_id) = prepare_generation(&config, count).await;
                        let started = Instant::now();
                        let summary = pipeline.generate(period_id).await.unwrap();
                        total += started.elapsed();
                        black_box(summary);
                    }
                    total
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_statutory_deductions,
    bench_payroll_item,
    bench_generation,
);
criterion_main!(benches);
