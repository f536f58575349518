//! Payroll and Statutory Benefits Engine for Philippine public-sector payroll
//!
//! This crate turns attendance imports and employee records into semi-monthly
//! payroll runs with GSIS, Pag-IBIG, PhilHealth and withholding tax
//! deductions, drives payroll periods through their approval lifecycle, and
//! computes cycle-based and one-off benefit payouts.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod persistence;
pub mod services;
