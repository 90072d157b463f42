//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use golem_db::codec::format_ether;
use golem_db::{HardwarePreset, KnownHost, Payment, TaskPreset};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a list of outgoing payments
    pub fn print_payments(&self, payments: &[Payment]) {
        match self.format {
            OutputFormat::Human => {
                if payments.is_empty() {
                    println!("No payments found.");
                    return;
                }
                for payment in payments {
                    println!(
                        "{} | {:<9} | {:>12} GNT | 0x{} | {}",
                        truncate(payment.subtask(), 24),
                        payment.status,
                        format_ether(&payment.value),
                        hex::encode(&payment.payee),
                        format_time(&payment.modified_at)
                    );
                }
                println!("\n{} payment(s)", payments.len());
            }
            OutputFormat::Json => {
                let rows: Vec<Value> = payments.iter().map(payment_json).collect();
                println!("{:#}", Value::Array(rows));
            }
            OutputFormat::Quiet => {
                for payment in payments {
                    println!("{}", payment.subtask());
                }
            }
        }
    }

    /// Print a list of known hosts
    pub fn print_hosts(&self, hosts: &[KnownHost]) {
        match self.format {
            OutputFormat::Human => {
                if hosts.is_empty() {
                    println!("No known hosts.");
                    return;
                }
                for host in hosts {
                    println!(
                        "{:<21} | {}{}",
                        host.address(),
                        format_time(&host.last_connected),
                        if host.is_seed { " (seed)" } else { "" }
                    );
                }
                println!("\n{} host(s)", hosts.len());
            }
            OutputFormat::Json => {
                let rows: Vec<Value> = hosts
                    .iter()
                    .map(|host| {
                        json!({
                            "ip_address": host.ip_address,
                            "port": host.port,
                            "last_connected": host.last_connected.to_rfc3339(),
                            "is_seed": host.is_seed
                        })
                    })
                    .collect();
                println!("{:#}", Value::Array(rows));
            }
            OutputFormat::Quiet => {
                for host in hosts {
                    println!("{}", host.address());
                }
            }
        }
    }

    /// Print a list of hardware presets
    pub fn print_hardware_presets(&self, presets: &[HardwarePreset]) {
        match self.format {
            OutputFormat::Human => {
                if presets.is_empty() {
                    println!("No hardware presets.");
                    return;
                }
                for preset in presets {
                    println!(
                        "{} | cpu: {} | memory: {} KiB | disk: {} KiB",
                        truncate(&preset.name, 24),
                        preset.cpu_cores,
                        preset.memory,
                        preset.disk
                    );
                }
                println!("\n{} preset(s)", presets.len());
            }
            OutputFormat::Json => {
                let rows: Vec<Value> = presets.iter().map(HardwarePreset::to_json).collect();
                println!("{:#}", Value::Array(rows));
            }
            OutputFormat::Quiet => {
                for preset in presets {
                    println!("{}", preset.name);
                }
            }
        }
    }

    /// Print a list of task presets
    pub fn print_task_presets(&self, presets: &[TaskPreset]) {
        match self.format {
            OutputFormat::Human => {
                if presets.is_empty() {
                    println!("No task presets.");
                    return;
                }
                for preset in presets {
                    println!(
                        "{} | {} | {}",
                        preset.task_type(),
                        truncate(preset.name(), 24),
                        truncate(&preset.data.to_string(), 45)
                    );
                }
                println!("\n{} preset(s)", presets.len());
            }
            OutputFormat::Json => {
                let rows: Vec<Value> = presets
                    .iter()
                    .map(|preset| {
                        json!({
                            "task_type": preset.task_type(),
                            "name": preset.name(),
                            "data": preset.data
                        })
                    })
                    .collect();
                println!("{:#}", Value::Array(rows));
            }
            OutputFormat::Quiet => {
                for preset in presets {
                    println!("{}/{}", preset.task_type(), preset.name());
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// JSON form of a payment; wei amounts stay decimal strings
fn payment_json(payment: &Payment) -> Value {
    json!({
        "subtask": payment.subtask(),
        "status": payment.status.to_string(),
        "payee": format!("0x{}", hex::encode(&payment.payee)),
        "value": payment.value.to_string(),
        "details": payment.details,
        "created_at": payment.created_at.to_rfc3339(),
        "modified_at": payment.modified_at.to_rfc3339()
    })
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
