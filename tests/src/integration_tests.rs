use crate::http_client::ApiClient;
use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use hyper::StatusCode;
use serde_json::Value;
use tracing::{error, info};

pub struct IntegrationTestResults {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub test_details: Vec<TestResult>,
}

pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u128,
}

/// Run all integration tests against a live monitor daemon
pub async fn run_all_tests(api_addr: &str) -> Result<IntegrationTestResults> {
    info!("=== Starting Integration Tests ===");

    let mut results = IntegrationTestResults {
        total_tests: 0,
        passed: 0,
        failed: 0,
        test_details: Vec::new(),
    };

    // Health endpoint
    results.add_test(test_health(api_addr).await);

    // Today row always present, even before the first flush
    results.add_test(test_today_stats(api_addr).await);

    // Daily endpoint input validation
    results.add_test(test_daily_rejects_bad_date(api_addr).await);

    // Range query ordering
    results.add_test(test_range_is_ascending(api_addr).await);

    // Monthly aggregate agrees with the raw daily rows
    results.add_test(test_monthly_matches_range(api_addr).await);

    // Monthly endpoint input validation
    results.add_test(test_monthly_rejects_bad_month(api_addr).await);

    // Interface listing
    results.add_test(test_interfaces_listed(api_addr).await);

    // Live endpoint shape
    results.add_test(test_live_snapshot_shape(api_addr).await);

    info!("=== Integration Tests Complete ===");
    info!(
        "Total: {}, Passed: {}, Failed: {}",
        results.total_tests, results.passed, results.failed
    );

    Ok(results)
}

impl IntegrationTestResults {
    fn add_test(&mut self, result: TestResult) {
        self.total_tests += 1;
        if result.passed {
            self.passed += 1;
            info!("✓ {} - PASSED ({} ms)", result.name, result.duration_ms);
        } else {
            self.failed += 1;
            error!(
                "✗ {} - FAILED: {}",
                result.name,
                result.error.as_ref().unwrap_or(&"Unknown error".to_string())
            );
        }
        self.test_details.push(result);
    }
}

async fn test_health(api_addr: &str) -> TestResult {
    let start = std::time::Instant::now();
    let name = "API Health Check".to_string();

    let client = ApiClient::new(api_addr.to_string());

    match client.get("/health").await {
        Ok((status, body)) => {
            let passed = status == StatusCode::OK && body.contains("healthy");
            TestResult {
                name,
                passed,
                error: if !passed {
                    Some(format!("Unexpected health response: {} {}", status, body))
                } else {
                    None
                },
                duration_ms: start.elapsed().as_millis(),
            }
        }
        Err(e) => TestResult {
            name,
            passed: false,
            error: Some(e.to_string()),
            duration_ms: start.elapsed().as_millis(),
        },
    }
}

async fn test_today_stats(api_addr: &str) -> TestResult {
    let start = std::time::Instant::now();
    let name = "Today Stats".to_string();

    let client = ApiClient::new(api_addr.to_string());
    let today = Local::now().date_naive().to_string();

    match client.get("/api/stats/today").await {
        Ok((status, body)) => {
            let json: Option<Value> = serde_json::from_str(&body).ok();
            let passed = status == StatusCode::OK
                && json
                    .map(|v| {
                        v["day"] == today.as_str()
                            && v["total_bytes"].is_u64()
                            && v["active_seconds"].is_u64()
                    })
                    .unwrap_or(false);
            TestResult {
                name,
                passed,
                error: if !passed {
                    Some(format!("Unexpected today response: {} {}", status, body))
                } else {
                    None
                },
                duration_ms: start.elapsed().as_millis(),
            }
        }
        Err(e) => TestResult {
            name,
            passed: false,
            error: Some(e.to_string()),
            duration_ms: start.elapsed().as_millis(),
        },
    }
}

async fn test_daily_rejects_bad_date(api_addr: &str) -> TestResult {
    let start = std::time::Instant::now();
    let name = "Daily Rejects Bad Date".to_string();

    let client = ApiClient::new(api_addr.to_string());

    match client.get("/api/stats/daily/not-a-date").await {
        Ok((status, _)) => {
            let passed = status == StatusCode::BAD_REQUEST;
            TestResult {
                name,
                passed,
                error: if !passed {
                    Some(format!("Expected 400, got {}", status))
                } else {
                    None
                },
                duration_ms: start.elapsed().as_millis(),
            }
        }
        Err(e) => TestResult {
            name,
            passed: false,
            error: Some(e.to_string()),
            duration_ms: start.elapsed().as_millis(),
        },
    }
}

async fn test_range_is_ascending(api_addr: &str) -> TestResult {
    let start = std::time::Instant::now();
    let name = "Range Query Ascending".to_string();

    let client = ApiClient::new(api_addr.to_string());
    let today = Local::now().date_naive();
    let week_ago = today - chrono::Duration::days(7);
    let path = format!("/api/stats/range?start={}&end={}", week_ago, today);

    match client.get(&path).await {
        Ok((status, body)) => {
            let days: Vec<String> = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v["days"].as_array().map(|rows| {
                        rows.iter()
                            .filter_map(|d| d["day"].as_str().map(String::from))
                            .collect()
                    })
                })
                .unwrap_or_default();
            let passed =
                status == StatusCode::OK && days.windows(2).all(|pair| pair[0] < pair[1]);
            TestResult {
                name,
                passed,
                error: if !passed {
                    Some(format!("Range rows out of order: {:?}", days))
                } else {
                    None
                },
                duration_ms: start.elapsed().as_millis(),
            }
        }
        Err(e) => TestResult {
            name,
            passed: false,
            error: Some(e.to_string()),
            duration_ms: start.elapsed().as_millis(),
        },
    }
}

async fn test_monthly_matches_range(api_addr: &str) -> TestResult {
    let start = std::time::Instant::now();
    let name = "Monthly Equals Folded Range".to_string();

    let client = ApiClient::new(api_addr.to_string());
    // Use the previous month so a flush between the two requests cannot
    // change the answer.
    let (year, month) = previous_month(Local::now().date_naive());
    let Some((first, last)) = month_bounds(year, month) else {
        return TestResult {
            name,
            passed: false,
            error: Some(format!("Could not compute bounds for {}-{}", year, month)),
            duration_ms: start.elapsed().as_millis(),
        };
    };

    let monthly = match client
        .get(&format!("/api/stats/monthly?year={}&month={}", year, month))
        .await
    {
        Ok((status, body)) if status == StatusCode::OK => {
            serde_json::from_str::<Value>(&body).ok()
        }
        _ => None,
    };
    let range = match client
        .get(&format!("/api/stats/range?start={}&end={}", first, last))
        .await
    {
        Ok((status, body)) if status == StatusCode::OK => {
            serde_json::from_str::<Value>(&body).ok()
        }
        _ => None,
    };

    let passed = match (monthly, range) {
        (Some(monthly), Some(range)) => {
            let days = range["days"].as_array().cloned().unwrap_or_default();
            let bytes_sent: u64 = days.iter().filter_map(|d| d["bytes_sent"].as_u64()).sum();
            let bytes_recv: u64 = days.iter().filter_map(|d| d["bytes_recv"].as_u64()).sum();
            let max_up = days
                .iter()
                .filter_map(|d| d["max_up_speed"].as_u64())
                .max()
                .unwrap_or(0);

            monthly["bytes_sent"].as_u64() == Some(bytes_sent)
                && monthly["bytes_recv"].as_u64() == Some(bytes_recv)
                && monthly["max_up_speed"].as_u64() == Some(max_up)
                && monthly["days_tracked"].as_u64() == Some(days.len() as u64)
        }
        _ => false,
    };

    TestResult {
        name,
        passed,
        error: if !passed {
            Some("Monthly aggregate diverged from folded range rows".to_string())
        } else {
            None
        },
        duration_ms: start.elapsed().as_millis(),
    }
}

async fn test_monthly_rejects_bad_month(api_addr: &str) -> TestResult {
    let start = std::time::Instant::now();
    let name = "Monthly Rejects Bad Month".to_string();

    let client = ApiClient::new(api_addr.to_string());

    match client.get("/api/stats/monthly?year=2026&month=13").await {
        Ok((status, _)) => {
            let passed = status == StatusCode::BAD_REQUEST;
            TestResult {
                name,
                passed,
                error: if !passed {
                    Some(format!("Expected 400, got {}", status))
                } else {
                    None
                },
                duration_ms: start.elapsed().as_millis(),
            }
        }
        Err(e) => TestResult {
            name,
            passed: false,
            error: Some(e.to_string()),
            duration_ms: start.elapsed().as_millis(),
        },
    }
}

async fn test_interfaces_listed(api_addr: &str) -> TestResult {
    let start = std::time::Instant::now();
    let name = "Interface Listing".to_string();

    let client = ApiClient::new(api_addr.to_string());

    match client.get("/api/interfaces").await {
        Ok((status, body)) => {
            let json: Option<Value> = serde_json::from_str(&body).ok();
            let passed = status == StatusCode::OK
                && json.map(|v| v["interfaces"].is_array()).unwrap_or(false);
            TestResult {
                name,
                passed,
                error: if !passed {
                    Some(format!("Unexpected interfaces response: {}", body))
                } else {
                    None
                },
                duration_ms: start.elapsed().as_millis(),
            }
        }
        Err(e) => TestResult {
            name,
            passed: false,
            error: Some(e.to_string()),
            duration_ms: start.elapsed().as_millis(),
        },
    }
}

async fn test_live_snapshot_shape(api_addr: &str) -> TestResult {
    let start = std::time::Instant::now();
    let name = "Live Snapshot Shape".to_string();

    let client = ApiClient::new(api_addr.to_string());

    match client.get("/api/live").await {
        Ok((status, body)) => {
            let json: Option<Value> = serde_json::from_str(&body).ok();
            let passed = status == StatusCode::OK
                && json
                    .map(|v| {
                        v["up_speed"].is_u64()
                            && v["down_speed"].is_u64()
                            && v["sent_delta"].is_u64()
                            && v["recv_delta"].is_u64()
                    })
                    .unwrap_or(false);
            TestResult {
                name,
                passed,
                error: if !passed {
                    Some(format!("Unexpected live response: {}", body))
                } else {
                    None
                },
                duration_ms: start.elapsed().as_millis(),
            }
        }
        Err(e) => TestResult {
            name,
            passed: false,
            error: Some(e.to_string()),
            duration_ms: start.elapsed().as_millis(),
        },
    }
}

fn previous_month(today: NaiveDate) -> (i32, u32) {
    if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    }
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next - chrono::Duration::days(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_results() {
        let mut results = IntegrationTestResults {
            total_tests: 0,
            passed: 0,
            failed: 0,
            test_details: Vec::new(),
        };

        results.add_test(TestResult {
            name: "Test 1".to_string(),
            passed: true,
            error: None,
            duration_ms: 100,
        });

        assert_eq!(results.total_tests, 1);
        assert_eq!(results.passed, 1);
        assert_eq!(results.failed, 0);
    }

    #[test]
    fn test_previous_month_wraps_january() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        assert_eq!(previous_month(date), (2025, 12));
    }

    #[test]
    fn test_previous_month_midyear() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 22).unwrap();
        assert_eq!(previous_month(date), (2026, 7));
    }

    #[test]
    fn test_month_bounds_december() {
        let (first, last) = month_bounds(2025, 12).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn test_month_bounds_february() {
        let (_, last) = month_bounds(2026, 2).unwrap();
        assert_eq!(last, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());

        let (_, leap_last) = month_bounds(2024, 2).unwrap();
        assert_eq!(leap_last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
