//! 可观测性模块集成测试
//!
//! 测试 metrics 和 middleware 模块的核心功能。

mod metrics_tests {
    use loyalty_shared::observability::metrics::{
        record_http_request, record_order_submission, record_rate_limited,
        record_reconcile_orders, record_reconcile_tick, record_withdrawal, set_worker_last_run,
    };

    #[test]
    fn test_record_http_request() {
        record_http_request("POST", "/api/user/orders", 202, 0.05);
        record_http_request("GET", "/api/user/orders", 204, 0.01);
        record_http_request("POST", "/api/user/balance/withdraw", 402, 0.03);
        record_http_request("POST", "/api/user/orders", 422, 0.01);
        record_http_request("GET", "/api/user/balance", 500, 0.25);
    }

    #[test]
    fn test_record_ledger_outcomes() {
        for outcome in ["accepted", "already_submitted", "conflict", "invalid", "error"] {
            record_order_submission(outcome);
        }
        record_withdrawal("success", 0.02);
        record_withdrawal("insufficient_funds", 0.01);
    }

    #[test]
    fn test_record_reconciliation() {
        record_reconcile_tick(0, 0, 0.0);
        record_reconcile_tick(10, 7, 1.5);
        for outcome in [
            "applied",
            "ignored",
            "not_registered",
            "server_error",
            "failure",
            "deferred",
        ] {
            record_reconcile_orders(outcome, 1);
        }
        record_reconcile_orders("deferred", 0);
        record_rate_limited();
        set_worker_last_run("reconcile_worker");
    }

    #[test]
    fn test_metrics_with_edge_cases() {
        record_http_request("", "", 0, 0.0);

        let long_path = "/api/".to_string() + &"x".repeat(1000);
        record_http_request("GET", &long_path, 200, 0.01);

        record_http_request("GET", "/api/slow", 200, 999.99);
    }
}

mod middleware_tests {
    use loyalty_shared::observability::middleware::RequestId;

    #[test]
    fn test_request_id_creation() {
        let id = RequestId("test-id-123".to_string());
        assert_eq!(id.as_str(), "test-id-123");
    }

    #[test]
    fn test_request_id_clone() {
        let id1 = RequestId("original".to_string());
        let id2 = id1.clone();
        assert_eq!(id1.as_str(), id2.as_str());
    }
}

mod config_tests {
    use loyalty_shared::observability::ObservabilityConfig;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.service_name, "unknown-service");
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs());
    }

    #[test]
    fn test_with_service_name() {
        let config = ObservabilityConfig::default().with_service_name("loyalty-api");
        assert_eq!(config.service_name, "loyalty-api");
    }
}

mod guard_tests {
    use loyalty_shared::observability::ObservabilityGuard;

    #[test]
    fn test_empty_guard() {
        let guard = ObservabilityGuard::empty();
        drop(guard);
    }
}
